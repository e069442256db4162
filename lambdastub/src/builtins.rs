//! Built-in demo functions for the standalone server
//!
//! Tests embed the library and register their own handlers; the binary only
//! has these.

use bytes::Bytes;
use lambdastub_invoke::{FunctionError, FunctionRegistry, Handler, InvocationContext, RegistrationError};
use serde::Deserialize;
use std::convert::Infallible;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Builtin {
    /// Returns the payload unchanged
    Echo,
    /// Returns `"hello world!?"`
    Hello,
    /// Fails with a `StubFailure` error echoing the payload
    Fail,
    /// Returns the invocation context as JSON
    Context,
}

/// One `[[functions]]` entry: a name (or ARN) bound to a built-in handler
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionEntry {
    pub name: String,
    pub builtin: Builtin,
}

impl FunctionEntry {
    pub fn new(name: impl Into<String>, builtin: Builtin) -> Self {
        Self {
            name: name.into(),
            builtin,
        }
    }
}

impl Builtin {
    pub fn handler(self) -> Handler {
        match self {
            Self::Echo => Handler::raw(|_ctx, payload: Bytes| async move { Ok::<_, Infallible>(payload) }),
            Self::Hello => Handler::no_input(|| async { Ok::<_, Infallible>("hello world!?") }),
            Self::Fail => Handler::raw(|_ctx, payload: Bytes| async move {
                Err::<Bytes, _>(FunctionError::new(
                    "StubFailure",
                    String::from_utf8_lossy(&payload).into_owned(),
                ))
            }),
            Self::Context => Handler::json(|ctx: InvocationContext, _event: serde_json::Value| async move {
                Ok::<_, Infallible>(ctx)
            }),
        }
    }
}

pub fn registry(functions: &[FunctionEntry]) -> Result<FunctionRegistry, RegistrationError> {
    functions
        .iter()
        .fold(FunctionRegistry::builder(), |builder, entry| {
            builder.register(entry.name.clone(), entry.builtin.handler())
        })
        .build()
}
