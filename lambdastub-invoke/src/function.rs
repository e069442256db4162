//! Registered functions and handler adapters
//!
//! A handler is one of a fixed set of shapes. Each shape is wrapped in an
//! adapter at registration time so the dispatcher only ever sees
//! `(context, payload bytes) -> Result<bytes, FunctionError>`.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use thiserror::Error;

use crate::invocation::InvocationContext;

/// Any error a handler may return: concrete error types, boxed errors,
/// `anyhow::Error` and plain strings all convert into it
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Error returned by a function, in the shape the Invoke API reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{error_type}: {error_message}")]
pub struct FunctionError {
    pub error_message: String,
    pub error_type: String,
}

impl FunctionError {
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            error_type: error_type.into(),
        }
    }

    /// Classify an arbitrary error returned by a handler
    ///
    /// A `FunctionError` anywhere in the `source()` chain is reused as is;
    /// otherwise the error is reported with its unqualified type name and its
    /// `Display` text. `#[error(transparent)]` wrappers forward `source()` past
    /// themselves, so wrap with `#[from]` or `#[source]` to keep the shape.
    pub fn from_error<E>(err: E) -> Self
    where
        E: Into<BoxError> + 'static,
    {
        let error_type = short_type_name(std::any::type_name::<E>()).to_string();
        let err: BoxError = err.into();

        let mut current: Option<&(dyn StdError + 'static)> = Some(&*err);
        while let Some(level) = current {
            if let Some(structured) = level.downcast_ref::<FunctionError>() {
                return structured.clone();
            }
            current = level.source();
        }

        Self::new(error_type, err.to_string())
    }

    /// Classify a panic payload caught while the handler was running
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::new("Panic", message)
    }

    pub fn to_json(&self) -> Bytes {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .unwrap_or_else(|_| Bytes::from_static(br#"{"errorMessage":"","errorType":""}"#))
    }
}

/// `my_crate::errors::Boom<T>` -> `Boom`, `Box<dyn Error + Send>` -> `Error`
fn short_type_name(full: &str) -> &str {
    let full = full
        .strip_prefix("alloc::boxed::Box<")
        .and_then(|inner| inner.strip_suffix('>'))
        .map_or(full, |inner| {
            let inner = inner.strip_prefix("dyn ").unwrap_or(inner);
            inner.split(" + ").next().unwrap_or(inner)
        });
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}

/// Normalized invoke contract implemented by every adapter
#[async_trait]
pub(crate) trait Invoke: Send + Sync {
    async fn invoke(&self, ctx: InvocationContext, payload: Bytes) -> Result<Bytes, FunctionError>;
}

/// Shape a handler was registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerShape {
    /// No input, serialized output
    NoInput,
    /// Raw payload in, raw bytes out
    Raw,
    /// JSON payload decoded into a typed value, serialized output
    Json,
}

impl HandlerShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoInput => "no-input",
            Self::Raw => "raw",
            Self::Json => "json",
        }
    }
}

/// A function body the stub can invoke
pub struct Handler {
    shape: HandlerShape,
    inner: Box<dyn Invoke>,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("shape", &self.shape).finish()
    }
}

impl Handler {
    /// Handler taking no input; its output is JSON-encoded
    ///
    /// ```ignore
    /// Handler::no_input(|| async { Ok::<_, Infallible>("hello world!?") })
    /// ```
    pub fn no_input<F, Fut, Out, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, E>> + Send + 'static,
        Out: Serialize + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Self {
            shape: HandlerShape::NoInput,
            inner: Box::new(NoInputAdapter {
                f,
                _marker: PhantomData,
            }),
        }
    }

    /// Handler receiving the raw payload; its output bytes are returned untouched
    pub fn raw<F, Fut, E>(f: F) -> Self
    where
        F: Fn(InvocationContext, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Self {
            shape: HandlerShape::Raw,
            inner: Box::new(RawAdapter {
                f,
                _marker: PhantomData,
            }),
        }
    }

    /// Handler receiving a typed event decoded from the JSON payload
    ///
    /// An empty payload decodes as JSON `null`. Returning `()` produces `null`.
    pub fn json<F, Fut, In, Out, E>(f: F) -> Self
    where
        F: Fn(InvocationContext, In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, E>> + Send + 'static,
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        Self {
            shape: HandlerShape::Json,
            inner: Box::new(JsonAdapter {
                f,
                _marker: PhantomData,
            }),
        }
    }

    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    pub(crate) async fn invoke(
        &self,
        ctx: InvocationContext,
        payload: Bytes,
    ) -> Result<Bytes, FunctionError> {
        self.inner.invoke(ctx, payload).await
    }
}

fn encode<Out: Serialize>(output: &Out) -> Result<Bytes, FunctionError> {
    serde_json::to_vec(output)
        .map(Bytes::from)
        .map_err(FunctionError::from_error)
}

struct NoInputAdapter<F, Out, E> {
    f: F,
    _marker: PhantomData<fn() -> Result<Out, E>>,
}

#[async_trait]
impl<F, Fut, Out, E> Invoke for NoInputAdapter<F, Out, E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, E>> + Send + 'static,
    Out: Serialize + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    async fn invoke(&self, _ctx: InvocationContext, _payload: Bytes) -> Result<Bytes, FunctionError> {
        match (self.f)().await {
            Ok(output) => encode(&output),
            Err(err) => Err(FunctionError::from_error(err)),
        }
    }
}

struct RawAdapter<F, E> {
    f: F,
    _marker: PhantomData<fn() -> E>,
}

#[async_trait]
impl<F, Fut, E> Invoke for RawAdapter<F, E>
where
    F: Fn(InvocationContext, Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Bytes, E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    async fn invoke(&self, ctx: InvocationContext, payload: Bytes) -> Result<Bytes, FunctionError> {
        (self.f)(ctx, payload).await.map_err(FunctionError::from_error)
    }
}

struct JsonAdapter<F, In, Out, E> {
    f: F,
    _marker: PhantomData<fn(In) -> Result<Out, E>>,
}

#[async_trait]
impl<F, Fut, In, Out, E> Invoke for JsonAdapter<F, In, Out, E>
where
    F: Fn(InvocationContext, In) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Out, E>> + Send + 'static,
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    async fn invoke(&self, ctx: InvocationContext, payload: Bytes) -> Result<Bytes, FunctionError> {
        let input: In = if payload.is_empty() {
            serde_json::from_slice(b"null")
        } else {
            serde_json::from_slice(&payload)
        }
        .map_err(FunctionError::from_error)?;

        match (self.f)(ctx, input).await {
            Ok(output) => encode(&output),
            Err(err) => Err(FunctionError::from_error(err)),
        }
    }
}

/// A function the stub can invoke, under the name it was registered with
#[derive(Debug)]
pub struct RegisteredFunction {
    pub name: String,
    pub handler: Handler,
}

impl RegisteredFunction {
    pub fn new(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}
