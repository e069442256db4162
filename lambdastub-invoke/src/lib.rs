//! Lambda Invoke emulation for lambdastub
//!
//! Resolves function identifiers, dispatches to in-process handlers and
//! answers in the Invoke API's wire format, including synthetic logs.

pub mod arn;
pub mod function;
pub mod handlers;
pub mod invocation;
pub mod logs;
pub mod registry;
pub mod service;

use axum::{http::StatusCode, routing::post, Router};
use std::sync::Arc;

pub use arn::{FunctionArn, IdentifierResolver, ResolvedFunction};
pub use function::{BoxError, FunctionError, Handler, HandlerShape, RegisteredFunction};
pub use handlers::InvokeState;
pub use invocation::{ClientContext, InvocationContext, InvocationRequest, InvocationType};
pub use registry::{FunctionRegistry, RegistrationError};
pub use service::{InvokeConfig, InvokeError, InvokeService};

/// Route of the Invoke API
pub const INVOKE_PATH: &str = "/:api_version/functions/:function_name/invocations";

/// Router mounting the invoke handler; anything else is a 404
pub fn router(state: Arc<InvokeState>) -> Router {
    Router::new()
        .route(INVOKE_PATH, post(handlers::invoke_function))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .with_state(state)
}
