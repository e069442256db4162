//! Invoke service: resolution, dispatch and log emulation

use chrono::Local;
use futures::FutureExt;
use lambdastub_core::{ErrorCode, RequestId};
use serde::Deserialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::arn::{ArnError, IdentifierResolver, ResolvedFunction, DEFAULT_ACCOUNT_ID};
use crate::function::{FunctionError, RegisteredFunction};
use crate::invocation::{
    ClientContext, InvocationContext, InvocationOutcome, InvocationRequest,
    DEFAULT_MEMORY_LIMIT_MB,
};
use crate::logs::{duration_ms, ExecutionLog};
use crate::registry::FunctionRegistry;

/// Synchronous invocation payload limit
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 6 * 1024 * 1024;

/// Errors raised before a function is dispatched
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    InvalidIdentifier(#[from] ArnError),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("Could not read request payload: {0}")]
    UnreadableBody(String),
}

impl InvokeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidIdentifier(_) => ErrorCode::InvalidParameterValue,
            Self::FunctionNotFound(_) => ErrorCode::ResourceNotFound,
            Self::UnreadableBody(_) => ErrorCode::InvalidRequestContent,
        }
    }
}

/// Tunables for the invoke endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeConfig {
    /// Region for bare names; `AWS_DEFAULT_REGION` or `us-east-1` when unset
    #[serde(default)]
    pub default_region: Option<String>,

    #[serde(default = "default_account_id")]
    pub account_id: String,

    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u32,

    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

fn default_account_id() -> String {
    DEFAULT_ACCOUNT_ID.to_string()
}

fn default_memory_limit_mb() -> u32 {
    DEFAULT_MEMORY_LIMIT_MB
}

fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            default_region: None,
            account_id: default_account_id(),
            memory_limit_mb: default_memory_limit_mb(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl InvokeConfig {
    pub fn resolver(&self) -> IdentifierResolver {
        let resolver = match &self.default_region {
            Some(region) if !region.is_empty() => IdentifierResolver::new(region.clone()),
            _ => IdentifierResolver::from_env(),
        };
        resolver.with_account_id(self.account_id.clone())
    }
}

/// Invoke service holding the registry and the invocation lock
pub struct InvokeService {
    resolver: IdentifierResolver,
    registry: FunctionRegistry,
    memory_limit_mb: u32,
    max_payload_bytes: usize,
    // Held for a whole invocation, across every function, so that log output
    // from two invocations never interleaves.
    invoke_lock: Mutex<()>,
}

impl InvokeService {
    pub fn new(registry: FunctionRegistry) -> Self {
        Self::with_config(registry, &InvokeConfig::default())
    }

    pub fn with_config(registry: FunctionRegistry, config: &InvokeConfig) -> Self {
        Self {
            resolver: config.resolver(),
            registry,
            memory_limit_mb: config.memory_limit_mb,
            max_payload_bytes: config.max_payload_bytes,
            invoke_lock: Mutex::new(()),
        }
    }

    pub fn with_resolver(mut self, resolver: IdentifierResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Resolve a `FunctionName` and `Qualifier` to a registered function
    pub fn resolve(
        &self,
        identifier: &str,
        qualifier: Option<&str>,
    ) -> Result<(ResolvedFunction, Arc<RegisteredFunction>), InvokeError> {
        let target = self.resolver.resolve(identifier, qualifier)?;
        let function = self
            .registry
            .lookup(&target)
            .ok_or_else(|| InvokeError::FunctionNotFound(target.arn.to_string()))?;
        Ok((target, function))
    }

    /// Resolve and dispatch in one step
    pub async fn invoke(
        &self,
        identifier: &str,
        qualifier: Option<&str>,
        request: InvocationRequest,
    ) -> Result<InvocationOutcome, InvokeError> {
        let (target, function) = self.resolve(identifier, qualifier)?;
        Ok(self.dispatch(&function, &target, request).await)
    }

    /// Run one invocation and record its execution log
    ///
    /// Handler errors and panics end up in the outcome, never as an `Err`.
    pub async fn dispatch(
        &self,
        function: &RegisteredFunction,
        target: &ResolvedFunction,
        request: InvocationRequest,
    ) -> InvocationOutcome {
        let client_context = request
            .client_context
            .as_deref()
            .and_then(ClientContext::from_header);

        let _guard = self.invoke_lock.lock().await;

        let request_id = RequestId::new().id;
        let started_at = Local::now();
        let mut log = ExecutionLog::new();
        log.start(started_at, &request_id, &target.qualifier);
        log.echo(started_at, &request.payload);

        let ctx = InvocationContext::new(target, &request_id, started_at, self.memory_limit_mb)
            .with_client_context(client_context);

        debug!(
            request_id = %request_id,
            function_name = %function.name,
            invocation_type = request.invocation_type.as_str(),
            "Dispatching invocation"
        );

        let result = AssertUnwindSafe(function.handler.invoke(ctx, request.payload))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(FunctionError::from_panic(panic)));

        let finished_at = Local::now();
        let (payload, function_error) = match result {
            Ok(output) => {
                log.echo(finished_at, &output);
                (output, None)
            }
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    error_type = %err.error_type,
                    error_message = %err.error_message,
                    "Function returned an error"
                );
                let body = err.to_json();
                log.echo(finished_at, &body);
                (body, Some(err))
            }
        };

        let elapsed_ms = duration_ms(started_at, finished_at);
        log.end(finished_at, &request_id);
        log.report(finished_at, &request_id, elapsed_ms, self.memory_limit_mb);

        info!(
            request_id = %request_id,
            function_name = %function.name,
            executed_version = %target.executed_version,
            duration_ms = elapsed_ms,
            "Invocation complete"
        );

        InvocationOutcome {
            request_id,
            executed_version: target.executed_version.clone(),
            payload,
            function_error,
            log,
            started_at,
            finished_at,
        }
    }
}
