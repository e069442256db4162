//! Lambda invocation handling

use base64::{engine::general_purpose, Engine};
use bytes::Bytes;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::arn::ResolvedFunction;
use crate::function::FunctionError;
use crate::logs::ExecutionLog;

/// Memory size reported in the context and the REPORT line
pub const DEFAULT_MEMORY_LIMIT_MB: u32 = 128;

/// Invocation type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvocationType {
    /// Synchronous invocation (wait for response)
    #[default]
    RequestResponse,
    /// Asynchronous invocation (fire and forget)
    Event,
    /// Validation only (don't actually invoke)
    DryRun,
}

impl InvocationType {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RequestResponse" => Some(Self::RequestResponse),
            "Event" => Some(Self::Event),
            "DryRun" => Some(Self::DryRun),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestResponse => "RequestResponse",
            Self::Event => "Event",
            Self::DryRun => "DryRun",
        }
    }
}

/// Mobile client information forwarded through `X-Amz-Client-Context`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    #[serde(default)]
    pub client: ClientApplication,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub custom: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientApplication {
    #[serde(default)]
    pub installation_id: String,
    #[serde(default)]
    pub app_title: String,
    #[serde(default)]
    pub app_version_code: String,
    #[serde(default)]
    pub app_package_name: String,
}

impl ClientContext {
    /// Decode a base64 JSON header value; malformed values are dropped
    pub fn from_header(value: &str) -> Option<Self> {
        let decoded = match general_purpose::STANDARD.decode(value) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(error = %e, "Ignoring client context that is not valid base64");
                return None;
            }
        };
        match serde_json::from_slice(&decoded) {
            Ok(context) => Some(context),
            Err(e) => {
                debug!(error = %e, "Ignoring client context that is not valid JSON");
                None
            }
        }
    }
}

/// A single Invoke request after the HTTP layer has parsed it
#[derive(Debug, Clone, Default)]
pub struct InvocationRequest {
    pub payload: Bytes,
    pub invocation_type: InvocationType,
    /// `X-Amz-Log-Type: Tail`
    pub log_tail: bool,
    /// Raw `X-Amz-Client-Context` header
    pub client_context: Option<String>,
}

impl InvocationRequest {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    /// Whether the response should carry `X-Amz-Log-Result`
    pub fn wants_log_result(&self) -> bool {
        self.log_tail && self.invocation_type == InvocationType::RequestResponse
    }
}

/// Context passed to the function for one invocation
#[derive(Debug, Clone, Default, Serialize)]
pub struct InvocationContext {
    pub aws_request_id: String,
    pub invoked_function_arn: String,
    pub function_name: String,
    pub function_version: String,
    pub memory_limit_in_mb: u32,
    pub log_group_name: String,
    pub log_stream_name: String,
    pub client_context: Option<ClientContext>,
}

impl InvocationContext {
    pub fn new(
        target: &ResolvedFunction,
        request_id: &str,
        started_at: DateTime<Local>,
        memory_limit_in_mb: u32,
    ) -> Self {
        Self {
            aws_request_id: request_id.to_string(),
            invoked_function_arn: target.arn.to_string(),
            function_name: target.function_name.clone(),
            function_version: target.executed_version.clone(),
            memory_limit_in_mb,
            log_group_name: format!("/aws/lambda/{}", target.function_name),
            log_stream_name: format!(
                "{}[{}]{}",
                started_at.format("%Y/%m/%d"),
                target.qualifier,
                "0".repeat(32)
            ),
            client_context: None,
        }
    }

    pub fn with_client_context(mut self, client_context: Option<ClientContext>) -> Self {
        self.client_context = client_context;
        self
    }
}

/// Result of one dispatch, consumed by the response formatter
#[derive(Debug)]
pub struct InvocationOutcome {
    pub request_id: String,
    pub executed_version: String,
    /// Handler output, or the JSON error body on failure
    pub payload: Bytes,
    pub function_error: Option<FunctionError>,
    pub log: ExecutionLog,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl InvocationOutcome {
    pub fn is_error(&self) -> bool {
        self.function_error.is_some()
    }
}
