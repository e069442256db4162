//! Lambda HTTP API handlers
//!
//! Implements `POST /{api-version}/functions/{FunctionName}/invocations`.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use lambdastub_core::AwsError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::invocation::{InvocationOutcome, InvocationRequest, InvocationType};
use crate::service::{InvokeError, InvokeService};

pub const INVOCATION_TYPE_HEADER: &str = "x-amz-invocation-type";
pub const CLIENT_CONTEXT_HEADER: &str = "x-amz-client-context";
pub const LOG_TYPE_HEADER: &str = "x-amz-log-type";

pub const EXECUTED_VERSION_HEADER: HeaderName = HeaderName::from_static("x-amz-executed-version");
pub const FUNCTION_ERROR_HEADER: HeaderName = HeaderName::from_static("x-amz-function-error");
pub const LOG_RESULT_HEADER: HeaderName = HeaderName::from_static("x-amz-log-result");
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-amzn-requestid");
pub const ERROR_TYPE_HEADER: HeaderName = HeaderName::from_static("x-amzn-errortype");

/// Shared state for the invoke handler
pub struct InvokeState {
    pub service: InvokeService,
}

impl InvokeState {
    pub fn new(service: InvokeService) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
pub struct InvokeQuery {
    #[serde(rename = "Qualifier")]
    pub qualifier: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, value = %value, "Dropping header with invalid value"),
    }
}

/// Error response for failures before dispatch
fn error_response(err: &InvokeError) -> Response {
    let status = match err {
        InvokeError::InvalidIdentifier(_) | InvokeError::FunctionNotFound(_) => StatusCode::NOT_FOUND,
        InvokeError::UnreadableBody(_) => StatusCode::BAD_REQUEST,
    };
    let error = AwsError::new(err.code(), err.to_string());

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ERROR_TYPE_HEADER, HeaderValue::from_static(error.code.as_str()));
    insert_header(&mut headers, REQUEST_ID_HEADER, &error.request_id);

    (status, headers, error.to_json()).into_response()
}

/// Turn a dispatch outcome into the Invoke API response
///
/// Function failures are still a 200; they are signalled by
/// `X-Amz-Function-Error` and the JSON error body.
pub fn format_response(outcome: InvocationOutcome, include_log: bool) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    insert_header(&mut headers, EXECUTED_VERSION_HEADER, &outcome.executed_version);
    insert_header(&mut headers, REQUEST_ID_HEADER, &outcome.request_id);

    if let Some(error) = &outcome.function_error {
        insert_header(&mut headers, FUNCTION_ERROR_HEADER, &error.error_type);
    }

    if include_log {
        insert_header(&mut headers, LOG_RESULT_HEADER, &outcome.log.tail());
    }

    (StatusCode::OK, headers, Body::from(outcome.payload)).into_response()
}

/// POST /{api-version}/functions/{functionName}/invocations
/// Invoke a registered function
pub async fn invoke_function(
    State(state): State<Arc<InvokeState>>,
    Path((_api_version, function_name)): Path<(String, String)>,
    Query(query): Query<InvokeQuery>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let (target, function) =
        match state.service.resolve(&function_name, query.qualifier.as_deref()) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!(function_name = %function_name, error = %e, "Invoke rejected");
                return error_response(&e);
            }
        };

    let payload = match axum::body::to_bytes(body, state.service.max_payload_bytes()).await {
        Ok(payload) => payload,
        Err(e) => return error_response(&InvokeError::UnreadableBody(e.to_string())),
    };

    // Unknown values fall back to the synchronous default
    let invocation_type = header_str(&headers, INVOCATION_TYPE_HEADER)
        .and_then(InvocationType::from_str)
        .unwrap_or_default();

    let request = InvocationRequest {
        payload,
        invocation_type,
        log_tail: header_str(&headers, LOG_TYPE_HEADER) == Some("Tail"),
        client_context: header_str(&headers, CLIENT_CONTEXT_HEADER).map(str::to_string),
    };

    info!(
        function_name = %function_name,
        arn = %target.arn,
        invocation_type = invocation_type.as_str(),
        payload_size = request.payload.len(),
        "Invoke"
    );

    let include_log = request.wants_log_result();
    let outcome = state.service.dispatch(&function, &target, request).await;
    format_response(outcome, include_log)
}
