//! Raw HTTP client for the invoke endpoint
//!
//! Unlike the SDK, this client surfaces protocol errors as plain responses, so
//! tests can assert on status codes and `x-amzn-ErrorType` directly.

use base64::{engine::general_purpose, Engine};
use bytes::Bytes;
use reqwest::{Client, Method};

/// Client for a running lambdastub
pub struct StubClient {
    base_url: String,
    client: Client,
}

impl StubClient {
    /// Create a new client
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    /// Start building an invoke call for `function` (a name or ARN)
    pub fn invoke(&self, function: &str) -> InvokeCall<'_> {
        InvokeCall {
            client: self,
            function: function.to_string(),
            qualifier: None,
            payload: Bytes::new(),
            headers: Vec::new(),
        }
    }

    /// `POST` to an arbitrary path, for probing routes outside the API
    pub async fn post(&self, path: &str) -> Result<InvokeResponse, ClientError> {
        let response = self
            .client
            .request(Method::POST, format!("{}{}", self.base_url, path))
            .send()
            .await?;
        InvokeResponse::read(response).await
    }
}

/// A pending invoke request
pub struct InvokeCall<'a> {
    client: &'a StubClient,
    function: String,
    qualifier: Option<String>,
    payload: Bytes,
    headers: Vec<(&'static str, String)>,
}

impl InvokeCall<'_> {
    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Set `X-Amz-Invocation-Type`
    pub fn invocation_type(self, value: &str) -> Self {
        self.header("X-Amz-Invocation-Type", value)
    }

    /// Request the log tail (`X-Amz-Log-Type: Tail`)
    pub fn log_tail(self) -> Self {
        self.header("X-Amz-Log-Type", "Tail")
    }

    /// Send a client context, base64-encoding the given JSON
    pub fn client_context(self, context: &serde_json::Value) -> Self {
        let encoded = general_purpose::STANDARD.encode(context.to_string());
        self.header("X-Amz-Client-Context", &encoded)
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    pub async fn send(self) -> Result<InvokeResponse, ClientError> {
        let url = format!(
            "{}/{}/functions/{}/invocations",
            self.client.base_url,
            crate::API_VERSION,
            self.function
        );

        let mut request = self.client.client.post(&url).body(self.payload);
        if let Some(qualifier) = &self.qualifier {
            request = request.query(&[("Qualifier", qualifier)]);
        }
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }

        InvokeResponse::read(request.send().await?).await
    }
}

/// What came back from an invoke call
#[derive(Debug, Clone)]
pub struct InvokeResponse {
    pub status: u16,
    pub request_id: Option<String>,
    pub executed_version: Option<String>,
    pub function_error: Option<String>,
    pub log_result: Option<String>,
    pub error_type: Option<String>,
    pub body: Bytes,
}

impl InvokeResponse {
    async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let status = response.status().as_u16();
        let request_id = header("x-amzn-requestid");
        let executed_version = header("x-amz-executed-version");
        let function_error = header("x-amz-function-error");
        let log_result = header("x-amz-log-result");
        let error_type = header("x-amzn-errortype");
        let body = response.bytes().await?;

        Ok(Self {
            status,
            request_id,
            executed_version,
            function_error,
            log_result,
            error_type,
            body,
        })
    }

    /// Body parsed as JSON
    pub fn json(&self) -> Result<serde_json::Value, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decoded `X-Amz-Log-Result`, if present
    pub fn log(&self) -> Result<Option<String>, ClientError> {
        let Some(encoded) = &self.log_result else {
            return Ok(None);
        };
        let decoded = general_purpose::STANDARD_NO_PAD.decode(encoded)?;
        Ok(Some(String::from_utf8_lossy(&decoded).into_owned()))
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Log result is not base64: {0}")]
    LogResult(#[from] base64::DecodeError),
}
