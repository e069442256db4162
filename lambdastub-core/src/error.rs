//! AWS error types and formatting

use serde::Serialize;
use thiserror::Error;

/// Error codes the Lambda invoke API reports through `x-amzn-ErrorType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidParameterValue,
    ResourceNotFound,
    InvalidRequestContent,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParameterValue => "InvalidParameterValueException",
            Self::ResourceNotFound => "ResourceNotFoundException",
            Self::InvalidRequestContent => "InvalidRequestContentException",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AWS-style error
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct AwsError {
    pub code: ErrorCode,
    pub message: String,
    pub request_id: String,
}

impl AwsError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: crate::RequestId::new().id,
        }
    }

    /// Format as a Lambda REST-JSON error body
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct JsonError<'a> {
            #[serde(rename = "Type")]
            fault: &'a str,
            #[serde(rename = "Message")]
            message: &'a str,
            // The Go and JS SDKs read the lowercase key
            #[serde(rename = "message")]
            message_lower: &'a str,
        }

        let error = JsonError {
            fault: "User",
            message: &self.message,
            message_lower: &self.message,
        };

        serde_json::to_string(&error).unwrap_or_else(|_| {
            format!(r#"{{"Type":"User","Message":"{}"}}"#, self.code.as_str())
        })
    }
}
