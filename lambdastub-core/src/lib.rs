//! Core types for lambdastub
//!
//! Error codes and request identifiers shared by the invoke endpoint and the
//! server binary.

pub mod error;
pub mod request_id;

pub use error::{AwsError, ErrorCode};
pub use request_id::RequestId;
