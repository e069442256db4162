//! Request ID generation

use uuid::Uuid;

/// Lambda-style request ID (lowercase, hyphenated UUID v4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId {
    pub id: String,
}

impl RequestId {
    /// Generate a new request ID
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().hyphenated().to_string(),
        }
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}
