//! API response types

use serde::Serialize;
use serde_json::Value;

/// Response for `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Response for `GET /tools`
#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<Value>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
