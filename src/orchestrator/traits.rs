//! Collaborator seams of the orchestrator
//!
//! Production wiring uses the tool registry and the LINE client; tests swap in
//! the mocks from `testing`.

use crate::line::LineError;
use crate::tools::{ToolOutput, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Executor for assistant function calls
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run a tool by name; `None` when no tool has that name
    async fn execute(&self, name: &str, arguments: &Value) -> Option<ToolOutput>;

    /// Function definitions for the assistant configuration
    fn definitions(&self) -> Vec<Value>;
}

/// Resolves platform image references into something the assistant can read
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// `data:<mime>;base64,...` URL for the image
    async fn fetch_image(&self, message_id: &str) -> Result<String, LineError>;
}

/// Delivers the reply for a finished turn
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), LineError>;
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, name: &str, arguments: &Value) -> Option<ToolOutput> {
        ToolRegistry::execute(self, name, arguments).await
    }

    fn definitions(&self) -> Vec<Value> {
        ToolRegistry::definitions(self)
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, name: &str, arguments: &Value) -> Option<ToolOutput> {
        (**self).execute(name, arguments).await
    }

    fn definitions(&self) -> Vec<Value> {
        (**self).definitions()
    }
}

#[async_trait]
impl<T: ImageSource + ?Sized> ImageSource for Arc<T> {
    async fn fetch_image(&self, message_id: &str) -> Result<String, LineError> {
        (**self).fetch_image(message_id).await
    }
}

#[async_trait]
impl<T: ReplySink + ?Sized> ReplySink for Arc<T> {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        (**self).send_reply(reply_token, text).await
    }
}
