//! Local handlers for assistant function calls

mod args;
mod pricing;
mod slots;
mod workflow;

pub use args::decode_arguments;
pub use pricing::{PricingTable, PricingTool};
pub use slots::SlotsTool;
pub use workflow::WorkflowGuidanceTool;

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// Text submitted back to the assistant, whether or not the call succeeded
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

impl From<Result<String, ToolError>> for ToolOutput {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(text) => Self::success(text),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// Failure inside a single tool call
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Error parsing arguments: {0}")]
    ArgumentParse(String),
    #[error("Error calling {service}: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
}

/// A function the assistant may call
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    /// Description given to the assistant
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments
    fn parameters(&self) -> Value;

    async fn run(&self, arguments: &Value) -> ToolOutput;
}

/// Name to handler dispatch table
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Standard set: pricing, scheduling slots and workflow guidance
    pub fn standard(pricing: Option<Arc<PricingTable>>, slots: SlotsTool) -> Self {
        Self::new(vec![
            Arc::new(PricingTool::new(pricing)),
            Arc::new(slots),
            Arc::new(WorkflowGuidanceTool),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Function definitions in the shape the assistant configuration expects
    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters(),
                    }
                })
            })
            .collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, arguments: &Value) -> Option<ToolOutput> {
        let tool = self.tools.iter().find(|t| t.name() == name)?;
        Some(tool.run(arguments).await)
    }
}
