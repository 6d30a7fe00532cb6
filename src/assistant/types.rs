//! Common types for assistant sessions and runs

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Remote conversation session (thread) identifier
pub type SessionId = String;

/// Status of a run as reported by the remote side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Runs in these states block a new run on the same session
    pub fn blocks_new_run(self) -> bool {
        matches!(self, Self::InProgress | Self::RequiresAction)
    }

    /// Terminal states other than `Completed`
    pub fn is_unsuccessful_end(self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Failed | Self::Incomplete | Self::Expired
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Id and status of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub id: String,
    pub status: RunStatus,
}

/// A function call the assistant asks us to execute
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// Either a JSON object or a string containing JSON
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One poll of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub id: String,
    pub status: RunStatus,
    /// Outstanding calls when `status` is `RequiresAction`
    pub tool_calls: Vec<ToolCallRequest>,
    pub last_error: Option<String>,
}

impl RunSnapshot {
    pub fn new(id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id: id.into(),
            status,
            tool_calls: Vec::new(),
            last_error: None,
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCallRequest>) -> Self {
        self.tool_calls = calls;
        self
    }
}

/// Segment of a submitted user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl MessagePart {
    pub fn text(s: impl Into<String>) -> Self {
        MessagePart::Text { text: s.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        MessagePart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A message stored on the remote session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMessage {
    pub id: String,
    pub role: Role,
    /// Text of the first content part when it is text
    pub text: Option<String>,
}

/// Output for one tool call, submitted as part of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutputSubmission {
    pub tool_call_id: String,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_parts_wire_shape() {
        let parts = vec![
            MessagePart::text("look at this"),
            MessagePart::image("data:image/png;base64,AAAA"),
        ];
        assert_eq!(
            serde_json::to_value(&parts).unwrap(),
            json!([
                { "type": "text", "text": "look at this" },
                { "type": "image_url", "image_url": { "url": "data:image/png;base64,AAAA" } }
            ])
        );
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let status: RunStatus = serde_json::from_value(json!("paused_for_review")).unwrap();
        assert_eq!(status, RunStatus::Unknown);
        let status: RunStatus = serde_json::from_value(json!("requires_action")).unwrap();
        assert_eq!(status, RunStatus::RequiresAction);
    }

    #[test]
    fn test_status_classes() {
        assert!(RunStatus::InProgress.blocks_new_run());
        assert!(RunStatus::RequiresAction.blocks_new_run());
        assert!(!RunStatus::Queued.blocks_new_run());
        assert!(RunStatus::Expired.is_unsuccessful_end());
        assert!(!RunStatus::Completed.is_unsuccessful_end());
    }
}
