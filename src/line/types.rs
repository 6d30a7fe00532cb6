//! Webhook payload types

use crate::debounce::{Content, InboundMessage, UserId};
use serde::Deserialize;

/// Body of `POST /webhook`
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl WebhookEvent {
    /// Text and image messages from an identified user; everything else is
    /// `None`.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        if self.kind != "message" {
            return None;
        }
        let user = self.source?.user_id.filter(|id| !id.is_empty())?;
        let message = self.message?;

        let content = match message.kind.as_str() {
            "text" => Content::Text(message.text.filter(|t| !t.trim().is_empty())?),
            "image" => Content::image(message.id.filter(|id| !id.is_empty())?),
            _ => return None,
        };

        Some(InboundMessage {
            user: UserId::new(user),
            reply_token: self.reply_token.unwrap_or_default(),
            content,
        })
    }
}

impl WebhookBody {
    pub fn into_messages(self) -> Vec<InboundMessage> {
        self.events
            .into_iter()
            .filter_map(WebhookEvent::into_inbound)
            .collect()
    }
}
