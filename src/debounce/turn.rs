//! Inbound messages and the turns built from them

use std::fmt;

/// Opaque sender identity; key for all per-user state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform reference to an image; resolved only when the turn is submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub message_id: String,
}

/// One piece of user content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Image(ImageRef),
}

impl Content {
    pub fn image(message_id: impl Into<String>) -> Self {
        Content::Image(ImageRef {
            message_id: message_id.into(),
        })
    }

    fn summary_line(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Image(image) => format!("[รูปภาพ {}]", image.message_id),
        }
    }
}

/// A single message as received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user: UserId,
    pub reply_token: String,
    pub content: Content,
}

impl InboundMessage {
    pub fn text(user: UserId, reply_token: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user,
            reply_token: reply_token.into(),
            content: Content::Text(text.into()),
        }
    }
}

/// Messages from one user that arrived within one quiet window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub user: UserId,
    /// Token of the latest message in the turn
    pub reply_token: String,
    /// Arrival order
    pub contents: Vec<Content>,
}

impl Turn {
    /// Text form of the turn, also used as the duplicate-question key.
    ///
    /// A single message passes through verbatim; several become a numbered
    /// summary under a header.
    pub fn question_text(&self) -> String {
        match self.contents.as_slice() {
            [single] => single.summary_line(),
            contents => {
                let mut text = format!("สรุปคำถาม {} ข้อความจากลูกค้า:", contents.len());
                for (i, content) in contents.iter().enumerate() {
                    text.push_str(&format!("\n{}. {}", i + 1, content.summary_line()));
                }
                text
            }
        }
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRef> {
        self.contents.iter().filter_map(|c| match c {
            Content::Image(image) => Some(image),
            Content::Text(_) => None,
        })
    }

    pub fn has_images(&self) -> bool {
        self.images().next().is_some()
    }
}
