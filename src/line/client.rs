//! Outbound LINE calls: reply messages and image content

use crate::config::LineConfig;
use crate::orchestrator::{ImageSource, ReplySink};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use thiserror::Error;

/// LINE rejects text messages longer than this many characters
const MAX_TEXT_CHARS: usize = 5000;
const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum LineError {
    #[error("LINE_CHANNEL_ACCESS_TOKEN is not set")]
    NotConfigured,
    #[error("LINE request failed: {0}")]
    Transport(String),
    #[error("LINE returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Image exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

impl From<reqwest::Error> for LineError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Client for the LINE Messaging API
pub struct LineClient {
    client: reqwest::Client,
    channel_token: Option<String>,
    api_base: String,
    data_api_base: String,
    max_image_bytes: u64,
}

impl LineClient {
    pub fn new(config: &LineConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            channel_token: config.channel_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            data_api_base: config.data_api_base.trim_end_matches('/').to_string(),
            max_image_bytes: config.max_image_bytes,
        }
    }

    fn token(&self) -> Result<&str, LineError> {
        self.channel_token.as_deref().ok_or(LineError::NotConfigured)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, LineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LineError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Send one text message addressed by `reply_token`
    pub async fn reply(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        let token = self.token()?;
        let text: String = text.chars().take(MAX_TEXT_CHARS).collect();
        let payload = json!({
            "replyToken": reply_token,
            "messages": [{"type": "text", "text": text}],
        });

        let response = self
            .client
            .post(format!("{}/v2/bot/message/reply", self.api_base))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Download message content as a `data:` URL, refusing oversized images
    pub async fn image_data_url(&self, message_id: &str) -> Result<String, LineError> {
        let token = self.token()?;
        let limit = self.max_image_bytes;

        let response = self
            .client
            .get(format!(
                "{}/v2/bot/message/{message_id}/content",
                self.data_api_base
            ))
            .bearer_auth(token)
            .send()
            .await?;
        let mut response = Self::check(response).await?;

        if response.content_length().is_some_and(|len| len > limit) {
            return Err(LineError::TooLarge { limit });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_IMAGE_TYPE)
            .to_string();

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if u64::try_from(data.len() + chunk.len()).unwrap_or(u64::MAX) > limit {
                return Err(LineError::TooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }

        tracing::debug!(message_id, bytes = data.len(), content_type = %content_type, "Fetched image");
        Ok(format!("data:{content_type};base64,{}", STANDARD.encode(&data)))
    }
}

#[async_trait]
impl ReplySink for LineClient {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        self.reply(reply_token, text).await
    }
}

#[async_trait]
impl ImageSource for LineClient {
    async fn fetch_image(&self, message_id: &str) -> Result<String, LineError> {
        self.image_data_url(message_id).await
    }
}
