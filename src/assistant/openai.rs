//! `OpenAI` Assistants (threads and runs) implementation

use super::types::{
    MessagePart, Role, RunSnapshot, RunStatus, RunSummary, SessionId, SessionMessage,
    ToolCallRequest, ToolOutputSubmission,
};
use super::{AssistantApi, AssistantError};
use crate::config::AssistantConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Number of recent messages fetched when looking for the reply
const MESSAGE_PAGE_SIZE: u32 = 20;

/// Client for the threads/runs API
pub struct OpenAiAssistants {
    client: Client,
    api_key: Option<String>,
    assistant_id: Option<String>,
    base_url: String,
}

impl OpenAiAssistants {
    pub fn new(config: &AssistantConfig, timeout: Duration) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistantError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            assistant_id: config.assistant_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, AssistantError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AssistantError::auth("API key not configured"))?;
        Ok(builder
            .header("Authorization", format!("Bearer {key}"))
            .header("OpenAI-Beta", "assistants=v2"))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, AssistantError> {
        let response = self.authorized(builder)?.send().await.map_err(|e| {
            if e.is_timeout() {
                AssistantError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                AssistantError::network(format!("Connection failed: {e}"))
            } else if e.is_request() || e.is_body() {
                AssistantError::network(format!("Request interrupted: {e}"))
            } else {
                AssistantError::unknown(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AssistantError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            AssistantError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })
    }
}

/// Map a non-success HTTP response to an error kind
fn classify_error(status: u16, body: &str) -> AssistantError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .map_or_else(|_| body.to_string(), |resp| resp.error.message);

    match status {
        400 => AssistantError::from_bad_request(message),
        401 | 403 => AssistantError::auth(format!("Authentication failed: {message}")),
        404 => AssistantError::not_found(format!("Not found: {message}")),
        429 => AssistantError::rate_limit(format!("Rate limit exceeded: {message}")),
        500..=599 => AssistantError::server_error(format!("Server error: {message}")),
        _ => AssistantError::unknown(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistants {
    fn missing_configuration(&self) -> Option<&'static str> {
        if self.api_key.is_none() {
            Some("OPENAI_API_KEY")
        } else if self.assistant_id.is_none() {
            Some("OPENAI_ASSISTANT_ID")
        } else {
            None
        }
    }

    async fn create_session(&self) -> Result<SessionId, AssistantError> {
        let created: IdObject = self
            .send(self.client.post(self.url("threads")).json(&json!({})))
            .await?;
        Ok(created.id)
    }

    async fn add_message(
        &self,
        session: &str,
        parts: &[MessagePart],
    ) -> Result<String, AssistantError> {
        let body = CreateMessageRequest {
            role: "user",
            content: parts,
        };
        let created: IdObject = self
            .send(
                self.client
                    .post(self.url(&format!("threads/{session}/messages")))
                    .json(&body),
            )
            .await?;
        Ok(created.id)
    }

    async fn list_runs(&self, session: &str) -> Result<Vec<RunSummary>, AssistantError> {
        let page: ListResponse<RunObject> = self
            .send(self.client.get(self.url(&format!("threads/{session}/runs"))))
            .await?;
        Ok(page
            .data
            .into_iter()
            .map(|run| RunSummary {
                id: run.id,
                status: run.status,
            })
            .collect())
    }

    async fn cancel_run(&self, session: &str, run_id: &str) -> Result<(), AssistantError> {
        let _: RunObject = self
            .send(
                self.client
                    .post(self.url(&format!("threads/{session}/runs/{run_id}/cancel"))),
            )
            .await?;
        Ok(())
    }

    async fn create_run(&self, session: &str) -> Result<RunSummary, AssistantError> {
        let assistant_id = self
            .assistant_id
            .as_deref()
            .ok_or_else(|| AssistantError::invalid_request("Assistant id not configured"))?;
        let run: RunObject = self
            .send(
                self.client
                    .post(self.url(&format!("threads/{session}/runs")))
                    .json(&json!({ "assistant_id": assistant_id })),
            )
            .await?;
        Ok(RunSummary {
            id: run.id,
            status: run.status,
        })
    }

    async fn get_run(&self, session: &str, run_id: &str) -> Result<RunSnapshot, AssistantError> {
        let run: RunObject = self
            .send(
                self.client
                    .get(self.url(&format!("threads/{session}/runs/{run_id}"))),
            )
            .await?;
        Ok(run.into_snapshot())
    }

    async fn submit_tool_outputs(
        &self,
        session: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
    ) -> Result<(), AssistantError> {
        let _: RunObject = self
            .send(
                self.client
                    .post(self.url(&format!(
                        "threads/{session}/runs/{run_id}/submit_tool_outputs"
                    )))
                    .json(&json!({ "tool_outputs": outputs })),
            )
            .await?;
        Ok(())
    }

    async fn list_messages(&self, session: &str) -> Result<Vec<SessionMessage>, AssistantError> {
        let page: ListResponse<MessageObject> = self
            .send(
                self.client
                    .get(self.url(&format!("threads/{session}/messages")))
                    .query(&[("order", "desc"), ("limit", &MESSAGE_PAGE_SIZE.to_string())]),
            )
            .await?;
        Ok(page
            .data
            .into_iter()
            .map(MessageObject::into_session_message)
            .collect())
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: &'static str,
    content: &'a [MessagePart],
}

#[derive(Debug, Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
    #[serde(default)]
    required_action: Option<RequiredAction>,
    #[serde(default)]
    last_error: Option<RunError>,
}

impl RunObject {
    fn into_snapshot(self) -> RunSnapshot {
        let tool_calls = self
            .required_action
            .filter(|action| action.r#type == "submit_tool_outputs")
            .and_then(|action| action.submit_tool_outputs)
            .map(|outputs| {
                outputs
                    .tool_calls
                    .into_iter()
                    .map(|call| {
                        ToolCallRequest::new(call.id, call.function.name, call.function.arguments)
                    })
                    .collect()
            })
            .unwrap_or_default();

        RunSnapshot {
            id: self.id,
            status: self.status,
            tool_calls,
            last_error: self.last_error.map(|e| e.message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RequiredAction {
    r#type: String,
    #[serde(default)]
    submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Debug, Deserialize)]
struct SubmitToolOutputs {
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct RunError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    id: String,
    role: Role,
    #[serde(default)]
    content: Vec<MessageContent>,
}

impl MessageObject {
    fn into_session_message(self) -> SessionMessage {
        let text = self.content.into_iter().next().and_then(|part| {
            if part.r#type == "text" {
                part.text.map(|t| t.value)
            } else {
                None
            }
        });
        SessionMessage {
            id: self.id,
            role: self.role,
            text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    r#type: String,
    #[serde(default)]
    text: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
