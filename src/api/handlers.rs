//! HTTP request handlers

use super::types::{ErrorResponse, HealthResponse, ToolsResponse};
use super::AppState;
use crate::line::WebhookBody;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .with_state(state)
}

/// Hands every text or image message to the debouncer. The reply goes out
/// later through the LINE reply API, so this returns as soon as events are
/// queued.
async fn webhook(State(state): State<AppState>, body: Bytes) -> Result<StatusCode, AppError> {
    let payload: WebhookBody = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;

    let total = payload.events.len();
    let messages = payload.into_messages();
    tracing::debug!(events = total, messages = messages.len(), "Webhook received");

    for message in messages {
        state.debouncer.push(message).await;
    }
    Ok(StatusCode::OK)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.tools.definitions(),
    })
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        tracing::warn!(status = %status, error = %message, "Request rejected");

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::{DebounceSettings, Debouncer, Turn, TurnHandler};
    use crate::orchestrator::testing::MockTools;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    struct ChannelHandler(mpsc::UnboundedSender<Turn>);

    #[async_trait]
    impl TurnHandler for ChannelHandler {
        async fn handle_turn(&self, turn: Turn) {
            let _ = self.0.send(turn);
        }
    }

    fn app() -> (Router, mpsc::UnboundedReceiver<Turn>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(
            Arc::new(ChannelHandler(tx)),
            DebounceSettings {
                window: Duration::from_secs(15),
                actor_idle: Duration::from_secs(600),
            },
        );
        let state = AppState::new(Arc::new(debouncer), Arc::new(MockTools::new()));
        (create_router(state), rx)
    }

    fn post_webhook(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_malformed_webhook_rejected() {
        let (app, _rx) = app();
        let response = app.oneshot(post_webhook("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid webhook payload"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_webhook_messages_debounced_into_turn() {
        let (app, mut rx) = app();
        let payload = json!({
            "events": [
                {
                    "type": "message",
                    "replyToken": "r1",
                    "source": {"userId": "U1"},
                    "message": {"type": "text", "id": "1", "text": "สวัสดี"}
                },
                {
                    "type": "message",
                    "replyToken": "r2",
                    "source": {"userId": "U1"},
                    "message": {"type": "text", "id": "2", "text": "ราคาซักโซฟา"}
                },
                {"type": "unfollow", "source": {"userId": "U2"}}
            ]
        });

        let response = app
            .oneshot(post_webhook(payload.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let turn = rx.recv().await.unwrap();
        assert_eq!(turn.reply_token, "r2");
        assert_eq!(turn.contents.len(), 2);
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _rx) = app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            serde_json::from_slice::<Value>(&body).unwrap(),
            json!({"status": "ok"})
        );
    }

    #[tokio::test]
    async fn test_tools_listed() {
        let (app, _rx) = app();
        let response = app
            .oneshot(Request::get("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["tools"], json!([]));
    }
}
