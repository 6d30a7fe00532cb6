//! Remote assistant abstraction
//!
//! Sessions, messages and runs on a hosted assistant service.

mod error;
mod openai;
mod types;

pub use error::{AssistantError, AssistantErrorKind};
pub use openai::OpenAiAssistants;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Operations the run orchestrator needs from the remote assistant
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Name of the first missing credential, if any
    fn missing_configuration(&self) -> Option<&'static str>;

    async fn create_session(&self) -> Result<SessionId, AssistantError>;

    /// Append a user message; returns the new message id
    async fn add_message(&self, session: &str, parts: &[MessagePart])
        -> Result<String, AssistantError>;

    async fn list_runs(&self, session: &str) -> Result<Vec<RunSummary>, AssistantError>;

    async fn cancel_run(&self, session: &str, run_id: &str) -> Result<(), AssistantError>;

    async fn create_run(&self, session: &str) -> Result<RunSummary, AssistantError>;

    async fn get_run(&self, session: &str, run_id: &str) -> Result<RunSnapshot, AssistantError>;

    async fn submit_tool_outputs(
        &self,
        session: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
    ) -> Result<(), AssistantError>;

    /// Recent messages, newest first
    async fn list_messages(&self, session: &str) -> Result<Vec<SessionMessage>, AssistantError>;
}

#[async_trait]
impl<T: AssistantApi + ?Sized> AssistantApi for Arc<T> {
    fn missing_configuration(&self) -> Option<&'static str> {
        (**self).missing_configuration()
    }

    async fn create_session(&self) -> Result<SessionId, AssistantError> {
        (**self).create_session().await
    }

    async fn add_message(
        &self,
        session: &str,
        parts: &[MessagePart],
    ) -> Result<String, AssistantError> {
        (**self).add_message(session, parts).await
    }

    async fn list_runs(&self, session: &str) -> Result<Vec<RunSummary>, AssistantError> {
        (**self).list_runs(session).await
    }

    async fn cancel_run(&self, session: &str, run_id: &str) -> Result<(), AssistantError> {
        (**self).cancel_run(session, run_id).await
    }

    async fn create_run(&self, session: &str) -> Result<RunSummary, AssistantError> {
        (**self).create_run(session).await
    }

    async fn get_run(&self, session: &str, run_id: &str) -> Result<RunSnapshot, AssistantError> {
        (**self).get_run(session, run_id).await
    }

    async fn submit_tool_outputs(
        &self,
        session: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
    ) -> Result<(), AssistantError> {
        (**self).submit_tool_outputs(session, run_id, outputs).await
    }

    async fn list_messages(&self, session: &str) -> Result<Vec<SessionMessage>, AssistantError> {
        (**self).list_messages(session).await
    }
}

/// Logging wrapper for an assistant backend
pub struct LoggingAssistant {
    inner: Arc<dyn AssistantApi>,
}

impl LoggingAssistant {
    pub fn new(inner: Arc<dyn AssistantApi>) -> Self {
        Self { inner }
    }
}

fn log_call<T>(
    operation: &'static str,
    session: &str,
    start: Instant,
    result: &Result<T, AssistantError>,
) {
    let duration_ms = start.elapsed().as_millis();
    match result {
        Ok(_) => {
            tracing::debug!(operation, session, duration_ms = %duration_ms, "Assistant call completed");
        }
        Err(e) => {
            tracing::warn!(
                operation,
                session,
                duration_ms = %duration_ms,
                error = %e.message,
                kind = ?e.kind,
                retryable = e.kind.is_retryable(),
                "Assistant call failed"
            );
        }
    }
}

#[async_trait]
impl AssistantApi for LoggingAssistant {
    fn missing_configuration(&self) -> Option<&'static str> {
        self.inner.missing_configuration()
    }

    async fn create_session(&self) -> Result<SessionId, AssistantError> {
        let start = Instant::now();
        let result = self.inner.create_session().await;
        match &result {
            Ok(id) => tracing::info!(session = %id, "Created assistant session"),
            Err(_) => log_call("create_session", "-", start, &result),
        }
        result
    }

    async fn add_message(
        &self,
        session: &str,
        parts: &[MessagePart],
    ) -> Result<String, AssistantError> {
        let start = Instant::now();
        let result = self.inner.add_message(session, parts).await;
        log_call("add_message", session, start, &result);
        result
    }

    async fn list_runs(&self, session: &str) -> Result<Vec<RunSummary>, AssistantError> {
        let start = Instant::now();
        let result = self.inner.list_runs(session).await;
        log_call("list_runs", session, start, &result);
        result
    }

    async fn cancel_run(&self, session: &str, run_id: &str) -> Result<(), AssistantError> {
        let start = Instant::now();
        let result = self.inner.cancel_run(session, run_id).await;
        if result.is_ok() {
            tracing::info!(session, run_id, "Cancelled run");
        }
        log_call("cancel_run", session, start, &result);
        result
    }

    async fn create_run(&self, session: &str) -> Result<RunSummary, AssistantError> {
        let start = Instant::now();
        let result = self.inner.create_run(session).await;
        if let Ok(run) = &result {
            tracing::info!(session, run_id = %run.id, "Started run");
        }
        log_call("create_run", session, start, &result);
        result
    }

    async fn get_run(&self, session: &str, run_id: &str) -> Result<RunSnapshot, AssistantError> {
        let start = Instant::now();
        let result = self.inner.get_run(session, run_id).await;
        log_call("get_run", session, start, &result);
        result
    }

    async fn submit_tool_outputs(
        &self,
        session: &str,
        run_id: &str,
        outputs: &[ToolOutputSubmission],
    ) -> Result<(), AssistantError> {
        let start = Instant::now();
        let result = self.inner.submit_tool_outputs(session, run_id, outputs).await;
        if result.is_ok() {
            tracing::info!(session, run_id, count = outputs.len(), "Submitted tool outputs");
        }
        log_call("submit_tool_outputs", session, start, &result);
        result
    }

    async fn list_messages(&self, session: &str) -> Result<Vec<SessionMessage>, AssistantError> {
        let start = Instant::now();
        let result = self.inner.list_messages(session).await;
        log_call("list_messages", session, start, &result);
        result
    }
}
