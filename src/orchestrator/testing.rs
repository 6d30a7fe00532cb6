//! Mock implementations for testing
//!
//! Scripted collaborators so turns can be driven end to end without network
//! access.

use super::traits::{ImageSource, ReplySink, ToolExecutor};
use crate::assistant::{
    AssistantApi, AssistantError, MessagePart, Role, RunSnapshot, RunStatus, RunSummary,
    SessionId, SessionMessage, ToolCallRequest, ToolOutputSubmission,
};
use crate::line::LineError;
use crate::tools::ToolOutput;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// `requires_action` snapshot for `run_1` with `(call_id, tool_name)` calls
pub fn requires_action(calls: &[(&str, &str)]) -> RunSnapshot {
    let calls = calls
        .iter()
        .map(|(id, name)| ToolCallRequest::new(*id, *name, json!({})))
        .collect();
    RunSnapshot::new("run_1", RunStatus::RequiresAction).with_tool_calls(calls)
}

// ============================================================================
// Scripted assistant
// ============================================================================

#[derive(Default)]
struct Script {
    missing: Option<&'static str>,
    session_ids: VecDeque<String>,
    session_failures: VecDeque<AssistantError>,
    sessions_created: usize,
    /// Newest first
    messages: Vec<SessionMessage>,
    added: Vec<Vec<MessagePart>>,
    message_failures: VecDeque<AssistantError>,
    runs: Vec<RunSummary>,
    cancelled: Vec<String>,
    run_results: VecDeque<Result<RunSummary, AssistantError>>,
    runs_created: usize,
    polls: VecDeque<Result<RunSnapshot, AssistantError>>,
    poll_count: usize,
    submissions: Vec<Vec<ToolOutputSubmission>>,
    submission_failures: VecDeque<AssistantError>,
    reply: Option<String>,
}

/// Assistant backend that plays back queued results.
///
/// Runs default to `run_1`, polls past the queue report `in_progress`, and
/// the reply set with `reply_with` is listed as the newest message.
pub struct ScriptedAssistant {
    script: Mutex<Script>,
}

impl ScriptedAssistant {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
        }
    }

    pub fn missing(&self, credential: &'static str) {
        self.script.lock().unwrap().missing = Some(credential);
    }

    /// Id returned by the next `create_session`
    pub fn next_session_id(&self, id: impl Into<String>) {
        self.script.lock().unwrap().session_ids.push_back(id.into());
    }

    pub fn fail_next_session(&self, error: AssistantError) {
        self.script.lock().unwrap().session_failures.push_back(error);
    }

    pub fn fail_next_message(&self, error: AssistantError) {
        self.script.lock().unwrap().message_failures.push_back(error);
    }

    pub fn fail_next_submission(&self, error: AssistantError) {
        self.script.lock().unwrap().submission_failures.push_back(error);
    }

    /// Runs reported by `list_runs`
    pub fn set_runs(&self, runs: Vec<RunSummary>) {
        self.script.lock().unwrap().runs = runs;
    }

    pub fn queue_runs(
        &self,
        results: impl IntoIterator<Item = Result<RunSummary, AssistantError>>,
    ) {
        self.script.lock().unwrap().run_results.extend(results);
    }

    pub fn queue_polls(
        &self,
        results: impl IntoIterator<Item = Result<RunSnapshot, AssistantError>>,
    ) {
        self.script.lock().unwrap().polls.extend(results);
    }

    pub fn reply_with(&self, text: impl Into<String>) {
        self.script.lock().unwrap().reply = Some(text.into());
    }

    /// Message already on the session before the turn
    pub fn push_history(&self, message: SessionMessage) {
        self.script.lock().unwrap().messages.insert(0, message);
    }

    pub fn sessions_created(&self) -> usize {
        self.script.lock().unwrap().sessions_created
    }

    pub fn added_messages(&self) -> Vec<Vec<MessagePart>> {
        self.script.lock().unwrap().added.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.script.lock().unwrap().cancelled.clone()
    }

    pub fn runs_created(&self) -> usize {
        self.script.lock().unwrap().runs_created
    }

    pub fn polls(&self) -> usize {
        self.script.lock().unwrap().poll_count
    }

    /// Every submission attempt, including rejected ones
    pub fn submissions(&self) -> Vec<Vec<ToolOutputSubmission>> {
        self.script.lock().unwrap().submissions.clone()
    }
}

impl Default for ScriptedAssistant {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssistantApi for ScriptedAssistant {
    fn missing_configuration(&self) -> Option<&'static str> {
        self.script.lock().unwrap().missing
    }

    async fn create_session(&self) -> Result<SessionId, AssistantError> {
        tokio::task::yield_now().await;
        let mut script = self.script.lock().unwrap();
        if let Some(error) = script.session_failures.pop_front() {
            return Err(error);
        }
        script.sessions_created += 1;
        let n = script.sessions_created;
        Ok(script
            .session_ids
            .pop_front()
            .unwrap_or_else(|| format!("thread_{n}")))
    }

    async fn add_message(
        &self,
        _session: &str,
        parts: &[MessagePart],
    ) -> Result<String, AssistantError> {
        let mut script = self.script.lock().unwrap();
        if let Some(error) = script.message_failures.pop_front() {
            return Err(error);
        }
        script.added.push(parts.to_vec());
        let id = format!("msg_{}", script.added.len());
        let text = parts.iter().find_map(|p| match p {
            MessagePart::Text { text } => Some(text.clone()),
            MessagePart::ImageUrl { .. } => None,
        });
        script.messages.insert(
            0,
            SessionMessage {
                id: id.clone(),
                role: Role::User,
                text,
            },
        );
        Ok(id)
    }

    async fn list_runs(&self, _session: &str) -> Result<Vec<RunSummary>, AssistantError> {
        Ok(self.script.lock().unwrap().runs.clone())
    }

    async fn cancel_run(&self, _session: &str, run_id: &str) -> Result<(), AssistantError> {
        self.script.lock().unwrap().cancelled.push(run_id.to_string());
        Ok(())
    }

    async fn create_run(&self, _session: &str) -> Result<RunSummary, AssistantError> {
        let mut script = self.script.lock().unwrap();
        script.runs_created += 1;
        script.run_results.pop_front().unwrap_or_else(|| {
            Ok(RunSummary {
                id: "run_1".into(),
                status: RunStatus::Queued,
            })
        })
    }

    async fn get_run(&self, _session: &str, run_id: &str) -> Result<RunSnapshot, AssistantError> {
        let mut script = self.script.lock().unwrap();
        script.poll_count += 1;
        script
            .polls
            .pop_front()
            .unwrap_or_else(|| Ok(RunSnapshot::new(run_id, RunStatus::InProgress)))
    }

    async fn submit_tool_outputs(
        &self,
        _session: &str,
        _run_id: &str,
        outputs: &[ToolOutputSubmission],
    ) -> Result<(), AssistantError> {
        let mut script = self.script.lock().unwrap();
        script.submissions.push(outputs.to_vec());
        match script.submission_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn list_messages(&self, _session: &str) -> Result<Vec<SessionMessage>, AssistantError> {
        let script = self.script.lock().unwrap();
        let reply = script.reply.as_ref().map(|text| SessionMessage {
            id: "msg_reply".into(),
            role: Role::Assistant,
            text: Some(text.clone()),
        });
        Ok(reply.into_iter().chain(script.messages.iter().cloned()).collect())
    }
}

// ============================================================================
// Mock tools
// ============================================================================

/// Tool executor that records calls; tools without a set output answer
/// `"<name> ok"`, and names containing `no_such` are unknown.
pub struct MockTools {
    outputs: Mutex<HashMap<String, ToolOutput>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTools {
    pub fn new() -> Self {
        Self {
            outputs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_output(&self, name: impl Into<String>, output: ToolOutput) {
        self.outputs.lock().unwrap().insert(name.into(), output);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockTools {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for MockTools {
    async fn execute(&self, name: &str, arguments: &Value) -> Option<ToolOutput> {
        if name.contains("no_such") {
            return None;
        }
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        let output = self.outputs.lock().unwrap().get(name).cloned();
        Some(output.unwrap_or_else(|| ToolOutput::success(format!("{name} ok"))))
    }

    fn definitions(&self) -> Vec<Value> {
        Vec::new()
    }
}

// ============================================================================
// Mock images and replies
// ============================================================================

/// Serves `data:image/jpeg;base64,<base64 of the message id>`
pub struct MockImages {
    failing: Mutex<HashSet<String>>,
}

impl MockImages {
    pub fn new() -> Self {
        Self {
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, message_id: impl Into<String>) {
        self.failing.lock().unwrap().insert(message_id.into());
    }
}

impl Default for MockImages {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageSource for MockImages {
    async fn fetch_image(&self, message_id: &str) -> Result<String, LineError> {
        if self.failing.lock().unwrap().contains(message_id) {
            return Err(LineError::Status {
                status: 404,
                body: "Not found".into(),
            });
        }
        Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(message_id)))
    }
}

/// Records every reply instead of sending it
pub struct RecordingReplies {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingReplies {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// `(reply_token, text)` pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for RecordingReplies {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplySink for RecordingReplies {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), LineError> {
        self.sent
            .lock()
            .unwrap()
            .push((reply_token.to_string(), text.to_string()));
        Ok(())
    }
}
