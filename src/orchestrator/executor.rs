//! Turn executor

use super::traits::{ImageSource, ReplySink, ToolExecutor};
use super::TurnError;
use crate::answer_cache::AnswerCache;
use crate::assistant::{
    AssistantApi, AssistantErrorKind, MessagePart, Role, RunSummary, SessionId, ToolCallRequest,
    ToolOutputSubmission,
};
use crate::config::RunSettings;
use crate::debounce::{Turn, TurnHandler};
use crate::reply::Reply;
use crate::run_machine::{
    transition, Effect, Event, RunContext, RunOutcome, RunState, ToolCallSignature,
};
use crate::sessions::SessionRegistry;
use crate::tools::ToolOutput;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

const BANGKOK_UTC_OFFSET_HOURS: i64 = 7;
const PRICING_TOOL: &str = "get_ncs_pricing";
const IMAGE_UNAVAILABLE: &str = "ได้รับรูปภาพจากลูกค้า (ไม่สามารถแสดงได้)";

/// Local Asia/Bangkok wall-clock time, second precision
pub(crate) fn bangkok_timestamp(now: DateTime<Utc>) -> String {
    (now.naive_utc() + chrono::Duration::hours(BANGKOK_UTC_OFFSET_HOURS))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

fn image_instruction(timestamp: &str) -> String {
    format!(
        "ขณะนี้เวลา {timestamp}: ลูกค้าส่งรูปภาพมา กรุณาวิเคราะห์รูปภาพและให้คำแนะนำเกี่ยวกับบริการทำความสะอาดที่เหมาะสม"
    )
}

/// JSON object embedded in a reply that asks for a price instead of giving one
fn embedded_pricing_request(text: &str) -> Option<Value> {
    if !(text.contains("service_type") && text.contains("item_type")) {
        return None;
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    let candidate = text.get(start..=end)?;
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

/// Drives turns through the remote assistant
pub struct Orchestrator {
    assistant: Arc<dyn AssistantApi>,
    sessions: Arc<SessionRegistry>,
    tools: Arc<dyn ToolExecutor>,
    images: Arc<dyn ImageSource>,
    replies: Arc<dyn ReplySink>,
    cache: AnswerCache,
    settings: RunSettings,
}

impl Orchestrator {
    pub fn new(
        assistant: Arc<dyn AssistantApi>,
        sessions: Arc<SessionRegistry>,
        tools: Arc<dyn ToolExecutor>,
        images: Arc<dyn ImageSource>,
        replies: Arc<dyn ReplySink>,
        cache: AnswerCache,
        settings: RunSettings,
    ) -> Self {
        Self {
            assistant,
            sessions,
            tools,
            images,
            replies,
            cache,
            settings,
        }
    }

    /// Answer one turn. Never fails: every error becomes an apology reply.
    pub async fn process_turn(&self, turn: &Turn) -> Reply {
        let question = turn.question_text();

        if let Some(answer) = self.cache.lookup(&turn.user, &question).await {
            tracing::info!(user = %turn.user, "Repeated question, serving cached answer");
            return Reply::cached(answer);
        }

        let text = match self.answer(turn).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(user = %turn.user, error = %e, "Turn failed");
                return Reply::failed(e.failure_kind());
            }
        };

        let reply = if self.cache.classifier().looks_like_error(&text) {
            tracing::warn!(user = %turn.user, "Assistant reply looks like an error, not caching");
            Reply::upstream_error(text)
        } else {
            Reply::fresh(text)
        };

        if reply.is_cacheable() {
            self.cache.put(&turn.user, question, reply.text.clone()).await;
        }
        reply
    }

    async fn answer(&self, turn: &Turn) -> Result<String, TurnError> {
        if let Some(missing) = self.assistant.missing_configuration() {
            return Err(TurnError::Configuration(missing));
        }

        let session = self
            .sessions
            .get_or_create(&turn.user, &*self.assistant)
            .await
            .map_err(TurnError::SessionCreation)?;

        let parts = self.message_parts(turn, Utc::now()).await;
        let message_id = self
            .assistant
            .add_message(&session, &parts)
            .await
            .map_err(TurnError::MessageSubmission)?;

        self.cancel_active_runs(&session).await;
        let run = self.start_run(&session).await?;

        match self.drive_run(&session, &run.id).await? {
            RunOutcome::Completed => {}
            RunOutcome::BudgetExhausted => {
                tracing::warn!(session = %session, run_id = %run.id, "Poll budget exhausted, using whatever reply exists");
            }
            RunOutcome::Ended { status, last_error } => {
                return Err(TurnError::RunEnded { status, last_error });
            }
            RunOutcome::PollFailed { message } => return Err(TurnError::Polling(message)),
        }

        let text = self
            .latest_reply(&session, &message_id)
            .await?
            .ok_or(TurnError::NoReply)?;

        let quote = match embedded_pricing_request(&text) {
            Some(request) => self.price_directly(&request).await,
            None => None,
        };
        Ok(quote.unwrap_or(text))
    }

    /// Text turns become one time-stamped text part; image turns an
    /// instruction plus one part per image.
    async fn message_parts(&self, turn: &Turn, now: DateTime<Utc>) -> Vec<MessagePart> {
        let timestamp = bangkok_timestamp(now);
        let question = turn.question_text();

        if !turn.has_images() {
            return vec![MessagePart::text(format!("ขณะนี้เวลา {timestamp}: {question}"))];
        }

        let mut instruction = image_instruction(&timestamp);
        if turn.contents.len() > 1 {
            instruction.push('\n');
            instruction.push_str(&question);
        }

        let mut parts = vec![MessagePart::text(instruction)];
        for image in turn.images() {
            match self.images.fetch_image(&image.message_id).await {
                Ok(url) => parts.push(MessagePart::image(url)),
                Err(e) => {
                    tracing::warn!(user = %turn.user, message_id = %image.message_id, error = %e, "Image unavailable");
                    parts.push(MessagePart::text(IMAGE_UNAVAILABLE));
                }
            }
        }
        parts
    }

    /// Best effort: a run left over from an earlier turn would block ours.
    async fn cancel_active_runs(&self, session: &SessionId) {
        let runs = match self.assistant.list_runs(session).await {
            Ok(runs) => runs,
            Err(e) => {
                tracing::warn!(session = %session, error = %e, "Could not list runs");
                return;
            }
        };
        for run in runs.iter().filter(|r| r.status.blocks_new_run()) {
            tracing::info!(session = %session, run_id = %run.id, status = %run.status, "Cancelling active run");
            if let Err(e) = self.assistant.cancel_run(session, &run.id).await {
                tracing::warn!(session = %session, run_id = %run.id, error = %e, "Cancel failed");
            }
        }
    }

    /// Create a run, resolving one active-run conflict with a single retry.
    async fn start_run(&self, session: &SessionId) -> Result<RunSummary, TurnError> {
        let conflict = match self.assistant.create_run(session).await {
            Ok(run) => return Ok(run),
            Err(e) if e.kind == AssistantErrorKind::ActiveRun => e,
            Err(e) => return Err(TurnError::RunCreation(e)),
        };

        match conflict.conflicting_run_id() {
            Some(blocking) => {
                tracing::info!(session = %session, run_id = %blocking, "Run creation blocked, cancelling");
                if let Err(e) = self.assistant.cancel_run(session, &blocking).await {
                    tracing::warn!(session = %session, run_id = %blocking, error = %e, "Cancel failed");
                }
            }
            None => self.cancel_active_runs(session).await,
        }

        tokio::time::sleep(self.settings.conflict_backoff).await;
        self.assistant
            .create_run(session)
            .await
            .map_err(TurnError::RunCreation)
    }

    /// Execute effects of the run state machine until it finishes.
    async fn drive_run(&self, session: &SessionId, run_id: &str) -> Result<RunOutcome, TurnError> {
        let ctx = RunContext::new(run_id, self.settings);
        let mut state = RunState::new();
        let mut effects = VecDeque::from([Effect::Poll {
            after: self.settings.poll_interval,
        }]);

        while let Some(effect) = effects.pop_front() {
            let event = match effect {
                Effect::Poll { after } => {
                    tokio::time::sleep(after).await;
                    self.poll(session, run_id, state.polls_used + 1).await
                }
                Effect::DispatchTools { calls, signature } => {
                    self.dispatch_tools(session, run_id, &calls, signature).await
                }
                Effect::ExtractReply => continue,
            };

            let result = transition(&state, &ctx, event)?;
            state = result.new_state;
            effects.extend(result.effects);
        }

        let outcome = state
            .outcome()
            .cloned()
            .ok_or_else(|| TurnError::Polling("Run loop stopped before the run finished".into()))?;
        tracing::info!(session = %session, run_id, polls = state.polls_used, outcome = ?outcome, "Run finished");
        Ok(outcome)
    }

    async fn poll(&self, session: &SessionId, run_id: &str, attempt: u32) -> Event {
        match self.assistant.get_run(session, run_id).await {
            Ok(snapshot) => {
                tracing::debug!(run_id = %snapshot.id, attempt, status = %snapshot.status, "Polled run");
                Event::Polled(snapshot)
            }
            Err(e) => Event::PollFailed {
                retryable: e.kind.is_retryable(),
                message: e.message,
            },
        }
    }

    /// Run every call concurrently and submit all outputs, in request order,
    /// as one batch.
    async fn dispatch_tools(
        &self,
        session: &SessionId,
        run_id: &str,
        calls: &[ToolCallRequest],
        signature: ToolCallSignature,
    ) -> Event {
        let outputs = futures::future::join_all(calls.iter().map(|call| self.run_tool(call))).await;
        let submissions: Vec<ToolOutputSubmission> = calls
            .iter()
            .zip(outputs)
            .map(|(call, output)| ToolOutputSubmission {
                tool_call_id: call.id.clone(),
                output: output.output,
            })
            .collect();

        match self
            .assistant
            .submit_tool_outputs(session, run_id, &submissions)
            .await
        {
            Ok(()) => Event::OutputsSubmitted { signature },
            Err(e) => {
                tracing::warn!(run_id, signature = %signature, error = %e, "Tool output submission failed");
                Event::SubmissionFailed { signature }
            }
        }
    }

    async fn run_tool(&self, call: &ToolCallRequest) -> ToolOutput {
        let output = self
            .tools
            .execute(&call.name, &call.arguments)
            .await
            .unwrap_or_else(|| ToolOutput::error(format!("Unknown tool: {}", call.name)));
        if output.success {
            tracing::info!(tool = %call.name, call_id = %call.id, "Tool call succeeded");
        } else {
            tracing::warn!(tool = %call.name, call_id = %call.id, output = %output.output, "Tool call failed");
        }
        output
    }

    /// Newest assistant text written after `after_message_id`
    async fn latest_reply(
        &self,
        session: &SessionId,
        after_message_id: &str,
    ) -> Result<Option<String>, TurnError> {
        let messages = self
            .assistant
            .list_messages(session)
            .await
            .map_err(TurnError::ReplyFetch)?;

        Ok(messages
            .into_iter()
            .take_while(|m| m.id != after_message_id)
            .filter(|m| m.role == Role::Assistant)
            .filter_map(|m| m.text)
            .find(|text| !text.trim().is_empty()))
    }

    /// The assistant wrote out a pricing request instead of calling the tool.
    /// `None` when no quote could be produced; the assistant's text stands.
    async fn price_directly(&self, request: &Value) -> Option<String> {
        tracing::info!(request = %request, "Reply carried a pricing request, quoting directly");
        match self.tools.execute(PRICING_TOOL, request).await {
            Some(out) if out.success => Some(out.output),
            Some(out) => {
                tracing::warn!(output = %out.output, "Direct quote failed, keeping assistant reply");
                None
            }
            None => {
                tracing::warn!(tool = PRICING_TOOL, "Pricing tool not registered, keeping assistant reply");
                None
            }
        }
    }
}

#[async_trait]
impl TurnHandler for Orchestrator {
    async fn handle_turn(&self, turn: Turn) {
        tracing::info!(user = %turn.user, messages = turn.contents.len(), "Processing turn");
        let reply = self.process_turn(&turn).await;

        if reply.text.trim().is_empty() {
            tracing::warn!(user = %turn.user, "Empty reply, nothing sent");
            return;
        }
        match self.replies.send_reply(&turn.reply_token, &reply.text).await {
            Ok(()) => {
                tracing::info!(user = %turn.user, disposition = ?reply.disposition, "Reply sent");
            }
            Err(e) => tracing::error!(user = %turn.user, error = %e, "Failed to send reply"),
        }
    }
}
