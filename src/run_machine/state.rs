//! Run state types

use crate::assistant::{RunStatus, ToolCallRequest};
use crate::config::RunSettings;
use std::fmt;

/// Ordered ids of the tool calls outstanding in one `requires_action` poll
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ToolCallSignature(Vec<String>);

impl ToolCallSignature {
    pub fn of(calls: &[ToolCallRequest]) -> Self {
        Self(calls.iter().map(|c| c.id.clone()).collect())
    }

    #[cfg(test)]
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ToolCallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// How a run ended from our point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Poll budget used up before completion
    BudgetExhausted,
    /// Remote run reached a terminal status other than `completed`
    Ended {
        status: RunStatus,
        last_error: Option<String>,
    },
    /// Polling itself failed with a non-retryable error
    PollFailed { message: String },
}

/// Where the run currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    /// Created, not yet polled
    Starting,
    /// Last poll showed a status we simply wait on
    Waiting { status: RunStatus },
    /// Tool calls are being dispatched; nothing submitted yet for `signature`
    AwaitingTools { signature: ToolCallSignature },
    /// Outputs for `signature` were accepted by the remote side
    ToolsSubmitted { signature: ToolCallSignature },
    Finished { outcome: RunOutcome },
}

/// Full state of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub phase: RunPhase,
    pub polls_used: u32,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Starting,
            polls_used: 0,
        }
    }

    #[allow(dead_code)] // Used by property tests
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, RunPhase::Finished { .. })
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        match &self.phase {
            RunPhase::Finished { outcome } => Some(outcome),
            _ => None,
        }
    }

    /// Signature whose outputs have already been submitted, if any
    pub fn submitted_signature(&self) -> Option<&ToolCallSignature> {
        match &self.phase {
            RunPhase::ToolsSubmitted { signature } => Some(signature),
            _ => None,
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable inputs to every transition of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub settings: RunSettings,
}

impl RunContext {
    pub fn new(run_id: impl Into<String>, settings: RunSettings) -> Self {
        Self {
            run_id: run_id.into(),
            settings,
        }
    }
}
