//! Turn orchestration
//!
//! Takes a debounced turn through the remote assistant: cache check, session,
//! message, run creation, polling with tool dispatch, reply extraction.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::Orchestrator;
pub use traits::*;

use crate::assistant::{AssistantError, RunStatus};
use crate::reply::FailureKind;
use crate::run_machine::TransitionError;
use thiserror::Error;

/// Why a turn ended without an answer from the assistant
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("{0} is not configured")]
    Configuration(&'static str),
    #[error("Failed to create session: {0}")]
    SessionCreation(#[source] AssistantError),
    #[error("Failed to add message: {0}")]
    MessageSubmission(#[source] AssistantError),
    #[error("Failed to start run: {0}")]
    RunCreation(#[source] AssistantError),
    #[error("Run ended with status {status}: {}", .last_error.as_deref().unwrap_or("no details"))]
    RunEnded {
        status: RunStatus,
        last_error: Option<String>,
    },
    #[error("Polling failed: {0}")]
    Polling(String),
    #[error("Failed to list messages: {0}")]
    ReplyFetch(#[source] AssistantError),
    #[error("No assistant reply found")]
    NoReply,
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl TurnError {
    /// Apology category shown to the user
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Configuration(_) => FailureKind::Configuration,
            Self::SessionCreation(_) => FailureKind::SessionUnavailable,
            Self::MessageSubmission(_) => FailureKind::MessageNotSent,
            Self::RunCreation(_) => FailureKind::RunNotStarted,
            Self::RunEnded { .. } | Self::Polling(_) | Self::Transition(_) => {
                FailureKind::RunFailed
            }
            Self::ReplyFetch(_) | Self::NoReply => FailureKind::NoAnswer,
        }
    }
}
