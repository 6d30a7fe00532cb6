//! Assistant API error types

use thiserror::Error;

/// Phrase the upstream uses when a session still has a run in flight
const ACTIVE_RUN_PHRASE: &str = "already has an active run";

/// Assistant API error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AssistantError {
    pub kind: AssistantErrorKind,
    pub message: String,
}

impl AssistantError {
    pub fn new(kind: AssistantErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AssistantErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(AssistantErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(AssistantErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(AssistantErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(AssistantErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AssistantErrorKind::NotFound, message)
    }

    pub fn active_run(message: impl Into<String>) -> Self {
        Self::new(AssistantErrorKind::ActiveRun, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(AssistantErrorKind::Unknown, message)
    }

    /// Classify a 400 body: the active-run conflict gets its own kind so the
    /// orchestrator can resolve it.
    pub fn from_bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(ACTIVE_RUN_PHRASE) {
            Self::active_run(message)
        } else {
            Self::invalid_request(message)
        }
    }

    /// Id of the run blocking run creation, when the upstream names it.
    ///
    /// The upstream phrases it as `... already has an active run run_abc123.`
    pub fn conflicting_run_id(&self) -> Option<String> {
        if self.kind != AssistantErrorKind::ActiveRun {
            return None;
        }
        self.message
            .split_whitespace()
            .filter(|word| word.starts_with("run_"))
            .map(|word| word.trim_end_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_'))
            .find(|id| id.len() > "run_".len())
            .map(str::to_string)
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantErrorKind {
    /// Network issues, timeouts - retryable
    Network,
    /// Rate limited (429) - retryable
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// Session or run does not exist (404)
    NotFound,
    /// Session already has a run in flight
    ActiveRun,
    /// Unknown error
    Unknown,
}

impl AssistantErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}
