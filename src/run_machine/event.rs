//! Events observed while driving a run

use super::state::ToolCallSignature;
use crate::assistant::RunSnapshot;

/// Events that trigger run transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// A status poll succeeded
    Polled(RunSnapshot),
    /// A status poll failed
    PollFailed { message: String, retryable: bool },
    /// Tool outputs for `signature` were accepted
    OutputsSubmitted { signature: ToolCallSignature },
    /// Tool outputs for `signature` were rejected or could not be sent
    SubmissionFailed { signature: ToolCallSignature },
}
