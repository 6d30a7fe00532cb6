//! Effects produced by run transitions

use super::state::ToolCallSignature;
use crate::assistant::ToolCallRequest;
use std::time::Duration;

/// Work the executor performs after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Poll the run status after waiting `after`
    Poll { after: Duration },
    /// Run every call locally and submit all outputs in one batch
    DispatchTools {
        calls: Vec<ToolCallRequest>,
        signature: ToolCallSignature,
    },
    /// Read the reply from the session
    ExtractReply,
}
