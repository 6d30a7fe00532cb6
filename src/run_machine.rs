//! Assistant run state machine
//!
//! Pure transitions over polled run snapshots; the orchestrator executes the
//! resulting effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{RunContext, RunOutcome, RunPhase, RunState, ToolCallSignature};
pub use transition::{transition, TransitionError, TransitionResult};
