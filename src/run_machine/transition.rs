//! Pure run transition function

use super::{Effect, Event, RunContext, RunOutcome, RunPhase, RunState, ToolCallSignature};
use crate::assistant::{RunSnapshot, RunStatus};
use thiserror::Error;

/// Result of a run transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: RunState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: RunState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Run already finished")]
    AlreadyFinished,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function: no I/O, same inputs give the same outputs.
pub fn transition(
    state: &RunState,
    ctx: &RunContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&state.phase, event) {
        (RunPhase::Finished { .. }, _) => Err(TransitionError::AlreadyFinished),

        (RunPhase::AwaitingTools { signature }, Event::OutputsSubmitted { signature: done })
            if *signature == done =>
        {
            Ok(TransitionResult::new(RunState {
                phase: RunPhase::ToolsSubmitted { signature: done },
                polls_used: state.polls_used,
            })
            .with_effect(Effect::Poll {
                after: ctx.settings.tool_settle,
            }))
        }

        // The guard stays unset so the next poll dispatches the batch again
        (RunPhase::AwaitingTools { signature }, Event::SubmissionFailed { signature: failed })
            if *signature == failed =>
        {
            Ok(TransitionResult::new(RunState {
                phase: RunPhase::Waiting {
                    status: RunStatus::RequiresAction,
                },
                polls_used: state.polls_used,
            })
            .with_effect(Effect::Poll {
                after: ctx.settings.poll_interval,
            }))
        }

        (RunPhase::AwaitingTools { signature }, event) => Err(TransitionError::InvalidTransition(
            format!("{event:?} while dispatching tools for [{signature}]"),
        )),

        (_, Event::Polled(snapshot)) => Ok(on_polled(state, ctx, snapshot)),

        (_, Event::PollFailed { message, retryable }) => {
            let polls_used = state.polls_used + 1;
            if !retryable {
                return Ok(finish(polls_used, RunOutcome::PollFailed { message }));
            }
            if polls_used >= ctx.settings.max_polls {
                return Ok(finish(polls_used, RunOutcome::BudgetExhausted)
                    .with_effect(Effect::ExtractReply));
            }
            Ok(TransitionResult::new(RunState {
                phase: state.phase.clone(),
                polls_used,
            })
            .with_effect(Effect::Poll {
                after: ctx.settings.poll_interval,
            }))
        }

        (phase, event @ (Event::OutputsSubmitted { .. } | Event::SubmissionFailed { .. })) => Err(
            TransitionError::InvalidTransition(format!("{event:?} in {phase:?}")),
        ),
    }
}

fn finish(polls_used: u32, outcome: RunOutcome) -> TransitionResult {
    TransitionResult::new(RunState {
        phase: RunPhase::Finished { outcome },
        polls_used,
    })
}

fn on_polled(state: &RunState, ctx: &RunContext, snapshot: RunSnapshot) -> TransitionResult {
    let polls_used = state.polls_used + 1;
    let settings = &ctx.settings;

    if snapshot.status == RunStatus::Completed {
        return finish(polls_used, RunOutcome::Completed).with_effect(Effect::ExtractReply);
    }

    if snapshot.status.is_unsuccessful_end() {
        return finish(
            polls_used,
            RunOutcome::Ended {
                status: snapshot.status,
                last_error: snapshot.last_error,
            },
        );
    }

    if polls_used >= settings.max_polls {
        return finish(polls_used, RunOutcome::BudgetExhausted).with_effect(Effect::ExtractReply);
    }

    let wait = |phase: RunPhase, after| {
        TransitionResult::new(RunState { phase, polls_used }).with_effect(Effect::Poll { after })
    };

    if snapshot.status != RunStatus::RequiresAction {
        // Moving past requires_action clears the submitted guard
        return wait(
            RunPhase::Waiting {
                status: snapshot.status,
            },
            settings.poll_interval,
        );
    }

    let signature = ToolCallSignature::of(&snapshot.tool_calls);
    if signature.is_empty() {
        let phase = match &state.phase {
            RunPhase::ToolsSubmitted { .. } => state.phase.clone(),
            _ => RunPhase::Waiting {
                status: RunStatus::RequiresAction,
            },
        };
        return wait(phase, settings.poll_interval);
    }

    if state.submitted_signature() == Some(&signature) {
        return wait(RunPhase::ToolsSubmitted { signature }, settings.resubmit_wait);
    }

    TransitionResult::new(RunState {
        phase: RunPhase::AwaitingTools {
            signature: signature.clone(),
        },
        polls_used,
    })
    .with_effect(Effect::DispatchTools {
        calls: snapshot.tool_calls,
        signature,
    })
}
