//! Property-based tests for the run state machine

use super::*;
use crate::assistant::{RunSnapshot, RunStatus, ToolCallRequest};
use crate::config::RunSettings;
use proptest::prelude::*;
use serde_json::json;

fn test_context(max_polls: u32) -> RunContext {
    RunContext::new(
        "run_prop",
        RunSettings {
            max_polls,
            ..RunSettings::default()
        },
    )
}

fn arb_status() -> impl Strategy<Value = RunStatus> {
    prop_oneof![
        Just(RunStatus::Queued),
        Just(RunStatus::InProgress),
        Just(RunStatus::RequiresAction),
        Just(RunStatus::Cancelling),
        Just(RunStatus::Cancelled),
        Just(RunStatus::Failed),
        Just(RunStatus::Completed),
        Just(RunStatus::Incomplete),
        Just(RunStatus::Expired),
        Just(RunStatus::Unknown),
    ]
}

/// Non-terminal statuses, weighted towards `requires_action`
fn arb_live_status() -> impl Strategy<Value = RunStatus> {
    prop_oneof![
        1 => Just(RunStatus::Queued),
        2 => Just(RunStatus::InProgress),
        4 => Just(RunStatus::RequiresAction),
    ]
}

fn arb_call_ids() -> impl Strategy<Value = Vec<String>> {
    // Small id space so signatures repeat often
    proptest::collection::vec(prop_oneof![Just("call_a"), Just("call_b")], 0..3)
        .prop_map(|ids| ids.into_iter().map(str::to_string).collect())
}

fn snapshot(status: RunStatus, ids: &[String]) -> RunSnapshot {
    let calls = if status == RunStatus::RequiresAction {
        ids.iter()
            .map(|id| ToolCallRequest::new(id.clone(), "get_workflow_guidance", json!({})))
            .collect()
    } else {
        Vec::new()
    };
    RunSnapshot::new("run_prop", status).with_tool_calls(calls)
}

/// One remote observation; submissions are answered by the driver below
#[derive(Debug, Clone)]
enum Observation {
    Poll(RunStatus, Vec<String>),
    PollError { retryable: bool },
}

fn arb_observation(status: BoxedStrategy<RunStatus>) -> impl Strategy<Value = Observation> {
    prop_oneof![
        8 => (status, arb_call_ids()).prop_map(|(s, ids)| Observation::Poll(s, ids)),
        1 => any::<bool>().prop_map(|retryable| Observation::PollError { retryable }),
    ]
}

/// Feed observations through the machine the way the executor would, answering
/// every dispatch with a submission result.
fn drive(
    ctx: &RunContext,
    observations: Vec<Observation>,
    submissions_succeed: bool,
) -> Result<RunState, TestCaseError> {
    let mut state = RunState::new();

    for observation in observations {
        if state.is_finished() {
            break;
        }
        let event = match observation {
            Observation::Poll(status, ids) => Event::Polled(snapshot(status, &ids)),
            Observation::PollError { retryable } => Event::PollFailed {
                message: "poll error".to_string(),
                retryable,
            },
        };
        let result = transition(&state, ctx, event)
            .map_err(|e| TestCaseError::fail(format!("poll rejected: {e}")))?;
        state = result.new_state;
        for effect in result.effects {
            if let Effect::DispatchTools { signature, .. } = &effect {
                let reply = if submissions_succeed {
                    Event::OutputsSubmitted {
                        signature: signature.clone(),
                    }
                } else {
                    Event::SubmissionFailed {
                        signature: signature.clone(),
                    }
                };
                let answered = transition(&state, ctx, reply)
                    .map_err(|e| TestCaseError::fail(format!("submission rejected: {e}")))?;
                state = answered.new_state;
            }
        }
    }
    Ok(state)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Polls never exceed the budget, whatever the remote side reports
    #[test]
    fn prop_budget_never_exceeded(
        max_polls in 1u32..8,
        observations in proptest::collection::vec(arb_observation(arb_status().boxed()), 0..30),
    ) {
        let ctx = test_context(max_polls);
        let state = drive(&ctx, observations, true)?;
        prop_assert!(state.polls_used <= max_polls);
    }

    // Once the budget is hit the run is finished
    #[test]
    fn prop_budget_reached_means_finished(
        max_polls in 1u32..6,
        observations in proptest::collection::vec(arb_observation(arb_live_status().boxed()), 6..20),
    ) {
        let ctx = test_context(max_polls);
        let state = drive(&ctx, observations, true)?;
        prop_assert!(state.is_finished());
    }

    // A signature is never dispatched twice while its outputs stand submitted
    #[test]
    fn prop_no_duplicate_submission(
        observations in proptest::collection::vec(
            (arb_live_status(), arb_call_ids()).prop_map(|(s, ids)| Observation::Poll(s, ids)),
            0..40,
        ),
    ) {
        let ctx = test_context(100);
        let mut state = RunState::new();
        for observation in observations {
            let Observation::Poll(status, ids) = observation else { continue };
            let guard = state.submitted_signature().cloned();
            let result = transition(&state, &ctx, Event::Polled(snapshot(status, &ids)))
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            state = result.new_state;
            for effect in result.effects {
                if let Effect::DispatchTools { signature, .. } = effect {
                    prop_assert_ne!(Some(&signature), guard.as_ref());
                    state = transition(&state, &ctx, Event::OutputsSubmitted { signature })
                        .map_err(|e| TestCaseError::fail(e.to_string()))?
                        .new_state;
                }
            }
        }
    }

    // Failed submissions never arm the guard
    #[test]
    fn prop_failed_submission_never_guards(
        observations in proptest::collection::vec(arb_observation(arb_live_status().boxed()), 0..30),
    ) {
        let ctx = test_context(100);
        let state = drive(&ctx, observations, false)?;
        prop_assert!(state.submitted_signature().is_none());
    }

    // Finished is absorbing
    #[test]
    fn prop_finished_rejects_everything(
        status in arb_status(),
        ids in arb_call_ids(),
    ) {
        let ctx = test_context(10);
        let state = RunState {
            phase: RunPhase::Finished { outcome: RunOutcome::Completed },
            polls_used: 1,
        };
        let result = transition(&state, &ctx, Event::Polled(snapshot(status, &ids)));
        prop_assert_eq!(result.unwrap_err(), TransitionError::AlreadyFinished);
    }

    // Every unfinished state asks for exactly one follow-up action
    #[test]
    fn prop_live_states_schedule_work(
        observations in proptest::collection::vec(arb_observation(arb_status().boxed()), 1..30),
    ) {
        let ctx = test_context(20);
        let mut state = RunState::new();
        for observation in observations {
            if state.is_finished() {
                break;
            }
            let event = match observation {
                Observation::Poll(status, ids) => Event::Polled(snapshot(status, &ids)),
                Observation::PollError { retryable } => Event::PollFailed {
                    message: "poll error".to_string(),
                    retryable,
                },
            };
            let result = transition(&state, &ctx, event)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            if result.new_state.is_finished() {
                let outcome = result.new_state.outcome().cloned();
                let extracts = result.effects.contains(&Effect::ExtractReply);
                prop_assert_eq!(
                    extracts,
                    matches!(outcome, Some(RunOutcome::Completed | RunOutcome::BudgetExhausted))
                );
            } else {
                prop_assert_eq!(result.effects.len(), 1);
            }
            state = result.new_state;
            if let RunPhase::AwaitingTools { signature } = &state.phase {
                let signature = signature.clone();
                state = transition(&state, &ctx, Event::OutputsSubmitted { signature })
                    .map_err(|e| TestCaseError::fail(e.to_string()))?
                    .new_state;
            }
        }
    }
}
