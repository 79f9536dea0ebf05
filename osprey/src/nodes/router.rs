//! The router: a pure function over state returning the next node id.
//!
//! Entered after every interior node. First match wins:
//!
//! | Condition | Route |
//! |---|---|
//! | fatal error or exhausted budget | error |
//! | reclassification error, budget available | classification |
//! | re-planning error, budget available | orchestration |
//! | retriable error, budget available | the failing node |
//! | unresumed approval interrupt | approval_pause |
//! | resume payload present | execute_step |
//! | no task objective | task_extraction |
//! | no active capabilities | classification |
//! | no plan | orchestration |
//! | steps remaining | execute_step |
//! | clarification signalled | clarify |
//! | otherwise | respond |
//!
//! The router never mutates state; counters move only through node return
//! values (each node stamps its own retry count into the error record, and
//! orchestration owns the reclassification counter).

use crate::capabilities::CLARIFICATION_NEEDED;
use crate::error::ErrorSeverity;
use crate::state::AgentState;

use super::node_ids;

/// Picks the next node id for the given state. Pure: equal states yield
/// equal routes.
pub fn route_next(state: &AgentState) -> String {
    let limits = &state.control.limits;

    if let Some(error) = &state.error {
        let route = match error.severity() {
            ErrorSeverity::Fatal => node_ids::ERROR,
            ErrorSeverity::Reclassification => {
                if state.planning.reclassification_attempts < limits.max_reclassifications {
                    node_ids::CLASSIFICATION
                } else {
                    node_ids::ERROR
                }
            }
            ErrorSeverity::Replanning => {
                if error.retry_count < limits.max_execution_retries {
                    node_ids::ORCHESTRATION
                } else {
                    node_ids::ERROR
                }
            }
            ErrorSeverity::Retriable => {
                if error.retry_count < limits.max_execution_retries {
                    return error
                        .failing_node
                        .clone()
                        .unwrap_or_else(|| node_ids::ERROR.to_string());
                }
                node_ids::ERROR
            }
        };
        return route.to_string();
    }

    if let Some(approval) = &state.approval {
        if approval.resume.is_some() {
            return node_ids::EXECUTE_STEP.to_string();
        }
        return node_ids::APPROVAL_PAUSE.to_string();
    }

    if state
        .task
        .task_objective
        .as_deref()
        .unwrap_or("")
        .is_empty()
    {
        return node_ids::TASK_EXTRACTION.to_string();
    }

    if state.classification.active_capability_names.is_empty() {
        return node_ids::CLASSIFICATION.to_string();
    }

    if state.planning.execution_plan.is_empty() {
        return node_ids::ORCHESTRATION.to_string();
    }

    if !state.planning.plan_complete() {
        return node_ids::EXECUTE_STEP.to_string();
    }

    let clarification_signalled = state
        .context
        .list_summaries()
        .iter()
        .any(|s| s.context_type == CLARIFICATION_NEEDED);
    if clarification_signalled {
        return node_ids::CLARIFY.to_string();
    }

    node_ids::RESPOND.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApprovalSlot, InterruptPayload, ResumePayload};
    use crate::error::{ErrorKind, ErrorRecord};
    use crate::state::PlannedStep;

    fn state_with_task() -> AgentState {
        let mut state = AgentState::for_query("q");
        state.task.task_objective = Some("do the thing".into());
        state
    }

    /// **Scenario**: Fresh state routes to task extraction; then classification; then orchestration.
    #[test]
    fn pipeline_progression() {
        let mut state = AgentState::for_query("q");
        assert_eq!(route_next(&state), node_ids::TASK_EXTRACTION);
        state.task.task_objective = Some("objective".into());
        assert_eq!(route_next(&state), node_ids::CLASSIFICATION);
        state
            .classification
            .active_capability_names
            .push("channel_read".into());
        assert_eq!(route_next(&state), node_ids::ORCHESTRATION);
        state
            .planning
            .execution_plan
            .push(PlannedStep::new("channel_read", "cv_1", "read"));
        assert_eq!(route_next(&state), node_ids::EXECUTE_STEP);
        state.planning.current_step_index = 1;
        assert_eq!(route_next(&state), node_ids::RESPOND);
    }

    /// **Scenario**: Router is pure: equal states give equal routes.
    #[test]
    fn router_is_pure() {
        let state = state_with_task();
        assert_eq!(route_next(&state), route_next(&state.clone()));
    }

    /// **Scenario**: A fatal error routes to the error node regardless of progress.
    #[test]
    fn fatal_error_routes_to_error() {
        let mut state = state_with_task();
        state.error = Some(ErrorRecord::new(
            ErrorKind::CapabilityExecutionFailure,
            "boom",
        ));
        assert_eq!(route_next(&state), node_ids::ERROR);
    }

    /// **Scenario**: A retriable error re-enters the failing node while budget remains,
    /// and routes to error exactly at the budget boundary.
    #[test]
    fn retriable_error_budget_boundary() {
        let mut state = state_with_task();
        state.error = Some(
            ErrorRecord::new(ErrorKind::LlmFailure, "transient")
                .with_node(node_ids::TASK_EXTRACTION)
                .with_retry_count(1),
        );
        assert_eq!(route_next(&state), node_ids::TASK_EXTRACTION);

        state.error = Some(
            ErrorRecord::new(ErrorKind::LlmFailure, "transient")
                .with_node(node_ids::TASK_EXTRACTION)
                .with_retry_count(state.control.limits.max_execution_retries),
        );
        assert_eq!(route_next(&state), node_ids::ERROR);
    }

    /// **Scenario**: Reclassification errors re-enter classification while the
    /// counter is below the bound, and route to error exactly at the bound.
    #[test]
    fn reclassification_budget_boundary() {
        let mut state = state_with_task();
        state.planning.reclassification_attempts = 1;
        state.error = Some(ErrorRecord::new(
            ErrorKind::ReclassificationRequired,
            "unknown capability",
        ));
        assert_eq!(route_next(&state), node_ids::CLASSIFICATION);

        state.planning.reclassification_attempts = state.control.limits.max_reclassifications;
        assert_eq!(
            route_next(&state),
            node_ids::ERROR,
            "attempts == max routes to error, not classification"
        );
    }

    /// **Scenario**: Invalid-context-key errors re-enter orchestration (re-planning).
    #[test]
    fn replanning_routes_to_orchestration() {
        let mut state = state_with_task();
        state.error = Some(
            ErrorRecord::new(ErrorKind::InvalidContextKey, "bad key").with_retry_count(1),
        );
        assert_eq!(route_next(&state), node_ids::ORCHESTRATION);
    }

    /// **Scenario**: An unresumed interrupt pauses; a resume re-enters the step.
    #[test]
    fn approval_states() {
        let mut state = state_with_task();
        state.approval = Some(ApprovalSlot::suspended(InterruptPayload::new(
            "channel_write",
            "write",
        )));
        assert_eq!(route_next(&state), node_ids::APPROVAL_PAUSE);
        state.approval.as_mut().unwrap().resume = Some(ResumePayload::approved());
        assert_eq!(route_next(&state), node_ids::EXECUTE_STEP);
    }

    /// **Scenario**: A stored clarification context routes to clarify after the plan.
    #[test]
    fn clarification_routes_to_clarify() {
        let mut state = state_with_task();
        state
            .classification
            .active_capability_names
            .push("channel_read".into());
        state
            .planning
            .execution_plan
            .push(PlannedStep::new("channel_read", "cv_1", "read"));
        state.planning.current_step_index = 1;
        state
            .context
            .store(
                CLARIFICATION_NEEDED,
                "cl_1",
                serde_json::json!({"question": "which channel?"}),
                "needs clarification",
                "read",
                "channel_read",
            )
            .unwrap();
        assert_eq!(route_next(&state), node_ids::CLARIFY);
    }
}
