//! Capability runner: the generic wrapper around every capability's execute().
//!
//! Pre-execute: pick the current step, pre-extract and cardinality-validate
//! the declared `requires` contexts, and consume a matching resume payload.
//! Post-execute: check that every declared `provides` type was produced under
//! the step's context key (unless the capability interrupted), install
//! approval interrupts, classify errors, and advance the step index.

use std::sync::Arc;

use async_trait::async_trait;

use crate::approval::ApprovalSlot;
use crate::capability::{CapabilityOutcome, StepView};
use crate::error::{AgentError, ErrorKind, ErrorRecord};
use crate::graph::{GraphInterrupt, Interrupt, Next, Node};
use crate::registry::Registry;
use crate::state::{AgentState, ContextError};

use super::node_ids;
use super::orchestration::PLAN_APPROVAL;

pub struct CapabilityRunnerNode {
    registry: Arc<Registry>,
}

impl CapabilityRunnerNode {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Bounded reclassification bookkeeping shared with orchestration: an
    /// increment that reaches the bound exhausts the budget (counter left at
    /// the bound); otherwise bump the counter and ask for reclassification.
    fn reclassification_error(
        state: &AgentState,
        update: &mut AgentState,
        capability: &str,
        message: String,
    ) {
        let limits = &state.control.limits;
        let next = state.planning.reclassification_attempts + 1;
        if next >= limits.max_reclassifications {
            update.planning.reclassification_attempts = limits.max_reclassifications;
            update.error = Some(
                ErrorRecord::new(
                    ErrorKind::BudgetExhausted,
                    "the request could not be mapped to the agent's capabilities",
                )
                .with_node(node_ids::EXECUTE_STEP)
                .with_capability(capability),
            );
        } else {
            update.planning.reclassification_attempts = next;
            update.error = Some(
                ErrorRecord::new(ErrorKind::ReclassificationRequired, message)
                    .with_node(node_ids::EXECUTE_STEP)
                    .with_capability(capability),
            );
        }
    }
}

#[async_trait]
impl Node<AgentState> for CapabilityRunnerNode {
    fn id(&self) -> &str {
        node_ids::EXECUTE_STEP
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let mut update = state.update_base();

        // Approval slot handling before anything executes.
        let mut resume = None;
        if let Some(slot) = &state.approval {
            match &slot.resume {
                None => {
                    // Unresumed interrupt: nothing may execute.
                    return Ok((update, Next::Continue));
                }
                Some(payload) if slot.capability_name == PLAN_APPROVAL => {
                    update.approval = None;
                    if !payload.approved {
                        tracing::info!("plan rejected; skipping execution");
                        let len = state.planning.execution_plan.len();
                        update.planning.current_step_index = len;
                        return Ok((update, Next::Continue));
                    }
                }
                Some(payload) => {
                    // Consume; cleared from state whichever way the step ends.
                    resume = Some(payload.clone());
                    update.approval = None;
                }
            }
        }

        let step = match state.current_step() {
            Some(step) => step.clone(),
            None => {
                update.error = Some(
                    ErrorRecord::new(
                        ErrorKind::CapabilityExecutionFailure,
                        "no step to execute at the current index",
                    )
                    .with_node(node_ids::EXECUTE_STEP),
                );
                return Ok((update, Next::Continue));
            }
        };

        // A consumed resume must be addressed to the capability this step runs.
        if resume.is_some() {
            if let Some(slot) = &state.approval {
                if slot.capability_name != step.capability_name {
                    update.error = Some(
                        ErrorRecord::new(
                            ErrorKind::CapabilityExecutionFailure,
                            format!(
                                "resume payload addressed to '{}' but current step runs '{}'",
                                slot.capability_name, step.capability_name
                            ),
                        )
                        .with_node(node_ids::EXECUTE_STEP),
                    );
                    return Ok((update, Next::Continue));
                }
            }
        }

        let capability = match self.registry.capability(&step.capability_name) {
            Ok(capability) => capability,
            Err(e) => {
                Self::reclassification_error(
                    &state,
                    &mut update,
                    &step.capability_name,
                    e.to_string(),
                );
                return Ok((update, Next::Continue));
            }
        };

        // Pre-extract declared inputs with cardinality validation.
        let inputs = match state
            .context
            .extract_for_step(&step.inputs, &capability.requires())
        {
            Ok(inputs) => inputs,
            Err(ContextError::UnknownContextKey { key, available }) => {
                let retry_count = super::prior_retry_count(&state, node_ids::EXECUTE_STEP) + 1;
                update.planning.replanning_feedback = Some(format!(
                    "step '{}' input '{}' is not stored. Available context keys: [{}]",
                    step.context_key,
                    key,
                    available.join(", ")
                ));
                update.error = Some(
                    ErrorRecord::new(
                        ErrorKind::InvalidContextKey,
                        format!("input '{}' references no stored context", key),
                    )
                    .with_node(node_ids::EXECUTE_STEP)
                    .with_capability(step.capability_name.clone())
                    .with_retry_count(retry_count),
                );
                return Ok((update, Next::Continue));
            }
            Err(e) => {
                update.error = Some(
                    ErrorRecord::new(ErrorKind::CapabilityExecutionFailure, e.to_string())
                        .with_node(node_ids::EXECUTE_STEP)
                        .with_capability(step.capability_name.clone()),
                );
                return Ok((update, Next::Continue));
            }
        };

        tracing::debug!(
            capability = %step.capability_name,
            context_key = %step.context_key,
            "executing step"
        );

        let view = StepView {
            step: &step,
            state: &state,
            inputs,
            resume,
        };

        match capability.execute(view).await {
            Ok(CapabilityOutcome::Update(mut capability_update)) => {
                // Post-validate declared outputs.
                for provided in capability.provides() {
                    if capability_update
                        .context
                        .get(&provided, &step.context_key)
                        .is_none()
                    {
                        update.error = Some(
                            ErrorRecord::new(
                                ErrorKind::CapabilityExecutionFailure,
                                format!(
                                    "capability '{}' did not produce a {} context under key '{}'",
                                    step.capability_name, provided, step.context_key
                                ),
                            )
                            .with_node(node_ids::EXECUTE_STEP)
                            .with_capability(step.capability_name.clone()),
                        );
                        return Ok((update, Next::Continue));
                    }
                }
                capability_update.planning.current_step_index =
                    state.planning.current_step_index + 1;
                capability_update.error = None;
                capability_update.approval = None;
                Ok((capability_update, Next::Continue))
            }
            Ok(CapabilityOutcome::Interrupt(payload)) => {
                tracing::info!(
                    capability = %step.capability_name,
                    "capability requested approval"
                );
                update.approval = Some(ApprovalSlot::suspended(payload));
                Ok((update, Next::Continue))
            }
            Err(e) => {
                match e.kind() {
                    ErrorKind::ReclassificationRequired => {
                        Self::reclassification_error(
                            &state,
                            &mut update,
                            &step.capability_name,
                            e.to_string(),
                        );
                    }
                    kind if kind.severity() == crate::error::ErrorSeverity::Retriable => {
                        let retry_count =
                            super::prior_retry_count(&state, node_ids::EXECUTE_STEP) + 1;
                        update.error = Some(
                            ErrorRecord::new(kind, e.to_string())
                                .with_node(node_ids::EXECUTE_STEP)
                                .with_capability(step.capability_name.clone())
                                .with_retry_count(retry_count),
                        );
                    }
                    kind => {
                        update.error = Some(
                            ErrorRecord::new(kind, e.to_string())
                                .with_node(node_ids::EXECUTE_STEP)
                                .with_capability(step.capability_name.clone()),
                        );
                    }
                }
                Ok((update, Next::Continue))
            }
        }
    }
}

/// Terminal holding node for suspended approvals.
///
/// Raises the graph interrupt so the runtime checkpoints and halts; external
/// code inspects the payload and resumes with `resume_from_node_id =
/// execute_step`.
pub struct ApprovalPauseNode;

#[async_trait]
impl Node<AgentState> for ApprovalPauseNode {
    fn id(&self) -> &str {
        node_ids::APPROVAL_PAUSE
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        match &state.approval {
            Some(slot) if slot.resume.is_none() => {
                let value = serde_json::to_value(&slot.interrupt)
                    .unwrap_or(serde_json::Value::Null);
                Err(AgentError::Interrupted(GraphInterrupt(Interrupt::new(
                    value,
                ))))
            }
            _ => Ok((state.update_base(), Next::End)),
        }
    }
}
