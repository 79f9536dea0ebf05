//! Orchestration node: synthesize and validate the execution plan.
//!
//! The orchestrator prompt carries the task objective, each active
//! capability's guide examples (numbered, join-formatted), and a listing of
//! already-stored contexts. Candidate plans are validated in order: known
//! capability, unique context keys, no forward input references, and input
//! types matching the capability's declared requirements. An unknown
//! capability triggers reclassification (bounded); a bad context key
//! triggers re-planning with the available keys as feedback.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::approval::{ApprovalSlot, InterruptPayload};
use crate::error::{AgentError, ErrorKind, ErrorRecord};
use crate::graph::{Next, Node};
use crate::llm::{CompletionRequest, ModelRole, ModelSelector, ProviderError, StructuredSchema};
use crate::message::Message;
use crate::prompts::AgentPrompts;
use crate::registry::Registry;
use crate::state::{AgentState, Cardinality, ContextStore, PlannedStep};

use super::node_ids;

/// Capability name used in the approval slot when planning mode suspends for
/// plan sign-off (not a real capability).
pub const PLAN_APPROVAL: &str = "__plan__";

#[derive(Debug, serde::Deserialize)]
struct PlanOutput {
    steps: Vec<PlannedStep>,
}

/// A defect found while validating a candidate plan.
enum PlanDefect {
    UnknownCapability(String),
    DuplicateKey(String),
    InvalidInput { key: String, available: Vec<String> },
    TypeMismatch { step: String, message: String },
}

pub struct OrchestrationNode {
    llm: ModelSelector,
    prompts: Arc<AgentPrompts>,
    registry: Arc<Registry>,
}

impl OrchestrationNode {
    pub fn new(llm: ModelSelector, prompts: Arc<AgentPrompts>, registry: Arc<Registry>) -> Self {
        Self {
            llm,
            prompts,
            registry,
        }
    }

    fn schema() -> StructuredSchema {
        StructuredSchema {
            name: "execution_plan".into(),
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "steps": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "capability_name": {"type": "string"},
                                "context_key": {"type": "string"},
                                "task_objective": {"type": "string"},
                                "inputs": {"type": "array", "items": {"type": "string"}},
                                "parameters": {"type": "object"}
                            },
                            "required": ["capability_name", "context_key", "task_objective"]
                        }
                    }
                },
                "required": ["steps"]
            }),
        }
    }

    fn capabilities_block(&self, active: &[String]) -> String {
        let mut lines = Vec::new();
        let mut example_index = 0usize;
        for name in active {
            let description = self
                .registry
                .capability_description(name)
                .unwrap_or("")
                .to_string();
            lines.push(format!("- {}: {}", name, description));
            if let Ok(capability) = self.registry.capability(name) {
                for example in capability.orchestrator_examples() {
                    example_index += 1;
                    lines.push(example.render(example_index));
                }
            }
        }
        lines.join("\n")
    }

    fn contexts_block(store: &ContextStore) -> String {
        let summaries = store.truncated_for_prompt(1024).list_summaries();
        if summaries.is_empty() {
            return "(none)".to_string();
        }
        summaries
            .iter()
            .map(|s| {
                format!(
                    "- [{}] {}: {} — {}",
                    s.context_type, s.key, s.task_objective, s.summary
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Validates a candidate plan against the active set and stored contexts.
    fn validate_plan(
        &self,
        steps: &[PlannedStep],
        active: &[String],
        store: &ContextStore,
    ) -> Result<(), PlanDefect> {
        // Possible context types per key: stored keys first, then plan keys
        // as each step is accepted.
        let mut key_types: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for summary in store.list_summaries() {
            key_types
                .entry(summary.key)
                .or_default()
                .push(summary.context_type);
        }

        let mut plan_keys: Vec<String> = Vec::new();
        for step in steps {
            if !active.iter().any(|n| n == &step.capability_name) {
                return Err(PlanDefect::UnknownCapability(step.capability_name.clone()));
            }
            if plan_keys.iter().any(|k| k == &step.context_key) {
                return Err(PlanDefect::DuplicateKey(step.context_key.clone()));
            }

            let capability = self
                .registry
                .capability(&step.capability_name)
                .map_err(|_| PlanDefect::UnknownCapability(step.capability_name.clone()))?;

            for input in &step.inputs {
                if !key_types.contains_key(input) {
                    return Err(PlanDefect::InvalidInput {
                        key: input.clone(),
                        available: key_types.keys().cloned().collect(),
                    });
                }
            }

            for requirement in capability.requires() {
                let matching = step
                    .inputs
                    .iter()
                    .filter(|input| {
                        key_types
                            .get(*input)
                            .map(|types| types.contains(&requirement.context_type))
                            .unwrap_or(false)
                    })
                    .count();
                let ok = match requirement.cardinality {
                    Cardinality::Single => matching == 1,
                    Cardinality::Any => matching >= 1,
                    Cardinality::Multiple => true,
                };
                if !ok {
                    return Err(PlanDefect::TypeMismatch {
                        step: step.context_key.clone(),
                        message: format!(
                            "capability {} requires {} input(s) of type {}",
                            step.capability_name,
                            match requirement.cardinality {
                                Cardinality::Single => "exactly one",
                                Cardinality::Any => "at least one",
                                Cardinality::Multiple => "any number of",
                            },
                            requirement.context_type
                        ),
                    });
                }
            }

            plan_keys.push(step.context_key.clone());
            key_types
                .entry(step.context_key.clone())
                .or_default()
                .extend(capability.provides());
        }
        Ok(())
    }
}

#[async_trait]
impl Node<AgentState> for OrchestrationNode {
    fn id(&self) -> &str {
        node_ids::ORCHESTRATION
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let mut update = state.update_base();
        update.error = None;

        let task = state.task.task_objective.clone().unwrap_or_default();
        let active = state.classification.active_capability_names.clone();
        let feedback = match &state.planning.replanning_feedback {
            Some(feedback) => format!("\nPrevious attempt was invalid: {}\n", feedback),
            None => String::new(),
        };

        let prompt = self
            .prompts
            .orchestration_prompt()
            .replace("{task}", &task)
            .replace("{capabilities}", &self.capabilities_block(&active))
            .replace("{contexts}", &Self::contexts_block(&state.context))
            .replace("{feedback}", &feedback);

        let request = CompletionRequest::new(
            ModelRole::Orchestrator,
            vec![Message::system(prompt), Message::user(task.clone())],
        )
        .with_schema(Self::schema());

        let steps = match self.llm.complete(request).await.and_then(|response| {
            let value = response.require_structured()?;
            serde_json::from_value::<PlanOutput>(value)
                .map(|p| p.steps)
                .map_err(|e| ProviderError::Parse(e.to_string()))
        }) {
            Ok(steps) => steps,
            Err(e) => {
                let retry_count = super::prior_retry_count(&state, node_ids::ORCHESTRATION) + 1;
                update.error = Some(
                    ErrorRecord::new(e.kind(), e.to_string())
                        .with_node(node_ids::ORCHESTRATION)
                        .with_retry_count(retry_count),
                );
                return Ok((update, Next::Continue));
            }
        };

        match self.validate_plan(&steps, &active, &state.context) {
            Ok(()) => {
                tracing::info!(steps = steps.len(), "plan accepted");
                update.planning.execution_plan = steps.clone();
                update.planning.current_step_index = 0;
                update.planning.replanning_feedback = None;

                if state.control.planning_mode {
                    let interrupt = InterruptPayload::new(
                        PLAN_APPROVAL,
                        format!("execute a {}-step plan for: {}", steps.len(), task),
                    )
                    .with_payload(serde_json::json!({
                        "steps": steps,
                    }));
                    update.approval = Some(ApprovalSlot::suspended(interrupt));
                }
                Ok((update, Next::Continue))
            }
            Err(PlanDefect::UnknownCapability(name)) => {
                let limits = &state.control.limits;
                // An increment that reaches the bound exhausts the budget; a
                // ReclassificationRequired record is only ever written with a
                // post-increment counter below it.
                let next = state.planning.reclassification_attempts + 1;
                if next >= limits.max_reclassifications {
                    update.planning.reclassification_attempts = limits.max_reclassifications;
                    update.error = Some(
                        ErrorRecord::new(
                            ErrorKind::BudgetExhausted,
                            "the request could not be mapped to the agent's capabilities",
                        )
                        .with_node(node_ids::ORCHESTRATION)
                        .with_capability(name),
                    );
                } else {
                    update.planning.reclassification_attempts = next;
                    update.error = Some(
                        ErrorRecord::new(
                            ErrorKind::ReclassificationRequired,
                            format!("plan references unknown capability '{}'", name),
                        )
                        .with_node(node_ids::ORCHESTRATION)
                        .with_capability(name),
                    );
                }
                Ok((update, Next::Continue))
            }
            Err(defect) => {
                let (message, available) = match defect {
                    PlanDefect::DuplicateKey(key) => {
                        (format!("duplicate context key '{}'", key), Vec::new())
                    }
                    PlanDefect::InvalidInput { key, available } => (
                        format!("input '{}' references no earlier or stored context", key),
                        available,
                    ),
                    PlanDefect::TypeMismatch { step, message } => {
                        (format!("step '{}': {}", step, message), Vec::new())
                    }
                    PlanDefect::UnknownCapability(_) => unreachable!(),
                };
                let retry_count = super::prior_retry_count(&state, node_ids::ORCHESTRATION) + 1;
                update.planning.replanning_feedback = Some(format!(
                    "{}. Available context keys: [{}]",
                    message,
                    available.join(", ")
                ));
                update.error = Some(
                    ErrorRecord::new(ErrorKind::InvalidContextKey, message)
                        .with_node(node_ids::ORCHESTRATION)
                        .with_retry_count(retry_count),
                );
                Ok((update, Next::Continue))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalPolicy;
    use crate::capabilities::{framework_defaults, FrameworkServices};
    use crate::llm::MockProvider;
    use crate::prompts;
    use crate::services::MockConnector;

    fn registry() -> Arc<Registry> {
        let services = FrameworkServices::mock(
            Arc::new(MockConnector::new().with_channel("SR:X", 5.0)),
            ApprovalPolicy::default(),
        );
        Arc::new(Registry::from_config(framework_defaults(&services)).unwrap())
    }

    fn node_with_plan(plan: serde_json::Value) -> OrchestrationNode {
        let mock = Arc::new(MockProvider::new().with_structured(ModelRole::Orchestrator, plan));
        OrchestrationNode::new(
            ModelSelector::new(mock),
            Arc::new(prompts::default_from_embedded()),
            registry(),
        )
    }

    fn planning_state(active: &[&str]) -> AgentState {
        let mut state = AgentState::for_query("q");
        state.task.task_objective = Some("do the thing".into());
        state.classification.active_capability_names =
            active.iter().map(|s| s.to_string()).collect();
        state
    }

    /// **Scenario**: A valid two-step plan is accepted with step index zero.
    #[tokio::test]
    async fn valid_plan_accepted() {
        let node = node_with_plan(serde_json::json!({
            "steps": [
                {"capability_name": "time_range", "context_key": "tr_hour",
                 "task_objective": "parse the last hour"},
                {"capability_name": "archiver_data", "context_key": "ar_1",
                 "task_objective": "fetch `SR:X` history", "inputs": ["tr_hour"]}
            ]
        }));
        let (update, _) = node
            .run(planning_state(&["time_range", "archiver_data"]))
            .await
            .unwrap();
        assert!(update.error.is_none());
        assert_eq!(update.planning.execution_plan.len(), 2);
        assert_eq!(update.planning.current_step_index, 0);
    }

    /// **Scenario**: An unknown capability triggers reclassification and bumps the counter.
    #[tokio::test]
    async fn unknown_capability_reclassifies() {
        let node = node_with_plan(serde_json::json!({
            "steps": [
                {"capability_name": "nonexistent", "context_key": "x",
                 "task_objective": "do something"}
            ]
        }));
        let (update, _) = node.run(planning_state(&["channel_read"])).await.unwrap();
        let error = update.error.unwrap();
        assert_eq!(error.kind, ErrorKind::ReclassificationRequired);
        assert_eq!(error.failing_capability.as_deref(), Some("nonexistent"));
        assert_eq!(update.planning.reclassification_attempts, 1);
    }

    /// **Scenario**: The increment that reaches the bound produces
    /// BudgetExhausted with the counter left exactly at the bound.
    #[tokio::test]
    async fn reclassification_budget_exhausts_at_bound() {
        let node = node_with_plan(serde_json::json!({
            "steps": [
                {"capability_name": "nonexistent", "context_key": "x",
                 "task_objective": "do something"}
            ]
        }));
        let mut state = planning_state(&["channel_read"]);
        state.planning.reclassification_attempts =
            state.control.limits.max_reclassifications - 1;
        let (update, _) = node.run(state.clone()).await.unwrap();
        let error = update.error.unwrap();
        assert_eq!(error.kind, ErrorKind::BudgetExhausted);
        assert_eq!(
            update.planning.reclassification_attempts,
            state.control.limits.max_reclassifications
        );
    }

    /// **Scenario**: Past the bound the gate still reports exhaustion without
    /// growing the counter.
    #[tokio::test]
    async fn reclassification_budget_exhausts_past_bound() {
        let node = node_with_plan(serde_json::json!({
            "steps": [
                {"capability_name": "nonexistent", "context_key": "x",
                 "task_objective": "do something"}
            ]
        }));
        let mut state = planning_state(&["channel_read"]);
        state.planning.reclassification_attempts = state.control.limits.max_reclassifications;
        let (update, _) = node.run(state.clone()).await.unwrap();
        assert_eq!(update.error.unwrap().kind, ErrorKind::BudgetExhausted);
        assert_eq!(
            update.planning.reclassification_attempts,
            state.control.limits.max_reclassifications
        );
    }

    /// **Scenario**: A forward input reference triggers re-planning with available keys.
    #[tokio::test]
    async fn forward_reference_replans() {
        let node = node_with_plan(serde_json::json!({
            "steps": [
                {"capability_name": "archiver_data", "context_key": "ar_1",
                 "task_objective": "fetch history", "inputs": ["tr_hour"]},
                {"capability_name": "time_range", "context_key": "tr_hour",
                 "task_objective": "parse the last hour"}
            ]
        }));
        let (update, _) = node
            .run(planning_state(&["time_range", "archiver_data"]))
            .await
            .unwrap();
        let error = update.error.unwrap();
        assert_eq!(error.kind, ErrorKind::InvalidContextKey);
        assert!(update
            .planning
            .replanning_feedback
            .unwrap()
            .contains("Available context keys"));
    }

    /// **Scenario**: Duplicate context keys within a plan are rejected.
    #[tokio::test]
    async fn duplicate_context_key_rejected() {
        let node = node_with_plan(serde_json::json!({
            "steps": [
                {"capability_name": "time_range", "context_key": "k",
                 "task_objective": "parse the last hour"},
                {"capability_name": "time_range", "context_key": "k",
                 "task_objective": "parse the last day"}
            ]
        }));
        let (update, _) = node.run(planning_state(&["time_range"])).await.unwrap();
        assert_eq!(update.error.unwrap().kind, ErrorKind::InvalidContextKey);
    }

    /// **Scenario**: Requirement cardinality is enforced at plan time
    /// (archiver_data without a TIME_RANGE input is invalid).
    #[tokio::test]
    async fn requirement_cardinality_enforced() {
        let node = node_with_plan(serde_json::json!({
            "steps": [
                {"capability_name": "archiver_data", "context_key": "ar_1",
                 "task_objective": "fetch `SR:X` history"}
            ]
        }));
        let (update, _) = node.run(planning_state(&["archiver_data"])).await.unwrap();
        assert_eq!(update.error.unwrap().kind, ErrorKind::InvalidContextKey);
    }

    /// **Scenario**: Planning mode installs a plan-approval interrupt slot.
    #[tokio::test]
    async fn planning_mode_suspends_for_approval() {
        let node = node_with_plan(serde_json::json!({
            "steps": [
                {"capability_name": "time_range", "context_key": "tr",
                 "task_objective": "parse the last hour"}
            ]
        }));
        let mut state = planning_state(&["time_range"]);
        state.control.planning_mode = true;
        let (update, _) = node.run(state).await.unwrap();
        let slot = update.approval.unwrap();
        assert_eq!(slot.capability_name, PLAN_APPROVAL);
        assert!(slot.resume.is_none());
        assert_eq!(slot.interrupt.payload["steps"][0]["context_key"], "tr");
    }
}
