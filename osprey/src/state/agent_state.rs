//! The agent state record and its per-field reducer.
//!
//! One `AgentState` flows through the whole graph; nodes return partial
//! updates built from [`AgentState::update_base`] (append-only collections
//! cleared) and [`AgentStateUpdater`] merges them: scalars and slices
//! replace, messages and UI artifacts append, the session slice merges, and
//! stored contexts union write-once.

use std::collections::BTreeMap;

use crate::approval::ApprovalSlot;
use crate::channels::StateUpdater;
use crate::error::ErrorRecord;
use crate::message::Message;

use super::context::ContextStore;
use super::plan::PlannedStep;
use super::ui::UiRegistry;

/// Conversation slice: user query, chat history, final assistant output.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InputOutput {
    /// The user query driving this turn.
    pub query: String,
    /// Role-tagged chat history, oldest first. Append-only within a turn.
    pub messages: Vec<Message>,
    /// Assistant response produced by the respond/clarify/error node.
    pub final_response: Option<String>,
}

/// Extracted task slice.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TaskSlice {
    pub task_objective: Option<String>,
    pub depends_on_chat_history: bool,
}

/// Classification slice: selected capabilities plus per-capability rationale.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassificationSlice {
    /// Ordered, deduplicated set (registry declaration order).
    pub active_capability_names: Vec<String>,
    pub rationale: BTreeMap<String, String>,
}

/// Planning slice: the accepted plan and the cursors over it.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlanningSlice {
    /// Immutable once accepted.
    pub execution_plan: Vec<PlannedStep>,
    /// In `[0, execution_plan.len()]`; equal to the length when complete.
    pub current_step_index: usize,
    pub reclassification_attempts: u32,
    /// Available-keys hint injected after an invalid-context-key failure;
    /// consumed by the next orchestration attempt.
    pub replanning_feedback: Option<String>,
}

impl PlanningSlice {
    /// True when every planned step has executed.
    pub fn plan_complete(&self) -> bool {
        self.current_step_index >= self.execution_plan.len()
    }
}

/// Retry / reclassification / concurrency budgets.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionLimits {
    pub max_execution_retries: u32,
    pub max_reclassifications: u32,
    pub max_concurrent_classifications: usize,
    pub max_generation_retries: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_execution_retries: 3,
            max_reclassifications: 2,
            max_concurrent_classifications: 5,
            max_generation_retries: 2,
        }
    }
}

/// Control flags: bypass modes, planning approval, budgets.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AgentControl {
    /// Skip the task-extraction LLM call; use deterministic formatting.
    pub task_extraction_bypass: bool,
    /// Skip classification; activate all registered capabilities.
    pub classification_bypass: bool,
    /// Emit a plan-approval interrupt before executing an accepted plan.
    pub planning_mode: bool,
    pub limits: ExecutionLimits,
}

/// Session slice: persists across turns; merged, never replaced.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionSlice {
    pub direct_chat: bool,
    pub capability_modes: BTreeMap<String, String>,
    pub preferences: BTreeMap<String, String>,
}

impl SessionSlice {
    /// Merge-and-preserve: scalar flags replace, maps extend.
    pub fn merge_from(&mut self, other: &SessionSlice) {
        self.direct_chat = other.direct_chat;
        for (k, v) in &other.capability_modes {
            self.capability_modes.insert(k.clone(), v.clone());
        }
        for (k, v) in &other.preferences {
            self.preferences.insert(k.clone(), v.clone());
        }
    }
}

/// Runtime-detected frontend identity; read-only to nodes, influences
/// response shape only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    #[default]
    Terminal,
    Web,
    Http,
}

/// The per-conversation record carried through the graph.
///
/// **Interaction**: created by the gateway at the first message of a turn
/// (merging prior session state from the checkpointer), mutated only via node
/// return values merged by [`AgentStateUpdater`], checkpointed at every node
/// boundary, finalized by the respond/error node.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AgentState {
    pub input_output: InputOutput,
    pub task: TaskSlice,
    pub classification: ClassificationSlice,
    pub planning: PlanningSlice,
    /// `context[type][key]`; write-once per turn.
    pub context: ContextStore,
    pub control: AgentControl,
    pub approval: Option<ApprovalSlot>,
    pub error: Option<ErrorRecord>,
    pub ui: UiRegistry,
    pub session: SessionSlice,
    pub interface: InterfaceKind,
}

impl AgentState {
    /// Fresh state for one user query.
    pub fn for_query(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            input_output: InputOutput {
                query: query.clone(),
                messages: vec![Message::user(query)],
                final_response: None,
            },
            ..Default::default()
        }
    }

    /// The step the runner would execute next, if any.
    pub fn current_step(&self) -> Option<&PlannedStep> {
        self.planning
            .execution_plan
            .get(self.planning.current_step_index)
    }

    /// Base for a node's partial update: a clone with the append-only
    /// collections (messages, UI artifacts) emptied, so the reducer can
    /// append exactly what the node adds.
    pub fn update_base(&self) -> AgentState {
        let mut base = self.clone();
        base.input_output.messages.clear();
        base.ui = UiRegistry::new();
        base
    }
}

/// Per-field reducer for [`AgentState`].
///
/// Replace for scalars and slices, append for messages and artifact
/// registries, merge-and-preserve for `session`, write-once union for stored
/// contexts. Installed on the agent graph via
/// `StateGraph::with_state_updater`.
#[derive(Debug, Clone, Default)]
pub struct AgentStateUpdater;

impl StateUpdater<AgentState> for AgentStateUpdater {
    fn apply_update(&self, current: &mut AgentState, update: &AgentState) {
        // input_output: query and final_response replace; messages append.
        current.input_output.query = update.input_output.query.clone();
        current.input_output.final_response = update.input_output.final_response.clone();
        current
            .input_output
            .messages
            .extend(update.input_output.messages.iter().cloned());

        // Replace the narrow slices.
        current.task = update.task.clone();
        current.classification = update.classification.clone();
        current.planning = update.planning.clone();
        current.control = update.control.clone();
        current.approval = update.approval.clone();
        current.error = update.error.clone();
        current.interface = update.interface;

        // Contexts: write-once union. A node's update carries a superset of
        // the current store (built from update_base), so only absent slots
        // are inserted; existing slots are never overwritten.
        for summary in update.context.list_summaries() {
            if current
                .context
                .get(&summary.context_type, &summary.key)
                .is_none()
            {
                if let Some(ctx) = update.context.get(&summary.context_type, &summary.key) {
                    let _ = current.context.store(
                        summary.context_type.clone(),
                        summary.key.clone(),
                        ctx.value.clone(),
                        ctx.summary.clone(),
                        ctx.meta.task_objective.clone(),
                        ctx.meta.produced_by.clone(),
                    );
                }
            }
        }

        // UI registries append; session merges.
        current.ui.extend(&update.ui);
        current.session.merge_from(&update.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: for_query seeds the query and one user message.
    #[test]
    fn for_query_seeds_history() {
        let state = AgentState::for_query("What is X?");
        assert_eq!(state.input_output.query, "What is X?");
        assert_eq!(state.input_output.messages.len(), 1);
        assert!(state.task.task_objective.is_none());
        assert!(state.planning.plan_complete(), "empty plan is complete");
    }

    /// **Scenario**: update_base clears messages and artifacts but keeps the rest.
    #[test]
    fn update_base_clears_append_only_fields() {
        let mut state = AgentState::for_query("q");
        state.ui.push(crate::state::UiArtifact::new(
            crate::state::ArtifactKind::Image,
            "cap",
            "plot",
            serde_json::json!({}),
        ));
        let base = state.update_base();
        assert!(base.input_output.messages.is_empty());
        assert!(base.ui.is_empty());
        assert_eq!(base.input_output.query, "q");
    }

    /// **Scenario**: The reducer appends messages/artifacts and replaces slices.
    #[test]
    fn reducer_appends_and_replaces() {
        let mut current = AgentState::for_query("q");
        let mut update = current.update_base();
        update.input_output.messages.push(Message::assistant("a"));
        update.task.task_objective = Some("objective".into());
        update.ui.push(crate::state::UiArtifact::new(
            crate::state::ArtifactKind::Image,
            "cap",
            "plot",
            serde_json::json!({}),
        ));

        AgentStateUpdater.apply_update(&mut current, &update);
        assert_eq!(current.input_output.messages.len(), 2, "user + assistant");
        assert_eq!(current.task.task_objective.as_deref(), Some("objective"));
        assert_eq!(current.ui.images.len(), 1);
    }

    /// **Scenario**: The reducer never overwrites an existing context slot.
    #[test]
    fn reducer_contexts_write_once() {
        let mut current = AgentState::for_query("q");
        current
            .context
            .store("T", "k", serde_json::json!(1), "first", "obj", "cap")
            .unwrap();

        // A (buggy) update carrying a different value for the same slot.
        let mut update = current.update_base();
        update.context = ContextStore::new();
        update
            .context
            .store("T", "k", serde_json::json!(2), "second", "obj", "cap")
            .unwrap();

        AgentStateUpdater.apply_update(&mut current, &update);
        assert_eq!(current.context.get("T", "k").unwrap().value, 1);
    }

    /// **Scenario**: Session merge preserves existing preferences and adds new ones.
    #[test]
    fn reducer_merges_session() {
        let mut current = AgentState::for_query("q");
        current
            .session
            .preferences
            .insert("units".into(), "mA".into());
        let mut update = current.update_base();
        update.session = SessionSlice::default();
        update
            .session
            .preferences
            .insert("verbosity".into(), "terse".into());

        AgentStateUpdater.apply_update(&mut current, &update);
        assert_eq!(current.session.preferences.get("units").unwrap(), "mA");
        assert_eq!(current.session.preferences.get("verbosity").unwrap(), "terse");
    }

    /// **Scenario**: AgentState round-trips through serde (checkpoint format).
    #[test]
    fn agent_state_serde_roundtrip() {
        let mut state = AgentState::for_query("q");
        state.planning.execution_plan.push(PlannedStep::new(
            "channel_read",
            "cv_1",
            "read X",
        ));
        state
            .context
            .store("CHANNEL_VALUES", "cv_1", serde_json::json!(5.0), "X=5", "read X", "channel_read")
            .unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let back: AgentState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
