//! Agent graph nodes: task extraction → classification → orchestration →
//! stepwise execution → respond, with clarify and error terminals.
//!
//! The [`router`] is entered after every interior node and picks the next
//! node from the current state alone. Nodes return partial updates (built
//! from `AgentState::update_base`); the only counters they touch are their
//! own retry/reclassification fields, written into the error record or the
//! planning slice of their update.

mod capability_runner;
mod classification;
mod clarify;
mod error_node;
mod gateway;
mod orchestration;
mod respond;
pub mod router;
mod task_extraction;

pub use capability_runner::{ApprovalPauseNode, CapabilityRunnerNode};
pub use classification::ClassificationNode;
pub use clarify::ClarifyNode;
pub use error_node::ErrorNode;
pub use gateway::{Gateway, GatewayOutcome, SlashCommand};
pub use orchestration::OrchestrationNode;
pub use respond::RespondNode;
pub use router::route_next;
pub use task_extraction::TaskExtractionNode;

/// Retry count already accumulated for `node`, from the state's error record.
pub(crate) fn prior_retry_count(state: &crate::state::AgentState, node: &str) -> u32 {
    state
        .error
        .as_ref()
        .filter(|e| e.failing_node.as_deref() == Some(node))
        .map(|e| e.retry_count)
        .unwrap_or(0)
}

/// Node ids used across the graph and the router.
pub mod node_ids {
    pub const TASK_EXTRACTION: &str = "task_extraction";
    pub const CLASSIFICATION: &str = "classification";
    pub const ORCHESTRATION: &str = "orchestration";
    pub const EXECUTE_STEP: &str = "execute_step";
    pub const APPROVAL_PAUSE: &str = "approval_pause";
    pub const RESPOND: &str = "respond";
    pub const CLARIFY: &str = "clarify";
    pub const ERROR: &str = "error";
}
