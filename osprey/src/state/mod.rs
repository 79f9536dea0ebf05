//! Agent state: the single record carried through every node.
//!
//! Partitioned into sub-records so nodes touch narrow slices: conversation
//! input/output, extracted task, classification results, the execution plan,
//! stored capability contexts, control flags and limits, the approval slot,
//! the error record, UI artifact registries, session preferences, and the
//! frontend interface kind. State is mutated only via node return values,
//! merged by [`AgentStateUpdater`] with per-field reducers.

mod agent_state;
mod context;
mod plan;
mod ui;

pub use agent_state::{
    AgentControl, AgentState, AgentStateUpdater, ClassificationSlice, ExecutionLimits,
    InputOutput, InterfaceKind, PlanningSlice, SessionSlice, TaskSlice,
};
pub use context::{
    Cardinality, ContextError, ContextMeta, ContextObject, ContextRequirement, ContextStore,
    ContextSummary, ExtractedContexts, ExtractedValue, StoredContext,
};
pub use plan::PlannedStep;
pub use ui::{ArtifactKind, UiArtifact, UiRegistry};
