//! Capability interface: named units of work exposed to the orchestrator.
//!
//! A capability declares typed inputs (`requires`) and outputs (`provides`),
//! contributes classifier and orchestrator-guide examples, and implements
//! `execute` over a step-local view. The runner (nodes::capability_runner)
//! injects the view, validates inputs and outputs, and maps errors into the
//! router's taxonomy.

mod examples;

pub use examples::{ClassifierExample, OrchestratorExample};

use async_trait::async_trait;
use thiserror::Error;

use crate::approval::{InterruptPayload, OperationFeatures, ResumePayload};
use crate::error::ErrorKind;
use crate::state::{AgentState, ContextRequirement, ExtractedContexts, PlannedStep};

/// Error raised by a capability's `execute()`.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Transient failure worth retrying (service hiccup, timeout).
    #[error("retriable: {0}")]
    Retriable(String),
    /// The capability cannot do what the step asks; the plan needs different
    /// capabilities.
    #[error("task rejected: {0}")]
    TaskRejected(String),
    /// Hard failure after the capability's own retries.
    #[error("{message}")]
    Failed {
        message: String,
        metadata: serde_json::Map<String, serde_json::Value>,
    },
}

impl CapabilityError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Router-facing error kind for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Retriable(_) => ErrorKind::LlmFailure,
            Self::TaskRejected(_) => ErrorKind::ReclassificationRequired,
            Self::Failed { .. } => ErrorKind::CapabilityExecutionFailure,
        }
    }
}

/// Step-local view injected into `Capability::execute`.
///
/// `inputs` holds the pre-extracted contexts named by the step (cardinality
/// already validated); `resume` carries a consumed approval decision when the
/// step re-runs after an interrupt.
pub struct StepView<'a> {
    pub step: &'a PlannedStep,
    pub state: &'a AgentState,
    pub inputs: ExtractedContexts,
    pub resume: Option<ResumePayload>,
}

impl<'a> StepView<'a> {
    /// Base for this step's partial state update (append-only fields cleared).
    pub fn update(&self) -> AgentState {
        self.state.update_base()
    }

    /// A scalar parameter from the step, as a string.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.step.parameters.get(key).and_then(|v| v.as_str())
    }
}

/// What a capability produced: a partial state update, or a request to
/// suspend for human approval.
#[derive(Debug)]
pub enum CapabilityOutcome {
    Update(AgentState),
    Interrupt(InterruptPayload),
}

/// A named, typed unit of work exposed to the orchestrator.
///
/// **Interaction**: registered via `CapabilityRegistration`; instantiated
/// lazily by the registry; invoked through the capability runner node.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique capability name (e.g. `"channel_read"`).
    fn name(&self) -> &str;

    /// One-paragraph description used in classification prompts.
    fn description(&self) -> &str;

    /// Context type names this capability produces.
    fn provides(&self) -> Vec<String>;

    /// Declared inputs: context type plus cardinality. Empty when the
    /// capability needs no stored contexts.
    fn requires(&self) -> Vec<ContextRequirement> {
        Vec::new()
    }

    /// Few-shot examples for the relevance classifier.
    fn classifier_examples(&self) -> Vec<ClassifierExample> {
        Vec::new()
    }

    /// Worked examples for the orchestrator prompt.
    fn orchestrator_examples(&self) -> Vec<OrchestratorExample> {
        Vec::new()
    }

    /// Operation features the approval policy evaluates (default read-only).
    fn operation_features(&self) -> OperationFeatures {
        OperationFeatures::read_only()
    }

    /// Run one planned step. Must store at least one context of each
    /// `provides` type under the step's `context_key`, unless returning an
    /// interrupt.
    async fn execute(&self, view: StepView<'_>) -> Result<CapabilityOutcome, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Capability error kinds map to the router taxonomy.
    #[test]
    fn capability_error_kinds() {
        assert_eq!(
            CapabilityError::Retriable("hiccup".into()).kind(),
            ErrorKind::LlmFailure
        );
        assert_eq!(
            CapabilityError::TaskRejected("not mine".into()).kind(),
            ErrorKind::ReclassificationRequired
        );
        assert_eq!(
            CapabilityError::failed("boom").kind(),
            ErrorKind::CapabilityExecutionFailure
        );
    }

    /// **Scenario**: StepView::parameter reads string parameters from the step.
    #[test]
    fn step_view_parameter_access() {
        let step = PlannedStep::new("channel_read", "cv_1", "read X")
            .with_parameter("channel", serde_json::json!("SR:X"));
        let state = AgentState::for_query("q");
        let view = StepView {
            step: &step,
            state: &state,
            inputs: ExtractedContexts::new(),
            resume: None,
        };
        assert_eq!(view.parameter("channel"), Some("SR:X"));
        assert_eq!(view.parameter("missing"), None);
    }
}
