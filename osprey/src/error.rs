//! Agent execution error types and the in-state error record.
//!
//! Two layers: `AgentError` is what nodes return to the graph runner
//! (execution failure or interrupt); `ErrorRecord` is the structured record a
//! node writes into `AgentState::error` so the router can decide between
//! retry, reclassification, re-planning, and the error node.

use thiserror::Error;

use crate::graph::GraphInterrupt;

/// How the router treats an error: retry the failing node, roll back to
/// classification, re-plan, or go to the error node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// Transient; re-enter the failing node while the retry budget allows.
    Retriable,
    /// The plan references something the active capability set cannot satisfy;
    /// discard the plan and re-enter classification.
    Reclassification,
    /// The plan referenced a non-existent context key; the capability set is
    /// fine, so re-enter orchestration with the available keys as feedback.
    Replanning,
    /// Not recoverable this turn; route to the error node.
    Fatal,
}

/// Error taxonomy. Severity is derived from the kind, not stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Transient LLM failure (provider error, malformed response).
    LlmFailure,
    /// The structured-output payload did not parse into the expected schema.
    StructuredOutputParse,
    /// An LLM call or external service exceeded its per-node timeout.
    Timeout,
    /// A planned step names a capability outside the active set, or a
    /// capability rejected its assigned task.
    ReclassificationRequired,
    /// The orchestrator referenced a context key no earlier step produces.
    InvalidContextKey,
    /// Classification selected no capability at all.
    ClassificationFailure,
    /// A capability's execute() failed after exhausting its own retries.
    CapabilityExecutionFailure,
    /// A retry or reclassification counter met its ceiling.
    BudgetExhausted,
    /// Malformed configuration or registry; fatal at startup.
    Configuration,
}

impl ErrorKind {
    /// Router-facing severity for this kind.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::LlmFailure | Self::StructuredOutputParse | Self::Timeout => {
                ErrorSeverity::Retriable
            }
            Self::ReclassificationRequired => ErrorSeverity::Reclassification,
            Self::InvalidContextKey => ErrorSeverity::Replanning,
            Self::ClassificationFailure
            | Self::CapabilityExecutionFailure
            | Self::BudgetExhausted
            | Self::Configuration => ErrorSeverity::Fatal,
        }
    }
}

/// Structured error record stored in `AgentState::error`.
///
/// Carries a user-safe `message` and a debug `metadata` mapping; the error
/// node turns it into a user-facing explanation and never leaks traces.
///
/// **Interaction**: written by nodes on failure; read by the router
/// (`route_next`) and cleared by the node that handles it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    /// User-safe description of what went wrong.
    pub message: String,
    /// Graph node that recorded the error (e.g. `"orchestration"`).
    pub failing_node: Option<String>,
    /// Capability involved, when the failure happened inside a step.
    pub failing_capability: Option<String>,
    /// Attempts so far for this error site; compared against the budgets in
    /// `AgentControl::limits` by the router.
    pub retry_count: u32,
    /// Debug details; never shown to the user verbatim.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            failing_node: None,
            failing_capability: None,
            retry_count: 0,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.failing_node = Some(node.into());
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.failing_capability = Some(capability.into());
        self
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Severity derived from the kind.
    pub fn severity(&self) -> ErrorSeverity {
        self.kind.severity()
    }
}

/// Agent execution error.
///
/// Returned by `Node::run` when a step fails outright (as opposed to writing
/// an `ErrorRecord` into state for the router to handle).
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (e.g. checkpointer failure, empty graph).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Graph execution was suspended by an interrupt.
    ///
    /// Raised when a capability requests human approval. The graph executor
    /// catches this, saves a checkpoint, and later resumes execution with a
    /// resume payload.
    #[error("graph interrupted: {0}")]
    Interrupted(GraphInterrupt),
}

impl From<GraphInterrupt> for AgentError {
    fn from(interrupt: GraphInterrupt) -> Self {
        AgentError::Interrupted(interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Every ErrorKind maps to the severity the router expects.
    #[test]
    fn error_kind_severity_mapping() {
        assert_eq!(ErrorKind::LlmFailure.severity(), ErrorSeverity::Retriable);
        assert_eq!(
            ErrorKind::StructuredOutputParse.severity(),
            ErrorSeverity::Retriable
        );
        assert_eq!(ErrorKind::Timeout.severity(), ErrorSeverity::Retriable);
        assert_eq!(
            ErrorKind::ReclassificationRequired.severity(),
            ErrorSeverity::Reclassification
        );
        assert_eq!(
            ErrorKind::InvalidContextKey.severity(),
            ErrorSeverity::Replanning
        );
        assert_eq!(
            ErrorKind::BudgetExhausted.severity(),
            ErrorSeverity::Fatal
        );
        assert_eq!(
            ErrorKind::CapabilityExecutionFailure.severity(),
            ErrorSeverity::Fatal
        );
    }

    /// **Scenario**: Builder methods populate node, capability, retry count and metadata.
    #[test]
    fn error_record_builders() {
        let rec = ErrorRecord::new(ErrorKind::LlmFailure, "provider unavailable")
            .with_node("classification")
            .with_capability("channel_read")
            .with_retry_count(2)
            .with_metadata("status", serde_json::json!(503));
        assert_eq!(rec.failing_node.as_deref(), Some("classification"));
        assert_eq!(rec.failing_capability.as_deref(), Some("channel_read"));
        assert_eq!(rec.retry_count, 2);
        assert_eq!(rec.metadata["status"], 503);
        assert_eq!(rec.severity(), ErrorSeverity::Retriable);
    }

    /// **Scenario**: Display of ExecutionFailed contains the message.
    #[test]
    fn agent_error_display_execution_failed() {
        let err = AgentError::ExecutionFailed("msg".to_string());
        let s = err.to_string();
        assert!(s.contains("execution failed"), "{}", s);
        assert!(s.contains("msg"), "{}", s);
    }
}
