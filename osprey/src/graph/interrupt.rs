//! Interrupt mechanism for graph execution.
//!
//! A node that needs human input returns `AgentError::Interrupted`; the graph
//! executor saves a checkpoint and halts. External code inspects the
//! interrupt, produces a resume payload, and re-enters the graph at the same
//! node.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Interrupt value raised during graph execution.
///
/// `value` is the interrupt body (for Osprey, a serialized
/// [`crate::approval::InterruptPayload`]); `id` optionally identifies the
/// interrupt site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interrupt {
    pub value: serde_json::Value,
    pub id: Option<String>,
}

impl Interrupt {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value, id: None }
    }

    pub fn with_id(value: serde_json::Value, id: String) -> Self {
        Self {
            value,
            id: Some(id),
        }
    }
}

/// Error raised when a graph is interrupted.
///
/// Caught by the graph executor to checkpoint and suspend.
#[derive(Debug, Clone, Error)]
#[error("graph interrupted: {0:?}")]
pub struct GraphInterrupt(pub Interrupt);

impl From<Interrupt> for GraphInterrupt {
    fn from(interrupt: Interrupt) -> Self {
        GraphInterrupt(interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Interrupt constructors carry value and optional id.
    #[test]
    fn interrupt_constructors() {
        let i = Interrupt::new(serde_json::json!({"op": "write"}));
        assert!(i.id.is_none());
        let i = Interrupt::with_id(serde_json::json!(1), "site-1".to_string());
        assert_eq!(i.id.as_deref(), Some("site-1"));
    }

    /// **Scenario**: GraphInterrupt wraps the interrupt and displays it.
    #[test]
    fn graph_interrupt_wraps_value() {
        let gi = GraphInterrupt::from(Interrupt::new(serde_json::json!({"channel": "X"})));
        assert_eq!(gi.0.value["channel"], "X");
        assert!(gi.to_string().contains("interrupted"));
    }
}
