//! Streaming events for graph runs.
//!
//! `CompiledStateGraph::stream` emits these through a channel-backed stream.
//! Progress messages are advisory to UIs; they are never part of the semantic
//! agent state. The `stream-event` crate defines the external wire shape;
//! [`crate::export`] bridges `StreamEvent<S>` into it.

use std::collections::HashSet;

/// Which event families a stream run emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamMode {
    /// Full state snapshot after every node.
    Values,
    /// Per-node state update (node id + state after merge).
    Updates,
    /// TaskStart / TaskEnd per node.
    Tasks,
    /// Checkpoint events when a checkpoint is written.
    Checkpoints,
    /// Node-authored custom events (status lines, approval notices).
    Custom,
    /// Everything: implies Tasks and Checkpoints.
    Debug,
}

impl From<StreamMode> for HashSet<StreamMode> {
    fn from(mode: StreamMode) -> Self {
        HashSet::from_iter([mode])
    }
}

/// One chunk of streamed assistant output from an LLM call.
#[derive(Debug, Clone)]
pub struct MessageChunk {
    pub content: String,
}

/// Checkpoint notification carried by `StreamEvent::Checkpoint`.
#[derive(Debug, Clone)]
pub struct CheckpointEvent<S> {
    pub checkpoint_id: String,
    pub timestamp: String,
    pub step: i64,
    pub state: S,
    pub thread_id: Option<String>,
    pub checkpoint_ns: Option<String>,
}

/// One event from a streaming graph run.
#[derive(Debug, Clone)]
pub enum StreamEvent<S> {
    /// Full state snapshot after a node (Values mode).
    Values(S),
    /// State after one node was merged (Updates mode).
    Updates { node_id: String, state: S },
    /// A node started (Tasks or Debug mode).
    TaskStart { node_id: String },
    /// A node finished; Err carries the error description (Tasks or Debug mode).
    TaskEnd {
        node_id: String,
        result: Result<(), String>,
    },
    /// A checkpoint was written (Checkpoints or Debug mode).
    Checkpoint(CheckpointEvent<S>),
    /// Node-authored custom event (Custom or Debug mode).
    Custom(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: A single StreamMode converts into a one-element HashSet.
    #[test]
    fn stream_mode_into_hashset() {
        let set: HashSet<StreamMode> = StreamMode::Values.into();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&StreamMode::Values));
    }
}
