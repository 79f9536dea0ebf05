//! Checkpoint and metadata types.
//!
//! A checkpoint is one state snapshot plus id/timestamp/metadata, stored by a
//! [`crate::memory::Checkpointer`] keyed by `(thread_id, checkpoint_ns)`.

use std::time::SystemTime;

/// Where a checkpoint came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckpointSource {
    /// Created from the input of a run (before the first node).
    #[default]
    Input,
    /// Created at a node boundary inside the run loop.
    Loop,
    /// Created from a manual state update (e.g. writing a resume payload).
    Update,
}

/// Metadata for a single checkpoint (source, step, created_at).
#[derive(Debug, Clone, Default)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    /// Step number: -1 for input, 0 for the first node boundary, and so on.
    pub step: i64,
    pub created_at: Option<SystemTime>,
}

/// One checkpoint: state snapshot + id + timestamp + metadata.
///
/// **Interaction**: produced by graph execution at every node boundary;
/// consumed by `Checkpointer::put`, returned by `get_tuple`.
#[derive(Debug, Clone)]
pub struct Checkpoint<S> {
    /// Unique checkpoint id (UUID v4).
    pub id: String,
    /// Milliseconds since epoch as a string.
    pub ts: String,
    /// The agent state at the time of the checkpoint.
    pub state: S,
    pub metadata: CheckpointMetadata,
}

/// Item returned by `Checkpointer::list` for history inspection.
#[derive(Debug, Clone)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub metadata: CheckpointMetadata,
}

impl<S> Checkpoint<S> {
    /// Creates a checkpoint from the current state.
    pub fn from_state(state: S, source: CheckpointSource, step: i64) -> Self {
        let now = SystemTime::now();
        let ts = now
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis().to_string())
            .unwrap_or_else(|_| "0".to_string());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ts,
            state,
            metadata: CheckpointMetadata {
                source,
                step,
                created_at: Some(now),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: from_state stamps a unique id and the given source/step.
    #[test]
    fn checkpoint_from_state_unique_ids() {
        let a: Checkpoint<i32> = Checkpoint::from_state(1, CheckpointSource::Input, -1);
        let b: Checkpoint<i32> = Checkpoint::from_state(2, CheckpointSource::Loop, 0);
        assert_ne!(a.id, b.id);
        assert_eq!(a.metadata.step, -1);
        assert_eq!(b.metadata.source, CheckpointSource::Loop);
        assert!(a.metadata.created_at.is_some());
    }
}
