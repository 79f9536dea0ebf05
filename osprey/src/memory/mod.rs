//! Checkpointing: persist and restore agent state across node boundaries.
//!
//! A [`Checkpointer`] saves snapshots keyed by `(thread_id, checkpoint_ns)`;
//! [`MemorySaver`] is the in-memory baseline and a persistent backend is a
//! drop-in replacement behind the same trait. A crash between checkpoints
//! loses at most one node's work.

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;

pub use checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::RunnableConfig;
pub use memory_saver::MemorySaver;
