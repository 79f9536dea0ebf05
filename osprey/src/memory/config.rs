//! Invoke config: thread_id, checkpoint_id, checkpoint_ns, resume node.
//!
//! Identifies the checkpoint stream for one graph run. When using a
//! checkpointer, invoke must provide at least `thread_id`.

/// Config for a single invoke. Identifies the thread and optional checkpoint.
///
/// **Interaction**: passed to `CompiledStateGraph::invoke(state, config)` and
/// to `Checkpointer::put` / `get_tuple` / `list`.
#[derive(Debug, Clone, Default)]
pub struct RunnableConfig {
    /// Unique id for this conversation/thread. Required when using a checkpointer.
    pub thread_id: Option<String>,
    /// If set, load state from this checkpoint instead of the latest.
    pub checkpoint_id: Option<String>,
    /// Optional namespace for checkpoints (e.g. a subgraph). Default is empty.
    pub checkpoint_ns: String,
    /// When set, the graph starts from this node instead of the first.
    /// Used when resuming after an approval interrupt: load checkpoint state,
    /// write the resume payload into the approval slot, set this to the
    /// capability step node.
    pub resume_from_node_id: Option<String>,
}

impl RunnableConfig {
    /// Convenience constructor for the common case of a plain thread run.
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Default::default()
        }
    }
}
