//! Graph node trait: one step in a StateGraph.
//!
//! Receives state `S`, returns an updated `S` (a partial update merged by the
//! graph's state updater) and `Next` (continue, jump, or end).

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AgentError;

use super::Next;

/// One step in a graph: state in, (state out, next step).
///
/// The returned state is merged into the current state by the graph's
/// configured `StateUpdater`, so a node only needs to populate the fields it
/// changes. The runner uses `Next` to choose the next node (Continue =
/// follow edges, Node(id) = jump, End = stop).
///
/// **Interaction**: see `StateGraph::add_node` and
/// `CompiledStateGraph::invoke`.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"classification"`). Must be unique within a graph.
    fn id(&self) -> &str;

    /// One step: state in, (state out, next step).
    async fn run(&self, state: S) -> Result<(S, Next), AgentError>;
}
