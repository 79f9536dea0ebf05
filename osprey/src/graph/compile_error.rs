//! Compilation errors for StateGraph::compile.

use thiserror::Error;

/// Errors raised when turning a `StateGraph` into a `CompiledStateGraph`.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// An edge references a node id that was never added.
    #[error("node not found: {0}")]
    NodeNotFound(String),
    /// No edge from START.
    #[error("no edge from START")]
    MissingStart,
    /// No path reaches END.
    #[error("no edge to END")]
    MissingEnd,
    /// A node has both an unconditional edge and conditional edges.
    #[error("node has both edge and conditional edges: {0}")]
    NodeHasBothEdgeAndConditional(String),
    /// A conditional path map target is not a registered node.
    #[error("conditional path map target not found: {0}")]
    InvalidConditionalPathMap(String),
    /// The edges do not form a valid chain (duplicate from, branch from START).
    #[error("invalid chain: {0}")]
    InvalidChain(String),
}
