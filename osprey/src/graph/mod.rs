//! State graph: nodes + explicit edges, compile and invoke.
//!
//! Build with `add_node` / `add_edge` (using `START` and `END`), attach the
//! router with `add_conditional_edges`, then `compile` or
//! `compile_with_checkpointer` to get a `CompiledStateGraph`. State is
//! checkpointed at every node boundary, so a crash between checkpoints loses
//! at most one node's work.

mod compile_error;
mod compiled;
mod conditional;
mod interrupt;
mod next;
mod node;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use interrupt::{GraphInterrupt, Interrupt};
pub use next::Next;
pub use node::Node;
pub use state_graph::{StateGraph, END, START};
