//! State update strategies for graph execution.
//!
//! By default a node's returned state fully replaces the previous state
//! ([`ReplaceUpdater`]). Osprey's agent graph installs a per-field reducer
//! ([`crate::state::AgentStateUpdater`]) built on [`StateUpdater`] so that
//! artifact registries append, the session slice merges, and stored contexts
//! stay write-once.

mod updater;

pub use updater::{boxed_updater, BoxedStateUpdater, FieldBasedUpdater, ReplaceUpdater, StateUpdater};
