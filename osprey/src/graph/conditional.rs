//! Conditional edges: route to the next node based on state.
//!
//! After a source node runs, the routing function is called with the merged
//! state; its return value is the next node id, or a key into an optional
//! path map.

use std::collections::HashMap;
use std::sync::Arc;

/// Routing function: `(state) -> key`. The key is the next node id, or is
/// looked up in the router's path map when one is provided.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Conditional router for one source node: path function plus optional map.
pub struct ConditionalRouter<S> {
    pub path: ConditionalRouterFn<S>,
    pub path_map: Option<HashMap<String, String>>,
}

impl<S> Clone for ConditionalRouter<S> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            path_map: self.path_map.clone(),
        }
    }
}

impl<S> ConditionalRouter<S> {
    pub fn new(path: ConditionalRouterFn<S>, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id from the state: apply `path`, then map the
    /// key through `path_map` when present (missing keys fall through as-is).
    pub fn resolve_next(&self, state: &S) -> String {
        let key = (self.path)(state);
        match &self.path_map {
            Some(map) => map.get(&key).cloned().unwrap_or(key),
            None => key,
        }
    }
}

/// How to get the next node after a given node: a fixed edge or a router.
pub enum NextEntry<S> {
    Unconditional(String),
    Conditional(ConditionalRouter<S>),
}

impl<S> Clone for NextEntry<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Unconditional(id) => Self::Unconditional(id.clone()),
            Self::Conditional(router) => Self::Conditional(router.clone()),
        }
    }
}
