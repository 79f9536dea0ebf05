//! State updater trait and the replace / field-based implementations.
//!
//! The updater controls how a node's returned state is merged into the
//! current state after each step. `ReplaceUpdater` swaps the whole record;
//! `FieldBasedUpdater` wraps a merge function for per-field reducer logic
//! (append lists, merge maps, replace scalars).

use std::fmt::Debug;
use std::sync::Arc;

/// Customizes how state updates are applied after each node execution.
///
/// **Interaction**: installed via `StateGraph::with_state_updater`; called by
/// `CompiledStateGraph` once per node with the current state and the node's
/// returned update.
pub trait StateUpdater<S>: Send + Sync + Debug
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Merge `update` into `current`.
    fn apply_update(&self, current: &mut S, update: &S);
}

/// Default updater: the node's return value completely replaces the state.
#[derive(Debug, Clone, Default)]
pub struct ReplaceUpdater;

impl<S> StateUpdater<S> for ReplaceUpdater
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn apply_update(&self, current: &mut S, update: &S) {
        *current = update.clone();
    }
}

/// Applies updates through a merge function, so different fields can have
/// different strategies (append, merge, replace).
pub struct FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    updater_fn: F,
    _marker: std::marker::PhantomData<S>,
}

impl<S, F> Debug for FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBasedUpdater")
            .field("updater_fn", &"<function>")
            .finish()
    }
}

impl<S, F> FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    /// Wraps a merge function that defines how updates land in the current state.
    pub fn new(updater_fn: F) -> Self {
        Self {
            updater_fn,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<S, F> StateUpdater<S> for FieldBasedUpdater<S, F>
where
    S: Clone + Send + Sync + Debug + 'static,
    F: Fn(&mut S, &S) + Send + Sync + 'static,
{
    fn apply_update(&self, current: &mut S, update: &S) {
        (self.updater_fn)(current, update);
    }
}

/// Boxed state updater for type erasure.
pub type BoxedStateUpdater<S> = Arc<dyn StateUpdater<S>>;

/// Helper to create a boxed state updater.
pub fn boxed_updater<S, U>(updater: U) -> BoxedStateUpdater<S>
where
    S: Clone + Send + Sync + Debug + 'static,
    U: StateUpdater<S> + 'static,
{
    Arc::new(updater)
}
