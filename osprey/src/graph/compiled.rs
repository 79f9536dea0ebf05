//! Compiled state graph: immutable, supports invoke and stream.
//!
//! Built by `StateGraph::compile` or `compile_with_checkpointer`. State is
//! checkpointed at every node boundary when a checkpointer and
//! `config.thread_id` are present; an interrupt checkpoints and halts so the
//! run can be resumed with `config.resume_from_node_id`.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::channels::BoxedStateUpdater;
use crate::error::AgentError;
use crate::memory::{Checkpoint, CheckpointSource, Checkpointer, RunnableConfig};
use crate::stream::{CheckpointEvent, StreamEvent, StreamMode};

use super::state_graph::END;
use super::{Next, NextEntry, Node};

/// Internal per-run streaming context.
struct RunCtx<S> {
    tx: Option<mpsc::Sender<StreamEvent<S>>>,
    modes: HashSet<StreamMode>,
}

impl<S> RunCtx<S> {
    fn silent() -> Self {
        Self {
            tx: None,
            modes: HashSet::new(),
        }
    }

    fn wants(&self, mode: StreamMode) -> bool {
        self.modes.contains(&mode) || self.modes.contains(&StreamMode::Debug)
    }

    async fn emit(&self, event: StreamEvent<S>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }
}

/// Compiled graph: immutable structure, supports invoke and stream.
///
/// Created by `StateGraph::compile()` or `compile_with_checkpointer()`. Runs
/// from the first node (or `config.resume_from_node_id`); after each node the
/// returned `Next` or the node's conditional router chooses what runs next.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// First node to run (from START).
    pub(super) first_node_id: String,
    /// Map from node id to how to get the next node.
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    /// Controls how node outputs are merged into state.
    pub(super) state_updater: BoxedStateUpdater<S>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn save_checkpoint(
        &self,
        state: &S,
        config: &RunnableConfig,
        source: CheckpointSource,
        step: i64,
        ctx: &RunCtx<S>,
    ) {
        let (Some(cp), Some(_)) = (&self.checkpointer, &config.thread_id) else {
            return;
        };
        let checkpoint = Checkpoint::from_state(state.clone(), source, step);
        if let Err(e) = cp.put(config, &checkpoint).await {
            tracing::warn!(error = %e, "checkpoint save failed");
            return;
        }
        if ctx.wants(StreamMode::Checkpoints) {
            let checkpoint_ns = if config.checkpoint_ns.is_empty() {
                None
            } else {
                Some(config.checkpoint_ns.clone())
            };
            ctx.emit(StreamEvent::Checkpoint(CheckpointEvent {
                checkpoint_id: checkpoint.id.clone(),
                timestamp: checkpoint.ts.clone(),
                step,
                state: state.clone(),
                thread_id: config.thread_id.clone(),
                checkpoint_ns,
            }))
            .await;
        }
    }

    /// Shared run loop used by invoke() and stream(): steps through nodes
    /// until END, checkpointing at every node boundary.
    async fn run_loop(
        &self,
        state: &mut S,
        config: &RunnableConfig,
        mut current_id: String,
        ctx: &RunCtx<S>,
    ) -> Result<(), AgentError> {
        tracing::debug!("graph run start");
        let mut step: i64 = 0;

        loop {
            let node = self
                .nodes
                .get(&current_id)
                .expect("compiled graph has all nodes")
                .clone();
            tracing::debug!(node = %current_id, "node start");

            if ctx.wants(StreamMode::Tasks) {
                ctx.emit(StreamEvent::TaskStart {
                    node_id: current_id.clone(),
                })
                .await;
            }

            let result = node.run(state.clone()).await;

            let (update, next) = match result {
                Ok(output) => output,
                Err(AgentError::Interrupted(interrupt)) => {
                    // Checkpoint before suspending so the run can be resumed.
                    self.save_checkpoint(state, config, CheckpointSource::Update, step, ctx)
                        .await;
                    if ctx.wants(StreamMode::Tasks) {
                        ctx.emit(StreamEvent::TaskEnd {
                            node_id: current_id.clone(),
                            result: Err(format!("interrupted: {:?}", interrupt.0.value)),
                        })
                        .await;
                    }
                    tracing::info!(node = %current_id, "graph suspended on interrupt");
                    return Err(AgentError::Interrupted(interrupt));
                }
                Err(e) => {
                    if ctx.wants(StreamMode::Tasks) {
                        ctx.emit(StreamEvent::TaskEnd {
                            node_id: current_id.clone(),
                            result: Err(e.to_string()),
                        })
                        .await;
                    }
                    tracing::error!(node = %current_id, error = %e, "graph run failed");
                    return Err(e);
                }
            };

            if ctx.wants(StreamMode::Tasks) {
                ctx.emit(StreamEvent::TaskEnd {
                    node_id: current_id.clone(),
                    result: Ok(()),
                })
                .await;
            }

            self.state_updater.apply_update(state, &update);
            tracing::debug!(node = %current_id, "state update applied");

            if ctx.modes.contains(&StreamMode::Values) {
                ctx.emit(StreamEvent::Values(state.clone())).await;
            }
            if ctx.modes.contains(&StreamMode::Updates) {
                ctx.emit(StreamEvent::Updates {
                    node_id: current_id.clone(),
                    state: state.clone(),
                })
                .await;
            }

            // One checkpoint per node boundary.
            self.save_checkpoint(state, config, CheckpointSource::Loop, step, ctx)
                .await;
            step += 1;

            let next_id: Option<String> = match next {
                Next::End => None,
                Next::Node(id) => Some(id),
                Next::Continue => match self.next_map.get(&current_id) {
                    Some(NextEntry::Unconditional(id)) => Some(id.clone()),
                    Some(NextEntry::Conditional(router)) => {
                        let target = router.resolve_next(state);
                        tracing::debug!(from = %current_id, to = %target, "conditional routing");
                        Some(target)
                    }
                    None => None,
                },
            };

            match next_id {
                None => {
                    tracing::debug!("graph run complete");
                    return Ok(());
                }
                Some(id) if id == END => {
                    tracing::debug!("graph run complete");
                    return Ok(());
                }
                Some(id) => current_id = id,
            }
        }
    }

    fn entry_node(&self, config: &RunnableConfig) -> String {
        config
            .resume_from_node_id
            .as_ref()
            .filter(|id| self.nodes.contains_key(id.as_str()))
            .cloned()
            .unwrap_or_else(|| self.first_node_id.clone())
    }

    /// Runs the graph with the given state.
    ///
    /// Starts at the first node (or `config.resume_from_node_id` when set,
    /// e.g. when resuming after an approval interrupt). When `config` has a
    /// `thread_id` and the graph was compiled with a checkpointer, state is
    /// saved at every node boundary.
    pub async fn invoke(&self, state: S, config: Option<RunnableConfig>) -> Result<S, AgentError> {
        if self.nodes.is_empty() || !self.nodes.contains_key(&self.first_node_id) {
            return Err(AgentError::ExecutionFailed("empty graph".into()));
        }
        let config = config.unwrap_or_default();
        let mut state = state;
        let entry = self.entry_node(&config);
        self.run_loop(&mut state, &config, entry, &RunCtx::silent())
            .await?;
        Ok(state)
    }

    /// Streams graph execution, emitting events via a channel-backed stream.
    pub fn stream(
        &self,
        state: S,
        config: Option<RunnableConfig>,
        stream_mode: impl Into<HashSet<StreamMode>>,
    ) -> ReceiverStream<StreamEvent<S>> {
        let (tx, rx) = mpsc::channel(128);
        let graph = self.clone();
        let modes: HashSet<StreamMode> = stream_mode.into();

        tokio::spawn(async move {
            if graph.nodes.is_empty() || !graph.nodes.contains_key(&graph.first_node_id) {
                return;
            }
            let config = config.unwrap_or_default();
            let mut state = state;
            let entry = graph.entry_node(&config);
            let ctx = RunCtx {
                tx: Some(tx),
                modes,
            };
            let _ = graph.run_loop(&mut state, &config, entry, &ctx).await;
        });

        ReceiverStream::new(rx)
    }
}
