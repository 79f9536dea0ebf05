//! Agent runtime: wires the nodes into the graph and drives conversation
//! turns.
//!
//! One `AgentRuntime` hosts many conversations, isolated by thread id. A
//! turn flows gateway → graph invoke; an approval interrupt surfaces as
//! [`TurnOutcome::Suspended`], and external code ends it through
//! [`AgentRuntime::peek_interrupt`] / [`AgentRuntime::resume`]. The entry
//! node of every invocation is chosen by the router over the current state,
//! so resumed turns re-enter the step that suspended.

use std::sync::Arc;

use thiserror::Error;

use crate::approval::{InterruptPayload, ResumePayload};
use crate::config::ProjectConfig;
use crate::error::AgentError;
use crate::graph::{CompiledStateGraph, StateGraph, START};
use crate::llm::{LlmProvider, ModelSelector};
use crate::memory::{Checkpoint, CheckpointSource, Checkpointer, MemorySaver, RunnableConfig};
use crate::nodes::{
    node_ids, route_next, ApprovalPauseNode, CapabilityRunnerNode, ClassificationNode,
    ClarifyNode, ErrorNode, Gateway, GatewayOutcome, OrchestrationNode, RespondNode,
    TaskExtractionNode,
};
use crate::prompts::AgentPrompts;
use crate::registry::{Registry, RegistryError};
use crate::state::{AgentState, AgentStateUpdater, InterfaceKind};

/// Errors from assembling a runtime.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("graph: {0}")]
    Graph(#[from] crate::graph::CompilationError),
    #[error("configuration: {0}")]
    Configuration(String),
}

/// Result of one gateway-driven turn.
pub enum TurnOutcome {
    /// The turn ran to a terminal node; the final state carries the response.
    Completed(AgentState),
    /// The turn suspended for human approval.
    Suspended(InterruptPayload),
    /// The gateway answered locally; no graph invocation happened.
    Local(String),
}

pub struct AgentRuntime {
    graph: CompiledStateGraph<AgentState>,
    checkpointer: Arc<dyn Checkpointer<AgentState>>,
    gateway: Gateway,
}

/// Builder for [`AgentRuntime`].
pub struct AgentRuntimeBuilder {
    registry: Arc<Registry>,
    config: ProjectConfig,
    prompts: Arc<AgentPrompts>,
    checkpointer: Option<Arc<dyn Checkpointer<AgentState>>>,
    default_provider: Option<Arc<dyn LlmProvider>>,
    interface: InterfaceKind,
}

impl AgentRuntimeBuilder {
    pub fn new(registry: Arc<Registry>, config: ProjectConfig) -> Self {
        Self {
            registry,
            config,
            prompts: Arc::new(crate::prompts::default_from_embedded()),
            checkpointer: None,
            default_provider: None,
            interface: InterfaceKind::Terminal,
        }
    }

    pub fn with_prompts(mut self, prompts: AgentPrompts) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer<AgentState>>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Provider used for every role not named in `models.*`.
    pub fn with_default_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.default_provider = Some(provider);
        self
    }

    pub fn with_interface(mut self, interface: InterfaceKind) -> Self {
        self.interface = interface;
        self
    }

    fn model_selector(&self) -> Result<ModelSelector, BuildError> {
        let default = match &self.default_provider {
            Some(provider) => provider.clone(),
            None => {
                // Fall back to the first configured model's provider.
                let (_, model_config) = self.config.models.iter().next().ok_or_else(|| {
                    BuildError::Configuration(
                        "no models configured and no default provider given".into(),
                    )
                })?;
                self.registry.provider(model_config)?
            }
        };
        let mut selector = ModelSelector::new(default)
            .with_default_timeout(std::time::Duration::from_secs(60))
            .with_api_call_logging(self.config.development.api_calls.clone());
        for (role, model_config) in &self.config.models {
            selector = selector.with_role(*role, self.registry.provider(model_config)?);
        }
        Ok(selector)
    }

    pub fn build(self) -> Result<AgentRuntime, BuildError> {
        let llm = self.model_selector()?;
        let checkpointer = self
            .checkpointer
            .clone()
            .unwrap_or_else(|| Arc::new(MemorySaver::new()));
        let data_sources = self.registry.data_sources()?;

        let mut default_control = crate::state::AgentControl {
            limits: self.config.agent_control.limits.resolve(),
            ..Default::default()
        };
        default_control.task_extraction_bypass = self.config.agent_control.bypass.task_extraction;
        default_control.classification_bypass = self.config.agent_control.bypass.classification;

        let gateway = Gateway::new(
            self.registry.capability_names(),
            default_control,
            self.interface,
        );

        let mut graph = StateGraph::<AgentState>::new()
            .with_state_updater(Arc::new(AgentStateUpdater));
        graph.add_node(
            node_ids::TASK_EXTRACTION,
            Arc::new(TaskExtractionNode::new(
                llm.clone(),
                self.prompts.clone(),
                data_sources,
            )),
        );
        graph.add_node(
            node_ids::CLASSIFICATION,
            Arc::new(ClassificationNode::new(
                llm.clone(),
                self.prompts.clone(),
                self.registry.clone(),
            )),
        );
        graph.add_node(
            node_ids::ORCHESTRATION,
            Arc::new(OrchestrationNode::new(
                llm.clone(),
                self.prompts.clone(),
                self.registry.clone(),
            )),
        );
        graph.add_node(
            node_ids::EXECUTE_STEP,
            Arc::new(CapabilityRunnerNode::new(self.registry.clone())),
        );
        graph.add_node(node_ids::APPROVAL_PAUSE, Arc::new(ApprovalPauseNode));
        graph.add_node(
            node_ids::RESPOND,
            Arc::new(RespondNode::new(llm.clone(), self.prompts.clone())),
        );
        graph.add_node(
            node_ids::CLARIFY,
            Arc::new(ClarifyNode::new(llm.clone(), self.prompts.clone())),
        );
        graph.add_node(
            node_ids::ERROR,
            Arc::new(ErrorNode::new(llm, self.prompts.clone())),
        );

        graph.add_edge(START, node_ids::TASK_EXTRACTION);
        // The router is entered after every interior node.
        for node in [
            node_ids::TASK_EXTRACTION,
            node_ids::CLASSIFICATION,
            node_ids::ORCHESTRATION,
            node_ids::EXECUTE_STEP,
            node_ids::RESPOND,
            node_ids::CLARIFY,
            node_ids::ERROR,
        ] {
            graph.add_conditional_edges(node, Arc::new(route_next), None);
        }

        let graph = graph.compile_with_checkpointer(checkpointer.clone())?;
        Ok(AgentRuntime {
            graph,
            checkpointer,
            gateway,
        })
    }
}

impl AgentRuntime {
    pub fn builder(registry: Arc<Registry>, config: ProjectConfig) -> AgentRuntimeBuilder {
        AgentRuntimeBuilder::new(registry, config)
    }

    /// The compiled graph (for streaming or direct invocation).
    pub fn graph(&self) -> &CompiledStateGraph<AgentState> {
        &self.graph
    }

    async fn latest_state(&self, thread_id: &str) -> Result<Option<AgentState>, AgentError> {
        let config = RunnableConfig::for_thread(thread_id);
        let tuple = self
            .checkpointer
            .get_tuple(&config)
            .await
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
        Ok(tuple.map(|(checkpoint, _)| checkpoint.state))
    }

    async fn save_state(&self, thread_id: &str, state: &AgentState) -> Result<(), AgentError> {
        let config = RunnableConfig::for_thread(thread_id);
        self.checkpointer
            .put(
                &config,
                &Checkpoint::from_state(state.clone(), CheckpointSource::Update, -1),
            )
            .await
            .map(|_| ())
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))
    }

    async fn invoke_routed(
        &self,
        thread_id: &str,
        state: AgentState,
    ) -> Result<TurnOutcome, AgentError> {
        // Direct-chat mode skips the pipeline and answers conversationally.
        let entry = if state.session.direct_chat && state.approval.is_none() {
            node_ids::RESPOND.to_string()
        } else {
            route_next(&state)
        };
        let config = RunnableConfig {
            resume_from_node_id: Some(entry),
            ..RunnableConfig::for_thread(thread_id)
        };
        match self.graph.invoke(state, Some(config)).await {
            Ok(state) => Ok(TurnOutcome::Completed(state)),
            Err(AgentError::Interrupted(interrupt)) => {
                let payload: InterruptPayload =
                    serde_json::from_value(interrupt.0.value.clone()).map_err(|e| {
                        AgentError::ExecutionFailed(format!("malformed interrupt payload: {}", e))
                    })?;
                Ok(TurnOutcome::Suspended(payload))
            }
            Err(e) => Err(e),
        }
    }

    /// Runs one conversation turn for `thread_id`.
    pub async fn run_turn(
        &self,
        thread_id: &str,
        input: &str,
    ) -> Result<TurnOutcome, AgentError> {
        let prior = self.latest_state(thread_id).await?;
        match self.gateway.handle(input, prior.as_ref()) {
            GatewayOutcome::Local(text) => Ok(TurnOutcome::Local(text)),
            GatewayOutcome::StateMutation(state) => {
                self.save_state(thread_id, &state).await?;
                Ok(TurnOutcome::Completed(state))
            }
            GatewayOutcome::Dispatch(state) => self.invoke_routed(thread_id, state).await,
        }
    }

    /// The pending interrupt payload for a thread, if one is suspended.
    pub async fn peek_interrupt(
        &self,
        thread_id: &str,
    ) -> Result<Option<InterruptPayload>, AgentError> {
        Ok(self.latest_state(thread_id).await?.and_then(|state| {
            state
                .approval
                .filter(|slot| slot.resume.is_none())
                .map(|slot| slot.interrupt)
        }))
    }

    /// Ends a suspension: writes the resume payload and re-enters the graph.
    ///
    /// Resuming a thread with no pending interrupt is a no-op returning the
    /// stored state, so applying the same resume payload twice has no
    /// additional effect.
    pub async fn resume(
        &self,
        thread_id: &str,
        payload: ResumePayload,
    ) -> Result<TurnOutcome, AgentError> {
        let mut state = self
            .latest_state(thread_id)
            .await?
            .ok_or_else(|| AgentError::ExecutionFailed("unknown thread".into()))?;
        match &mut state.approval {
            Some(slot) if slot.resume.is_none() => {
                slot.resume = Some(payload);
            }
            _ => return Ok(TurnOutcome::Completed(state)),
        }
        self.save_state(thread_id, &state).await?;
        self.invoke_routed(thread_id, state).await
    }

    /// Cancels a conversation by discarding its checkpoints.
    pub async fn cancel(&self, thread_id: &str) -> Result<(), AgentError> {
        self.checkpointer
            .drop_thread(&RunnableConfig::for_thread(thread_id))
            .await
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApprovalMode, ApprovalPolicy};
    use crate::capabilities::{framework_defaults, FrameworkServices};
    use crate::llm::MockProvider;
    use crate::services::MockConnector;

    fn runtime_with_mock() -> (AgentRuntime, Arc<MockProvider>) {
        let services = FrameworkServices::mock(
            Arc::new(MockConnector::new().with_channel("SR:X", 5.0)),
            ApprovalPolicy::new(ApprovalMode::Disabled),
        );
        let registry =
            Arc::new(Registry::from_config(framework_defaults(&services)).unwrap());
        let mock = Arc::new(MockProvider::new().with_default_text("done"));
        let runtime = AgentRuntime::builder(registry, ProjectConfig::default())
            .with_default_provider(mock.clone())
            .build()
            .unwrap();
        (runtime, mock)
    }

    /// **Scenario**: The builder rejects a config with neither models nor default provider.
    #[test]
    fn builder_requires_a_provider() {
        let services = FrameworkServices::mock(
            Arc::new(MockConnector::new()),
            ApprovalPolicy::default(),
        );
        let registry =
            Arc::new(Registry::from_config(framework_defaults(&services)).unwrap());
        let result = AgentRuntime::builder(registry, ProjectConfig::default()).build();
        assert!(matches!(result, Err(BuildError::Configuration(_))));
    }

    /// **Scenario**: A local command never touches the graph or checkpointer.
    #[tokio::test]
    async fn local_command_stays_local() {
        let (runtime, mock) = runtime_with_mock();
        match runtime.run_turn("t1", "/help").await.unwrap() {
            TurnOutcome::Local(text) => assert!(text.contains("/mode")),
            _ => panic!("expected local outcome"),
        }
        assert_eq!(mock.call_count(), 0);
        assert!(runtime.latest_state("t1").await.unwrap().is_none());
    }

    /// **Scenario**: A state mutation persists for the next turn.
    #[tokio::test]
    async fn mutation_persists_session() {
        let (runtime, _) = runtime_with_mock();
        match runtime.run_turn("t1", "/pref:units=mA").await.unwrap() {
            TurnOutcome::Completed(state) => {
                assert_eq!(state.session.preferences.get("units").unwrap(), "mA")
            }
            _ => panic!("expected completed mutation"),
        }
        let stored = runtime.latest_state("t1").await.unwrap().unwrap();
        assert_eq!(stored.session.preferences.get("units").unwrap(), "mA");
    }

    /// **Scenario**: peek_interrupt on a fresh thread is None; resume is a no-op
    /// error for unknown threads.
    #[tokio::test]
    async fn interrupt_api_edge_cases() {
        let (runtime, _) = runtime_with_mock();
        assert!(runtime.peek_interrupt("fresh").await.unwrap().is_none());
        assert!(runtime
            .resume("fresh", crate::approval::ResumePayload::approved())
            .await
            .is_err());
    }
}
