//! # Osprey
//!
//! An orchestration framework for agentic assistants over scientific
//! control-system infrastructure, built on a **state-in, state-out** design:
//! one [`AgentState`] record flows through a durable graph of nodes, is
//! checkpointed at every transition, and is mutated only through node return
//! values merged by per-field reducers.
//!
//! ## How a turn runs
//!
//! `Gateway → task extraction → classification → orchestration → router →
//! (capability step | clarify | error) → router → … → respond`. The router
//! is a pure function over state entered after every node; it enforces the
//! retry and reclassification budgets. Capabilities that need a human in the
//! loop return an interrupt; the graph checkpoints and halts, and
//! [`AgentRuntime::resume`] re-enters the same step with the decision.
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`Next`]:
//!   build and run durable state graphs.
//! - [`state`]: [`AgentState`] and its slices, [`ContextStore`],
//!   [`PlannedStep`], [`AgentStateUpdater`].
//! - [`registry`]: component declarations, Extend/Standalone merge,
//!   process-wide lookup with lazy instantiation.
//! - [`nodes`]: the agent nodes and the [`nodes::route_next`] router.
//! - [`capability`]: the [`Capability`] trait and step-local view.
//! - [`capabilities`]: framework-default capabilities (channel read/write,
//!   time range, archiver) and their context types.
//! - [`approval`]: interrupt/resume payloads and policy evaluators.
//! - [`llm`]: [`LlmProvider`], [`ModelSelector`], mock and OpenAI providers.
//! - [`memory`]: [`Checkpointer`], [`MemorySaver`], [`RunnableConfig`].
//! - [`services`]: connector / data-source / code-executor interfaces.
//! - [`config`]: the project configuration file with `${VAR}` expansion.
//! - [`prompts`]: embedded YAML prompt packs with overrides.
//! - [`stream`] / [`export`]: streaming events and the external bridge.
//! - [`runtime`]: [`AgentRuntime`], the gateway, graph assembly, and turn API.

pub mod approval;
pub mod capabilities;
pub mod capability;
pub mod channels;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod nodes;
pub mod prompts;
pub mod registry;
pub mod runtime;
pub mod services;
pub mod state;
pub mod stream;

pub use approval::{ApprovalMode, ApprovalPolicy, InterruptPayload, ResumePayload};
pub use capability::{Capability, CapabilityError, CapabilityOutcome, StepView};
pub use channels::{FieldBasedUpdater, ReplaceUpdater, StateUpdater};
pub use config::{ModelConfig, ProjectConfig};
pub use error::{AgentError, ErrorKind, ErrorRecord, ErrorSeverity};
pub use export::stream_event_to_progress;
pub use graph::{
    CompilationError, CompiledStateGraph, GraphInterrupt, Interrupt, Next, Node, StateGraph,
    END, START,
};
pub use llm::{
    CompletionRequest, CompletionResponse, FailingProvider, LlmProvider, LlmUsage, MockProvider,
    ModelRole, ModelSelector, OpenAiProvider, ProviderError, StructuredSchema,
};
pub use memory::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointMetadata, CheckpointSource,
    Checkpointer, MemorySaver, RunnableConfig,
};
pub use message::Message;
pub use nodes::{route_next, Gateway, GatewayOutcome, SlashCommand};
pub use registry::{
    CapabilityRegistration, ComponentKind, ConnectorRegistration, ContextClassRegistration,
    DataSourceRegistration, PromptProviderRegistration, ProviderRegistration, Registry,
    RegistryConfig, RegistryError, RegistryExtension, RegistryMode, RegistryProvider,
};
pub use runtime::{AgentRuntime, AgentRuntimeBuilder, BuildError, TurnOutcome};
pub use services::{
    CodeExecutor, ConnectorError, ConnectorKind, ControlSystemConnector, DataSource,
    MockConnector, PythonExecutionRequest, TimeSeries,
};
pub use state::{
    AgentState, AgentStateUpdater, Cardinality, ContextError, ContextObject, ContextRequirement,
    ContextStore, ExtractedContexts, ExtractedValue, InterfaceKind, PlannedStep, StoredContext,
    UiArtifact, UiRegistry,
};
pub use stream::{CheckpointEvent, MessageChunk, StreamEvent, StreamMode};

/// When running `cargo test -p osprey`, initializes tracing from `RUST_LOG`
/// so unit tests in `src/**` can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
