//! LLM provider abstraction for the agent nodes.
//!
//! Every LLM-backed node (task extraction, classification, orchestration,
//! respond, clarify, error) goes through [`LlmProvider`]. Requests carry a
//! [`ModelRole`], a message list, an optional structured-output schema, and a
//! timeout; responses are either plain text or parsed structured output.
//! Implementations: [`MockProvider`] (scripted), [`FailingProvider`] (panics
//! the turn if called; for bypass tests), [`OpenAiProvider`] (real API).

mod mock;
mod openai;
mod selector;

pub use mock::{FailingProvider, MockProvider, Scripted};
pub use openai::OpenAiProvider;
pub use selector::ModelSelector;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ErrorKind;
use crate::message::Message;

/// Which node a completion is issued for. Drives per-role model selection
/// from the `models.*` section of the project configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    Classifier,
    Orchestrator,
    TaskExtraction,
    Response,
    Clarify,
    Error,
    ChannelFinder,
    CodeGenerator,
}

impl ModelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classifier => "classifier",
            Self::Orchestrator => "orchestrator",
            Self::TaskExtraction => "task_extraction",
            Self::Response => "response",
            Self::Clarify => "clarify",
            Self::Error => "error",
            Self::ChannelFinder => "channel_finder",
            Self::CodeGenerator => "code_generator",
        }
    }

    /// All roles, in configuration order.
    pub fn all() -> &'static [ModelRole] {
        &[
            Self::Classifier,
            Self::Orchestrator,
            Self::TaskExtraction,
            Self::Response,
            Self::Clarify,
            Self::Error,
            Self::ChannelFinder,
            Self::CodeGenerator,
        ]
    }
}

impl std::str::FromStr for ModelRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classifier" => Ok(Self::Classifier),
            "orchestrator" => Ok(Self::Orchestrator),
            "task_extraction" => Ok(Self::TaskExtraction),
            "response" => Ok(Self::Response),
            "clarify" => Ok(Self::Clarify),
            "error" => Ok(Self::Error),
            "channel_finder" => Ok(Self::ChannelFinder),
            "code_generator" => Ok(Self::CodeGenerator),
            _ => Err(format!("unknown model role: {}", s)),
        }
    }
}

/// Error from a provider call. Maps onto the router-facing error taxonomy via
/// [`ProviderError::kind`]; all variants are retriable.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider api: {0}")]
    Api(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("structured output parse: {0}")]
    Parse(String),
    #[error("request build: {0}")]
    Build(String),
    #[error("health check failed: {0}")]
    Unhealthy(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Parse(_) => ErrorKind::StructuredOutputParse,
            Self::Api(_) | Self::Build(_) | Self::Unhealthy(_) => ErrorKind::LlmFailure,
        }
    }
}

/// Structured-output schema attached to a completion request.
///
/// Providers must return JSON conforming to `schema` in
/// `CompletionResponse::structured`; a non-conforming payload is a
/// `ProviderError::Parse`.
#[derive(Debug, Clone)]
pub struct StructuredSchema {
    /// Short identifier (e.g. `"planned_steps"`).
    pub name: String,
    /// JSON Schema describing the expected payload.
    pub schema: serde_json::Value,
}

/// One completion request: role, messages, optional schema, timeout.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub role: ModelRole,
    pub messages: Vec<Message>,
    pub schema: Option<StructuredSchema>,
    /// Per-node timeout; expiry produces a retriable `ProviderError::Timeout`.
    pub timeout: Option<Duration>,
}

impl CompletionRequest {
    pub fn new(role: ModelRole, messages: Vec<Message>) -> Self {
        Self {
            role,
            messages,
            schema: None,
            timeout: None,
        }
    }

    pub fn with_schema(mut self, schema: StructuredSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from one completion: text, optional parsed structured output, usage.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Assistant text (may be empty when the call was schema-only).
    pub text: String,
    /// Parsed structured output; `Some` whenever the request carried a schema.
    pub structured: Option<serde_json::Value>,
    pub usage: Option<LlmUsage>,
}

impl CompletionResponse {
    /// The structured payload, or a Parse error when the request expected one.
    pub fn require_structured(self) -> Result<serde_json::Value, ProviderError> {
        self.structured
            .ok_or_else(|| ProviderError::Parse("expected structured output, got none".into()))
    }
}

/// LLM provider: executes completions for a role-tagged request.
///
/// Providers may be shared across conversations and are expected to be
/// concurrency-safe.
///
/// **Interaction**: registered as a component (`ProviderRegistration`) and
/// selected per role by [`ModelSelector`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. `"openai"`, `"mock"`).
    fn name(&self) -> &str;

    /// Execute one completion. When `request.schema` is present, the response
    /// must carry parsed structured output.
    async fn execute_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Cheap liveness probe; default implementation reports healthy.
    async fn check_health(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
