//! Per-role model selection.
//!
//! The `models.*` section of the project configuration names a provider and
//! model id per role; the runtime resolves those through the registry and
//! hands the nodes a `ModelSelector`. The selector also applies the default
//! per-node timeout and the `development.api_calls.*` transcript logging
//! flags.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ApiCallLogging;

use super::{CompletionRequest, CompletionResponse, LlmProvider, ModelRole, ProviderError};

/// Maps each [`ModelRole`] to a bound provider, with a default fallback.
///
/// Providers may be shared between roles (the same `Arc` can appear under
/// several roles).
#[derive(Clone)]
pub struct ModelSelector {
    by_role: BTreeMap<ModelRole, Arc<dyn LlmProvider>>,
    default: Arc<dyn LlmProvider>,
    /// Applied to requests that carry no timeout of their own.
    default_timeout: Option<Duration>,
    logging: ApiCallLogging,
}

impl ModelSelector {
    /// Creates a selector where every role uses `default` until overridden.
    pub fn new(default: Arc<dyn LlmProvider>) -> Self {
        Self {
            by_role: BTreeMap::new(),
            default,
            default_timeout: None,
            logging: ApiCallLogging::default(),
        }
    }

    /// Binds a provider to one role.
    pub fn with_role(mut self, role: ModelRole, provider: Arc<dyn LlmProvider>) -> Self {
        self.by_role.insert(role, provider);
        self
    }

    /// Default per-node timeout for requests that set none.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// LLM call transcript logging flags (`development.api_calls.*`).
    pub fn with_api_call_logging(mut self, logging: ApiCallLogging) -> Self {
        self.logging = logging;
        self
    }

    /// The provider bound to `role`, or the default.
    pub fn for_role(&self, role: ModelRole) -> &Arc<dyn LlmProvider> {
        self.by_role.get(&role).unwrap_or(&self.default)
    }

    /// Executes a completion against the provider for the request's role.
    pub async fn complete(
        &self,
        mut request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        if request.timeout.is_none() {
            request.timeout = self.default_timeout;
        }
        if self.logging.log_prompts {
            for message in &request.messages {
                tracing::debug!(
                    role = %request.role.as_str(),
                    message_role = message.role(),
                    content = message.content(),
                    "llm prompt"
                );
            }
        }
        let response = self
            .for_role(request.role)
            .execute_completion(request.clone())
            .await?;
        if self.logging.log_responses {
            tracing::debug!(
                role = %request.role.as_str(),
                text = %response.text,
                "llm response"
            );
        }
        Ok(response)
    }
}
