//! OpenAI Chat Completions provider (OpenAiProvider).
//!
//! Uses the OpenAI Chat Completions API. Requires `OPENAI_API_KEY` (or an
//! explicit config, e.g. for a compatible gateway). Structured output is
//! requested by appending a strict-JSON instruction carrying the schema and
//! parsing the returned content; a non-JSON reply surfaces as a retriable
//! parse error.

use async_trait::async_trait;
use tracing::{debug, trace};

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
    },
    Client,
};

use crate::message::Message;

use super::{CompletionRequest, CompletionResponse, LlmProvider, LlmUsage, ProviderError};

/// OpenAI Chat Completions provider.
///
/// API key comes from `OPENAI_API_KEY` by default; use
/// [`OpenAiProvider::with_config`] for a custom key or base URL.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiProvider {
    /// Build with default config (API key from `OPENAI_API_KEY` env).
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            temperature: None,
        }
    }

    /// Build with custom config (e.g. custom API key or base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature: None,
        }
    }

    /// Set temperature (0–2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Convert messages to OpenAI request messages (system/user/assistant text).
    fn messages_to_request(messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System(s) => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(s.as_str()),
                ),
                Message::User(s) => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(s.as_str()),
                ),
                Message::Assistant(s) => {
                    ChatCompletionRequestMessage::Assistant((s.as_str()).into())
                }
            })
            .collect()
    }

    /// Strips a Markdown code fence when the model wraps its JSON in one.
    fn strip_code_fence(text: &str) -> &str {
        let trimmed = text.trim();
        let Some(rest) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        rest.trim_start_matches('\n')
            .strip_suffix("```")
            .map(str::trim)
            .unwrap_or(trimmed)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn execute_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut messages = request.messages.clone();
        if let Some(schema) = &request.schema {
            messages.push(Message::system(format!(
                "Respond with a single JSON value conforming to this JSON Schema \
                 (no prose, no code fences):\n{}",
                schema.schema
            )));
        }

        let openai_messages = Self::messages_to_request(&messages);
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(openai_messages);
        if let Some(t) = self.temperature {
            args.temperature(t);
        }
        let api_request = args
            .build()
            .map_err(|e| ProviderError::Build(e.to_string()))?;

        debug!(
            model = %self.model,
            role = %request.role.as_str(),
            message_count = messages.len(),
            structured = request.schema.is_some(),
            "openai chat create"
        );

        let chat = self.client.chat();
        let call = chat.create(api_request);
        let response = match request.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ProviderError::Timeout(limit))?,
            None => call.await,
        }
        .map_err(|e| ProviderError::Api(e.to_string()))?;

        trace!(model = %self.model, "openai response received");

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Api("no choices in response".into()))?;
        let text = choice.message.content.unwrap_or_default();

        let structured = match &request.schema {
            Some(_) => {
                let payload = Self::strip_code_fence(&text);
                let value: serde_json::Value = serde_json::from_str(payload)
                    .map_err(|e| ProviderError::Parse(e.to_string()))?;
                Some(value)
            }
            None => None,
        };

        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            text,
            structured,
            usage,
        })
    }

    async fn check_health(&self) -> Result<(), ProviderError> {
        // A minimal request; any API error means unhealthy.
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(&[Message::user("ping")]));
        let request = args
            .build()
            .map_err(|e| ProviderError::Build(e.to_string()))?;
        self.client
            .chat()
            .create(request)
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Unhealthy(e.to_string()))
    }
}
