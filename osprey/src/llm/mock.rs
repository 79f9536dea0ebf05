//! Mock providers for tests and examples.
//!
//! `MockProvider` returns scripted responses per role (a queue each, falling
//! back to a default). `FailingProvider` fails every call and counts them;
//! bypass tests inject it to prove a node issued no LLM call.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmProvider, ModelRole, ProviderError};

/// One scripted answer: plain text or a structured JSON payload.
#[derive(Debug, Clone)]
pub enum Scripted {
    Text(String),
    Structured(serde_json::Value),
}

/// Scripted mock provider.
///
/// Responses are queued per role with [`MockProvider::push`]; each call pops
/// the front of its role's queue, falling back to the default response. A
/// structured request served by a `Text` script is a parse failure, matching
/// how a real provider surfaces malformed structured output.
pub struct MockProvider {
    scripts: Mutex<BTreeMap<ModelRole, Vec<Scripted>>>,
    default_text: String,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(BTreeMap::new()),
            default_text: "ok".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Sets the fallback text returned when a role's queue is empty.
    pub fn with_default_text(mut self, text: impl Into<String>) -> Self {
        self.default_text = text.into();
        self
    }

    /// Queues a scripted response for a role (FIFO).
    pub fn push(&self, role: ModelRole, response: Scripted) {
        self.scripts.lock().unwrap().entry(role).or_default().push(response);
    }

    /// Builder variant of [`push`](Self::push).
    pub fn with_script(self, role: ModelRole, response: Scripted) -> Self {
        self.push(role, response);
        self
    }

    /// Queues a structured JSON response for a role.
    pub fn with_structured(self, role: ModelRole, value: serde_json::Value) -> Self {
        self.with_script(role, Scripted::Structured(value))
    }

    /// Queues a plain-text response for a role.
    pub fn with_text(self, role: ModelRole, text: impl Into<String>) -> Self {
        self.with_script(role, Scripted::Text(text.into()))
    }

    /// Number of completions served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = {
            let mut scripts = self.scripts.lock().unwrap();
            scripts.get_mut(&request.role).and_then(|queue| {
                if queue.is_empty() {
                    None
                } else {
                    Some(queue.remove(0))
                }
            })
        };
        match (scripted, request.schema.is_some()) {
            (Some(Scripted::Structured(value)), _) => Ok(CompletionResponse {
                text: value.to_string(),
                structured: Some(value),
                usage: None,
            }),
            (Some(Scripted::Text(text)), true) => {
                // A structured request answered with free text is a parse failure.
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(value) => Ok(CompletionResponse {
                        text,
                        structured: Some(value),
                        usage: None,
                    }),
                    Err(e) => Err(ProviderError::Parse(e.to_string())),
                }
            }
            (Some(Scripted::Text(text)), false) => Ok(CompletionResponse {
                text,
                structured: None,
                usage: None,
            }),
            (None, true) => Err(ProviderError::Parse(format!(
                "no scripted structured response for role {}",
                request.role.as_str()
            ))),
            (None, false) => Ok(CompletionResponse {
                text: self.default_text.clone(),
                structured: None,
                usage: None,
            }),
        }
    }
}

/// Provider that fails every call and records how many were attempted.
///
/// Bypass tests inject this to prove a node took the deterministic path.
pub struct FailingProvider {
    calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for FailingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn execute_completion(
        &self,
        _request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Api(
            "FailingProvider received a completion call".into(),
        ))
    }

    async fn check_health(&self) -> Result<(), ProviderError> {
        Err(ProviderError::Unhealthy("always failing".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::StructuredSchema;
    use crate::message::Message;

    fn request(role: ModelRole) -> CompletionRequest {
        CompletionRequest::new(role, vec![Message::user("hi")])
    }

    /// **Scenario**: Scripted responses pop in FIFO order per role; other roles fall back.
    #[tokio::test]
    async fn scripted_responses_fifo_per_role() {
        let mock = MockProvider::new()
            .with_text(ModelRole::Response, "first")
            .with_text(ModelRole::Response, "second");
        let r1 = mock.execute_completion(request(ModelRole::Response)).await.unwrap();
        let r2 = mock.execute_completion(request(ModelRole::Response)).await.unwrap();
        let r3 = mock.execute_completion(request(ModelRole::Clarify)).await.unwrap();
        assert_eq!(r1.text, "first");
        assert_eq!(r2.text, "second");
        assert_eq!(r3.text, "ok");
        assert_eq!(mock.call_count(), 3);
    }

    /// **Scenario**: A structured request with no script is a parse error, not a default answer.
    #[tokio::test]
    async fn structured_request_without_script_is_parse_error() {
        let mock = MockProvider::new();
        let req = request(ModelRole::Classifier).with_schema(StructuredSchema {
            name: "relevance".into(),
            schema: serde_json::json!({"type": "object"}),
        });
        assert!(matches!(
            mock.execute_completion(req).await,
            Err(ProviderError::Parse(_))
        ));
    }

    /// **Scenario**: Structured script is returned as parsed JSON.
    #[tokio::test]
    async fn structured_script_returned_parsed() {
        let mock = MockProvider::new()
            .with_structured(ModelRole::Classifier, serde_json::json!({"is_relevant": true}));
        let req = request(ModelRole::Classifier).with_schema(StructuredSchema {
            name: "relevance".into(),
            schema: serde_json::json!({"type": "object"}),
        });
        let resp = mock.execute_completion(req).await.unwrap();
        assert_eq!(resp.structured.unwrap()["is_relevant"], true);
    }

    /// **Scenario**: FailingProvider errors on every call and counts them.
    #[tokio::test]
    async fn failing_provider_counts_calls() {
        let failing = FailingProvider::new();
        assert!(failing.execute_completion(request(ModelRole::Response)).await.is_err());
        assert!(failing.execute_completion(request(ModelRole::Response)).await.is_err());
        assert_eq!(failing.call_count(), 2);
        assert!(failing.check_health().await.is_err());
    }
}
