//! Task extraction node: distill the conversation into one task objective.
//!
//! Bypass mode skips the LLM entirely and formats the chat history plus any
//! data-source context deterministically. Otherwise the node assembles a
//! prompt from the default examples, optional data-source output, and the
//! history, and calls the task-extraction model with a structured-output
//! schema `{task, depends_on_chat_history}`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AgentError, ErrorRecord};
use crate::graph::{Next, Node};
use crate::llm::{CompletionRequest, ModelRole, ModelSelector, ProviderError, StructuredSchema};
use crate::message::Message;
use crate::prompts::AgentPrompts;
use crate::services::DataSource;
use crate::state::AgentState;

use super::node_ids;

#[derive(Debug, serde::Deserialize)]
struct TaskExtractionOutput {
    task: String,
    #[serde(default)]
    depends_on_chat_history: bool,
}

pub struct TaskExtractionNode {
    llm: ModelSelector,
    prompts: Arc<AgentPrompts>,
    data_sources: Vec<Arc<dyn DataSource>>,
}

impl TaskExtractionNode {
    pub fn new(
        llm: ModelSelector,
        prompts: Arc<AgentPrompts>,
        data_sources: Vec<Arc<dyn DataSource>>,
    ) -> Self {
        Self {
            llm,
            prompts,
            data_sources,
        }
    }

    fn schema() -> StructuredSchema {
        StructuredSchema {
            name: "extracted_task".into(),
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "task": {"type": "string"},
                    "depends_on_chat_history": {"type": "boolean"}
                },
                "required": ["task", "depends_on_chat_history"]
            }),
        }
    }

    fn render_history(messages: &[Message]) -> String {
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role(), m.content()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn data_source_lines(&self, state: &AgentState) -> Vec<String> {
        let mut lines = Vec::new();
        for source in &self.data_sources {
            lines.extend(source.context_strings(state).await);
        }
        lines
    }

    /// Deterministic substitute for the LLM call (bypass mode).
    fn bypass_objective(history: &str, data_lines: &[String]) -> String {
        if data_lines.is_empty() {
            history.to_string()
        } else {
            format!("{}\n{}", history, data_lines.join("\n"))
        }
    }
}

#[async_trait]
impl Node<AgentState> for TaskExtractionNode {
    fn id(&self) -> &str {
        node_ids::TASK_EXTRACTION
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let mut update = state.update_base();
        let history = Self::render_history(&state.input_output.messages);
        let data_lines = self.data_source_lines(&state).await;

        if state.control.task_extraction_bypass {
            update.task.task_objective = Some(Self::bypass_objective(&history, &data_lines));
            update.task.depends_on_chat_history = state.input_output.messages.len() > 1;
            update.error = None;
            return Ok((update, Next::Continue));
        }

        let mut prompt = self.prompts.task_extraction_prompt().to_string();
        let examples = self.prompts.task_extraction_examples();
        if !examples.is_empty() {
            prompt.push_str("\n\nExamples:\n");
            prompt.push_str(&examples.join("\n"));
        }
        if !data_lines.is_empty() {
            prompt.push_str("\n\nAmbient context:\n");
            prompt.push_str(&data_lines.join("\n"));
        }

        let mut messages = vec![Message::system(prompt)];
        messages.push(Message::user(format!("Conversation:\n{}", history)));

        // Parse failures get a short in-node retry budget before the router
        // sees a retriable error.
        let attempts = state.control.limits.max_generation_retries.max(1);
        let mut last_error: Option<ProviderError> = None;
        for _ in 0..attempts {
            let request = CompletionRequest::new(ModelRole::TaskExtraction, messages.clone())
                .with_schema(Self::schema());
            match self.llm.complete(request).await {
                Ok(response) => match response
                    .require_structured()
                    .and_then(|v| {
                        serde_json::from_value::<TaskExtractionOutput>(v)
                            .map_err(|e| ProviderError::Parse(e.to_string()))
                    }) {
                    Ok(output) => {
                        tracing::debug!(task = %output.task, "task extracted");
                        update.task.task_objective = Some(output.task);
                        update.task.depends_on_chat_history = output.depends_on_chat_history;
                        update.error = None;
                        return Ok((update, Next::Continue));
                    }
                    Err(e @ ProviderError::Parse(_)) => {
                        tracing::warn!(error = %e, "task extraction parse failure, retrying");
                        last_error = Some(e);
                    }
                    Err(e) => {
                        last_error = Some(e);
                        break;
                    }
                },
                Err(e) => {
                    last_error = Some(e);
                    break;
                }
            }
        }

        let provider_error =
            last_error.unwrap_or_else(|| ProviderError::Api("no completion attempted".into()));
        let retry_count = super::prior_retry_count(&state, node_ids::TASK_EXTRACTION) + 1;
        update.error = Some(
            ErrorRecord::new(provider_error.kind(), provider_error.to_string())
                .with_node(node_ids::TASK_EXTRACTION)
                .with_retry_count(retry_count),
        );
        Ok((update, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FailingProvider, MockProvider};
    use crate::prompts;

    fn prompts_arc() -> Arc<AgentPrompts> {
        Arc::new(prompts::default_from_embedded())
    }

    /// **Scenario**: Bypass mode produces a deterministic objective and issues no LLM call.
    #[tokio::test]
    async fn bypass_makes_no_llm_call() {
        let failing = Arc::new(FailingProvider::new());
        let node = TaskExtractionNode::new(
            ModelSelector::new(failing.clone()),
            prompts_arc(),
            Vec::new(),
        );
        let mut state = AgentState::for_query("What is `SR:X`?");
        state.control.task_extraction_bypass = true;

        let (update, _) = node.run(state).await.unwrap();
        assert_eq!(
            update.task.task_objective.as_deref(),
            Some("user: What is `SR:X`?")
        );
        assert_eq!(failing.call_count(), 0, "bypass must not touch the provider");
    }

    /// **Scenario**: Structured output lands in the task slice.
    #[tokio::test]
    async fn llm_path_extracts_task() {
        let mock = Arc::new(MockProvider::new().with_structured(
            ModelRole::TaskExtraction,
            serde_json::json!({"task": "Read `SR:X`", "depends_on_chat_history": false}),
        ));
        let node = TaskExtractionNode::new(ModelSelector::new(mock), prompts_arc(), Vec::new());
        let (update, _) = node.run(AgentState::for_query("what is X?")).await.unwrap();
        assert_eq!(update.task.task_objective.as_deref(), Some("Read `SR:X`"));
        assert!(update.error.is_none());
    }

    /// **Scenario**: A provider failure writes a retriable error with an incremented count.
    #[tokio::test]
    async fn provider_failure_writes_retriable_error() {
        let node = TaskExtractionNode::new(
            ModelSelector::new(Arc::new(FailingProvider::new())),
            prompts_arc(),
            Vec::new(),
        );
        let (update, _) = node.run(AgentState::for_query("q")).await.unwrap();
        let error = update.error.unwrap();
        assert_eq!(error.failing_node.as_deref(), Some(node_ids::TASK_EXTRACTION));
        assert_eq!(error.retry_count, 1);

        // A re-entry after the same failure bumps the count.
        let mut state = AgentState::for_query("q");
        state.error = Some(error);
        let (update, _) = node.run(state).await.unwrap();
        assert_eq!(update.error.unwrap().retry_count, 2);
    }

    /// **Scenario**: Parse failures are retried in-node up to max_generation_retries.
    #[tokio::test]
    async fn parse_failures_retried_in_node() {
        let mock = MockProvider::new()
            .with_text(ModelRole::TaskExtraction, "not json at all {")
            .with_structured(
                ModelRole::TaskExtraction,
                serde_json::json!({"task": "ok", "depends_on_chat_history": false}),
            );
        let node =
            TaskExtractionNode::new(ModelSelector::new(Arc::new(mock)), prompts_arc(), Vec::new());
        let (update, _) = node.run(AgentState::for_query("q")).await.unwrap();
        assert_eq!(update.task.task_objective.as_deref(), Some("ok"));
        assert!(update.error.is_none());
    }
}
