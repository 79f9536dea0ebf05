//! Respond node: produce the user-visible answer from accumulated context.
//!
//! Interface-aware: plain text for terminals, markdown with image embedding
//! for web clients. Reads the task objective, stored contexts (truncated for
//! prompt inclusion), and the UI artifact registries; writes the assistant
//! turn into `input_output`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AgentError, ErrorRecord};
use crate::graph::{Next, Node};
use crate::llm::{CompletionRequest, ModelRole, ModelSelector};
use crate::message::Message;
use crate::prompts::AgentPrompts;
use crate::state::{AgentState, InterfaceKind, UiRegistry};

use super::node_ids;

/// Byte budget applied to context values included in the response prompt.
const RESPONSE_CONTEXT_BUDGET: usize = 1024;

pub struct RespondNode {
    llm: ModelSelector,
    prompts: Arc<AgentPrompts>,
}

impl RespondNode {
    pub fn new(llm: ModelSelector, prompts: Arc<AgentPrompts>) -> Self {
        Self { llm, prompts }
    }

    fn contexts_block(state: &AgentState) -> String {
        let truncated = state.context.truncated_for_prompt(RESPONSE_CONTEXT_BUDGET);
        let summaries = truncated.list_summaries();
        if summaries.is_empty() {
            return "(no results)".to_string();
        }
        summaries
            .iter()
            .map(|s| {
                let value = truncated
                    .get(&s.context_type, &s.key)
                    .map(|c| c.value.to_string())
                    .unwrap_or_default();
                format!("- [{}] {}: {} = {}", s.context_type, s.key, s.summary, value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn artifacts_block(ui: &UiRegistry) -> String {
        if ui.is_empty() {
            return "(none)".to_string();
        }
        let mut lines = Vec::new();
        for artifact in ui
            .images
            .iter()
            .chain(&ui.notebooks)
            .chain(&ui.commands)
            .chain(&ui.html)
            .chain(&ui.files)
        {
            lines.push(format!(
                "- {} ({}, from {})",
                artifact.label,
                artifact.kind.as_str(),
                artifact.source_capability
            ));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl Node<AgentState> for RespondNode {
    fn id(&self) -> &str {
        node_ids::RESPOND
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let mut update = state.update_base();

        let template = match state.interface {
            InterfaceKind::Terminal => self.prompts.response_terminal_template(),
            InterfaceKind::Web | InterfaceKind::Http => self.prompts.response_web_template(),
        };
        let task = state.task.task_objective.clone().unwrap_or_default();
        let prompt = template
            .replace("{task}", &task)
            .replace("{contexts}", &Self::contexts_block(&state))
            .replace("{artifacts}", &Self::artifacts_block(&state.ui));

        let request = CompletionRequest::new(
            ModelRole::Response,
            vec![
                Message::system(prompt),
                Message::user(state.input_output.query.clone()),
            ],
        );

        match self.llm.complete(request).await {
            Ok(response) => {
                update.input_output.final_response = Some(response.text.clone());
                update
                    .input_output
                    .messages
                    .push(Message::assistant(response.text));
                update.error = None;
                Ok((update, Next::End))
            }
            Err(e) => {
                let retry_count = super::prior_retry_count(&state, node_ids::RESPOND) + 1;
                update.error = Some(
                    ErrorRecord::new(e.kind(), e.to_string())
                        .with_node(node_ids::RESPOND)
                        .with_retry_count(retry_count),
                );
                Ok((update, Next::Continue))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FailingProvider, MockProvider};
    use crate::prompts;
    use crate::state::{ArtifactKind, UiArtifact};

    fn prompts_arc() -> Arc<AgentPrompts> {
        Arc::new(prompts::default_from_embedded())
    }

    fn state_with_results() -> AgentState {
        let mut state = AgentState::for_query("what is SR:X?");
        state.task.task_objective = Some("Read `SR:X`".into());
        state
            .context
            .store(
                "CHANNEL_VALUES",
                "cv_1",
                serde_json::json!({"channel": "SR:X", "value": 5.0}),
                "SR:X = 5",
                "Read `SR:X`",
                "channel_read",
            )
            .unwrap();
        state.ui.push(UiArtifact::new(
            ArtifactKind::Image,
            "archiver_data",
            "beam current plot",
            serde_json::json!({}),
        ));
        state
    }

    /// **Scenario**: A successful response lands in final_response and the history.
    #[tokio::test]
    async fn response_written_to_state() {
        let mock = Arc::new(
            MockProvider::new().with_text(ModelRole::Response, "SR:X currently reads 5.0."),
        );
        let node = RespondNode::new(ModelSelector::new(mock), prompts_arc());
        let (update, next) = node.run(state_with_results()).await.unwrap();
        assert_eq!(next, Next::End);
        assert_eq!(
            update.input_output.final_response.as_deref(),
            Some("SR:X currently reads 5.0.")
        );
        assert!(matches!(
            update.input_output.messages.last(),
            Some(Message::Assistant(_))
        ));
    }

    /// **Scenario**: Provider failure writes a retriable error and routes onward.
    #[tokio::test]
    async fn provider_failure_is_retriable() {
        let node = RespondNode::new(
            ModelSelector::new(Arc::new(FailingProvider::new())),
            prompts_arc(),
        );
        let (update, next) = node.run(state_with_results()).await.unwrap();
        assert_eq!(next, Next::Continue);
        let error = update.error.unwrap();
        assert_eq!(error.failing_node.as_deref(), Some(node_ids::RESPOND));
        assert_eq!(error.retry_count, 1);
    }

    /// **Scenario**: Context and artifact blocks render one line each.
    #[test]
    fn prompt_blocks_render() {
        let state = state_with_results();
        let contexts = RespondNode::contexts_block(&state);
        assert!(contexts.contains("[CHANNEL_VALUES] cv_1"));
        let artifacts = RespondNode::artifacts_block(&state.ui);
        assert!(artifacts.contains("beam current plot (image, from archiver_data)"));
    }
}
