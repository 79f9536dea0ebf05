//! Error node: turn the error record into a graceful user-facing message.
//!
//! Never leaks internal traces. Budget exhaustion states explicitly that the
//! request could not be mapped to the agent's capabilities. Clears
//! `state.error` after producing the message.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AgentError, ErrorKind, ErrorRecord};
use crate::graph::{Next, Node};
use crate::llm::{CompletionRequest, ModelRole, ModelSelector};
use crate::message::Message;
use crate::prompts::AgentPrompts;
use crate::state::AgentState;

use super::node_ids;

pub struct ErrorNode {
    llm: ModelSelector,
    prompts: Arc<AgentPrompts>,
}

impl ErrorNode {
    pub fn new(llm: ModelSelector, prompts: Arc<AgentPrompts>) -> Self {
        Self { llm, prompts }
    }

    /// User-safe one-line account of what happened, with a retry hint.
    fn describe(record: &ErrorRecord) -> String {
        match record.kind {
            ErrorKind::BudgetExhausted => {
                "The request could not be mapped to the agent's capabilities after \
                 several attempts; rephrasing is unlikely to help."
                    .to_string()
            }
            ErrorKind::ClassificationFailure => {
                "None of the agent's capabilities apply to this request.".to_string()
            }
            ErrorKind::LlmFailure | ErrorKind::Timeout | ErrorKind::StructuredOutputParse => {
                format!(
                    "A transient service failure stopped the request ({}); retrying may help.",
                    record.message
                )
            }
            ErrorKind::CapabilityExecutionFailure => match &record.failing_capability {
                Some(capability) => format!(
                    "The '{}' step failed: {}",
                    capability, record.message
                ),
                None => format!("A step failed: {}", record.message),
            },
            ErrorKind::ReclassificationRequired | ErrorKind::InvalidContextKey => format!(
                "The agent could not assemble a working plan: {}",
                record.message
            ),
            ErrorKind::Configuration => {
                "The agent is misconfigured; contact the operator.".to_string()
            }
        }
    }
}

#[async_trait]
impl Node<AgentState> for ErrorNode {
    fn id(&self) -> &str {
        node_ids::ERROR
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let mut update = state.update_base();

        let description = state
            .error
            .as_ref()
            .map(Self::describe)
            .unwrap_or_else(|| "An unknown error stopped the request.".to_string());
        tracing::warn!(error = %description, "error node entered");

        let prompt = self
            .prompts
            .error_template()
            .replace("{error}", &description);
        let request = CompletionRequest::new(
            ModelRole::Error,
            vec![
                Message::system(prompt),
                Message::user(state.input_output.query.clone()),
            ],
        );

        // The error explanation must always land, so a provider failure falls
        // back to the deterministic description.
        let text = match self.llm.complete(request).await {
            Ok(response) if !response.text.is_empty() => response.text,
            _ => description,
        };

        update.input_output.final_response = Some(text.clone());
        update.input_output.messages.push(Message::assistant(text));
        update.error = None;
        Ok((update, Next::End))
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

    /// **Scenario**: Budget exhaustion names the capability-mapping failure and
    /// clears the error record.
    #[tokio::test]
    async fn budget_exhaustion_message() {
        let node = ErrorNode::new(
            ModelSelector::new(Arc::new(FailingProvider::new())),
            prompts_arc(),
        );
        let mut state = AgentState::for_query("q");
        state.error = Some(ErrorRecord::new(ErrorKind::BudgetExhausted, "exhausted"));
        let (update, next) = node.run(state).await.unwrap();
        assert_eq!(next, Next::End);
        assert!(update.error.is_none(), "error node clears the record");
        let text = update.input_output.final_response.unwrap();
        assert!(text.contains("could not be mapped to the agent's capabilities"));
    }

    /// **Scenario**: The description never contains a debug representation.
    #[tokio::test]
    async fn no_internal_traces_leak() {
        let node = ErrorNode::new(
            ModelSelector::new(Arc::new(MockProvider::new().with_text(
                ModelRole::Error,
                "Something went wrong talking to the archiver; please retry.",
            ))),
            prompts_arc(),
        );
        let mut state = AgentState::for_query("q");
        state.error = Some(
            ErrorRecord::new(ErrorKind::CapabilityExecutionFailure, "archiver refused")
                .with_capability("archiver_data")
                .with_metadata("stack", serde_json::json!("secret backtrace")),
        );
        let (update, _) = node.run(state).await.unwrap();
        let text = update.input_output.final_response.unwrap();
        assert!(!text.contains("backtrace"));
    }
}
