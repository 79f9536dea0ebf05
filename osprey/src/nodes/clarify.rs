//! Clarify node: ask the user one focused question.
//!
//! Triggered when a capability stores a `CLARIFICATION_NEEDED` context. The
//! current plan is truncated; stored contexts are preserved so the next turn
//! can continue from them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::capabilities::CLARIFICATION_NEEDED;
use crate::error::{AgentError, ErrorRecord};
use crate::graph::{Next, Node};
use crate::llm::{CompletionRequest, ModelRole, ModelSelector};
use crate::message::Message;
use crate::prompts::AgentPrompts;
use crate::state::AgentState;

use super::node_ids;

pub struct ClarifyNode {
    llm: ModelSelector,
    prompts: Arc<AgentPrompts>,
}

impl ClarifyNode {
    pub fn new(llm: ModelSelector, prompts: Arc<AgentPrompts>) -> Self {
        Self { llm, prompts }
    }

    /// The first stored clarification question, if any.
    fn pending_question(state: &AgentState) -> Option<String> {
        state
            .context
            .list_summaries()
            .into_iter()
            .find(|s| s.context_type == CLARIFICATION_NEEDED)
            .and_then(|s| {
                state
                    .context
                    .get(&s.context_type, &s.key)
                    .and_then(|c| c.value["question"].as_str().map(str::to_string))
            })
    }
}

#[async_trait]
impl Node<AgentState> for ClarifyNode {
    fn id(&self) -> &str {
        node_ids::CLARIFY
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let mut update = state.update_base();

        let question = Self::pending_question(&state)
            .unwrap_or_else(|| "Could you restate what you need?".to_string());

        // Truncate the plan; stored contexts stay for the next turn.
        update.planning.execution_plan.clear();
        update.planning.current_step_index = 0;

        let prompt = self
            .prompts
            .clarify_template()
            .replace("{question}", &question);
        let request = CompletionRequest::new(
            ModelRole::Clarify,
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
                let retry_count = super::prior_retry_count(&state, node_ids::CLARIFY) + 1;
                update.error = Some(
                    ErrorRecord::new(e.kind(), e.to_string())
                        .with_node(node_ids::CLARIFY)
                        .with_retry_count(retry_count),
                );
                Ok((update, Next::Continue))
            }
        }
    }
}
