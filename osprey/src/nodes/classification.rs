//! Classification node: select the capabilities relevant to the task.
//!
//! One structured relevance call per registered capability, run in parallel
//! under a semaphore sized by `max_concurrent_classifications`. Aggregation
//! preserves registry declaration order. Bypass mode activates everything.
//! Entering this node also performs reclassification cleanup: the plan and
//! the error record are cleared.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::{AgentError, ErrorKind, ErrorRecord};
use crate::graph::{Next, Node};
use crate::llm::{CompletionRequest, ModelRole, ModelSelector, ProviderError, StructuredSchema};
use crate::message::Message;
use crate::prompts::AgentPrompts;
use crate::registry::Registry;
use crate::state::{AgentState, PlanningSlice};

use super::node_ids;

#[derive(Debug, serde::Deserialize)]
struct RelevanceOutput {
    is_relevant: bool,
    #[serde(default)]
    rationale: String,
}

pub struct ClassificationNode {
    llm: ModelSelector,
    prompts: Arc<AgentPrompts>,
    registry: Arc<Registry>,
}

impl ClassificationNode {
    pub fn new(llm: ModelSelector, prompts: Arc<AgentPrompts>, registry: Arc<Registry>) -> Self {
        Self {
            llm,
            prompts,
            registry,
        }
    }

    fn schema() -> StructuredSchema {
        StructuredSchema {
            name: "capability_relevance".into(),
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "is_relevant": {"type": "boolean"},
                    "rationale": {"type": "string"}
                },
                "required": ["is_relevant"]
            }),
        }
    }

    async fn classify_one(
        &self,
        capability_name: &str,
        task: &str,
    ) -> Result<RelevanceOutput, ProviderError> {
        let capability = self
            .registry
            .capability(capability_name)
            .map_err(|e| ProviderError::Api(e.to_string()))?;
        let examples = capability
            .classifier_examples()
            .iter()
            .map(|e| {
                format!(
                    "- \"{}\" -> {} ({})",
                    e.query,
                    if e.is_relevant { "relevant" } else { "not relevant" },
                    e.reason
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let examples_block = if examples.is_empty() {
            String::new()
        } else {
            format!("Examples:\n{}\n", examples)
        };

        let prompt = self
            .prompts
            .classification_prompt()
            .replace("{capability}", capability_name)
            .replace("{description}", capability.description())
            .replace("{examples}", &examples_block)
            .replace("{task}", task);

        let request = CompletionRequest::new(
            ModelRole::Classifier,
            vec![Message::system(prompt), Message::user(task.to_string())],
        )
        .with_schema(Self::schema());
        let response = self.llm.complete(request).await?;
        let value = response.require_structured()?;
        serde_json::from_value(value).map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Node<AgentState> for ClassificationNode {
    fn id(&self) -> &str {
        node_ids::CLASSIFICATION
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let mut update = state.update_base();
        // Reclassification cleanup: discard the plan slot, keep the counter.
        update.planning = PlanningSlice {
            reclassification_attempts: state.planning.reclassification_attempts,
            ..Default::default()
        };
        update.error = None;
        update.classification.active_capability_names.clear();
        update.classification.rationale.clear();

        let names = self.registry.capability_names();

        if state.control.classification_bypass {
            update.classification.active_capability_names = names;
            return Ok((update, Next::Continue));
        }

        let task = state.task.task_objective.clone().unwrap_or_default();
        let semaphore = Arc::new(Semaphore::new(
            state.control.limits.max_concurrent_classifications.max(1),
        ));

        tracing::debug!(count = names.len(), "classifying capabilities");
        let futures: Vec<_> = names
            .iter()
            .map(|name| {
                let semaphore = semaphore.clone();
                let task = task.clone();
                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");
                    self.classify_one(name, &task).await
                }
            })
            .collect();
        // join_all keeps results in registry declaration order.
        let results = futures::future::join_all(futures).await;

        for (name, result) in names.iter().zip(results) {
            match result {
                Ok(output) if output.is_relevant => {
                    update
                        .classification
                        .active_capability_names
                        .push(name.clone());
                    update
                        .classification
                        .rationale
                        .insert(name.clone(), output.rationale);
                }
                Ok(output) => {
                    update
                        .classification
                        .rationale
                        .insert(name.clone(), output.rationale);
                }
                Err(e) => {
                    let retry_count =
                        super::prior_retry_count(&state, node_ids::CLASSIFICATION) + 1;
                    update.error = Some(
                        ErrorRecord::new(e.kind(), e.to_string())
                            .with_node(node_ids::CLASSIFICATION)
                            .with_capability(name.clone())
                            .with_retry_count(retry_count),
                    );
                    return Ok((update, Next::Continue));
                }
            }
        }

        if update.classification.active_capability_names.is_empty() {
            update.error = Some(
                ErrorRecord::new(
                    ErrorKind::ClassificationFailure,
                    "no capability is relevant to this request",
                )
                .with_node(node_ids::CLASSIFICATION),
            );
        }
        Ok((update, Next::Continue))
    }
}
