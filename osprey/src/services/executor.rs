//! Code-execution interface.
//!
//! The sandbox implementation is an external collaborator; the core only
//! sees this contract. Static-analysis flags carried in the request drive the
//! approval policy for code that writes.

use async_trait::async_trait;

use crate::approval::{InterruptPayload, OperationFeatures};
use crate::capability::CapabilityError;
use crate::state::ContextStore;

/// Request to generate and run Python against the capability-context data.
#[derive(Debug, Clone)]
pub struct PythonExecutionRequest {
    pub user_query: String,
    pub task_objective: String,
    /// Capability-authored prompt fragments steering generation.
    pub capability_prompts: Vec<String>,
    /// What the caller expects back (names/types of results).
    pub expected_results: Vec<String>,
    /// Folder the code may read and write.
    pub execution_folder: std::path::PathBuf,
    /// Contexts visible to the generated code.
    pub context_data: ContextStore,
    /// Static-analysis findings; evaluated by the approval policy.
    pub features: OperationFeatures,
}

/// Outcome of a code run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub code: String,
    pub stdout: String,
    /// Structured results keyed by expected-result name.
    pub results: serde_json::Map<String, serde_json::Value>,
}

/// Generates and executes code, or asks for approval first.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// Either a finished run or an interrupt payload for approval.
    async fn execute(
        &self,
        request: PythonExecutionRequest,
    ) -> Result<Result<ExecutionResult, InterruptPayload>, CapabilityError>;
}
