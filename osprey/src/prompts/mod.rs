//! Agent prompt packs: embedded YAML defaults with per-project overrides.
//!
//! **Canonical source**: default prompt text lives in `osprey/prompts/*.yaml`,
//! embedded at compile time. A project can override any file by placing YAML
//! under `PROMPTS_DIR` (or `./prompts`), and single prompts via env vars
//! (e.g. `OSPREY_ORCHESTRATION_PROMPT`). An application can also register a
//! [`PromptProvider`] to supply prompts programmatically.

mod load;

pub use load::{default_from_embedded, load, load_or_default, LoadError};

/// Supplies the full prompt pack programmatically (registered component).
pub trait PromptProvider: Send + Sync {
    fn prompts(&self) -> AgentPrompts;
}

/// `task_extraction.yaml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct TaskExtractionPromptsFile {
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// `classification.yaml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct ClassificationPromptsFile {
    pub system_prompt: Option<String>,
}

/// `orchestration.yaml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct OrchestrationPromptsFile {
    pub system_prompt: Option<String>,
}

/// `response.yaml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct ResponsePromptsFile {
    pub terminal_template: Option<String>,
    pub web_template: Option<String>,
    pub clarify_template: Option<String>,
    pub error_template: Option<String>,
}

/// The resolved prompt pack handed to the nodes.
///
/// Accessors fall back to the embedded defaults when a file omitted a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentPrompts {
    pub task_extraction: TaskExtractionPromptsFile,
    pub classification: ClassificationPromptsFile,
    pub orchestration: OrchestrationPromptsFile,
    pub response: ResponsePromptsFile,
}

macro_rules! accessor {
    ($fn_name:ident, $section:ident . $field:ident) => {
        pub fn $fn_name(&self) -> &str {
            self.$section
                .$field
                .as_deref()
                .unwrap_or_else(|| load::embedded().$section.$field.as_deref().unwrap_or(""))
        }
    };
}

impl AgentPrompts {
    accessor!(task_extraction_prompt, task_extraction.system_prompt);
    accessor!(classification_prompt, classification.system_prompt);
    accessor!(orchestration_prompt, orchestration.system_prompt);
    accessor!(response_terminal_template, response.terminal_template);
    accessor!(response_web_template, response.web_template);
    accessor!(clarify_template, response.clarify_template);
    accessor!(error_template, response.error_template);

    /// Task-extraction examples: file-provided, else embedded defaults.
    pub fn task_extraction_examples(&self) -> Vec<String> {
        if self.task_extraction.examples.is_empty() {
            load::embedded().task_extraction.examples.clone()
        } else {
            self.task_extraction.examples.clone()
        }
    }
}
