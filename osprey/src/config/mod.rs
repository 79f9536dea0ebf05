//! Project configuration: one hierarchical YAML mapping drives everything.
//!
//! Recognized keys: `project_name`, `registry_path`, `models.<role>`,
//! `agent_control.limits.*`, `agent_control.bypass.*`, `approval.*`,
//! `development.api_calls.*`. Environment references use `${VAR}` and
//! `${VAR:-default}`; expansion happens at load time, after the `config`
//! crate has layered `.env` / XDG values into the process environment.

mod expand;

pub use expand::expand_env;

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::approval::{ApprovalMode, ApprovalPolicy};
use crate::llm::ModelRole;
use crate::state::ExecutionLimits;

/// Errors from loading or parsing the project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {message}")]
    Read { path: String, message: String },
    #[error("parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One per-role model selection: provider name + model id.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model_id: String,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// `agent_control.bypass.*` section.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BypassConfig {
    #[serde(default)]
    pub task_extraction: bool,
    #[serde(default)]
    pub classification: bool,
}

/// `agent_control.*` section.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AgentControlConfig {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub bypass: BypassConfig,
}

/// `agent_control.limits.*` section. Missing fields take the framework
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LimitsConfig {
    pub max_execution_retries: Option<u32>,
    pub max_reclassifications: Option<u32>,
    pub max_concurrent_classifications: Option<usize>,
    pub max_generation_retries: Option<u32>,
}

impl LimitsConfig {
    /// Resolved limits with defaults applied.
    pub fn resolve(&self) -> ExecutionLimits {
        let defaults = ExecutionLimits::default();
        ExecutionLimits {
            max_execution_retries: self
                .max_execution_retries
                .unwrap_or(defaults.max_execution_retries),
            max_reclassifications: self
                .max_reclassifications
                .unwrap_or(defaults.max_reclassifications),
            max_concurrent_classifications: self
                .max_concurrent_classifications
                .unwrap_or(defaults.max_concurrent_classifications),
            max_generation_retries: self
                .max_generation_retries
                .unwrap_or(defaults.max_generation_retries),
        }
    }
}

/// `approval.capabilities.<cap>` entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CapabilityApprovalConfig {
    pub mode: ApprovalMode,
}

/// `approval.*` section.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ApprovalConfig {
    #[serde(default)]
    pub global_mode: ApprovalMode,
    #[serde(default)]
    pub capabilities: BTreeMap<String, CapabilityApprovalConfig>,
}

impl ApprovalConfig {
    /// Builds the runtime approval policy.
    pub fn policy(&self) -> ApprovalPolicy {
        let mut policy = ApprovalPolicy::new(self.global_mode);
        for (name, cap) in &self.capabilities {
            policy = policy.with_capability_mode(name.clone(), cap.mode);
        }
        policy
    }
}

/// `development.api_calls.*` section: LLM call transcript logging flags.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ApiCallLogging {
    #[serde(default)]
    pub log_prompts: bool,
    #[serde(default)]
    pub log_responses: bool,
}

/// `development.*` section.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DevelopmentConfig {
    #[serde(default)]
    pub api_calls: ApiCallLogging,
}

/// The whole project configuration.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project_name: String,
    /// Path to the application registry provider declaration.
    #[serde(default)]
    pub registry_path: Option<String>,
    /// Per-role model selections keyed by role name.
    #[serde(default)]
    pub models: BTreeMap<ModelRole, ModelConfig>,
    #[serde(default)]
    pub agent_control: AgentControlConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub development: DevelopmentConfig,
}

impl ProjectConfig {
    /// Parses a YAML string, expanding `${VAR}` references first.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env(text);
        Ok(serde_yaml::from_str(&expanded)?)
    }

    /// Loads and parses a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&text)
    }

    /// Loads a project config after layering `.env` and XDG values into the
    /// process environment, so `${VAR}` references resolve consistently.
    ///
    /// Priority for each variable: existing env > project `.env` > XDG
    /// `config.toml`. Env-layering failures are logged and ignored; the
    /// project file itself must parse.
    pub fn load_for_project(path: &Path) -> Result<Self, ConfigError> {
        if let Err(e) = env_config::load_and_apply("osprey", path.parent()) {
            tracing::warn!(error = %e, "env layering failed; continuing with process env");
        }
        Self::load(path)
    }

    /// The model selection for a role, if configured.
    pub fn model_for(&self, role: ModelRole) -> Option<&ModelConfig> {
        self.models.get(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
project_name: als_assistant
registry_path: registry.yaml
models:
  orchestrator:
    provider: openai
    model_id: gpt-4o
  classifier:
    provider: openai
    model_id: gpt-4o-mini
    temperature: 0.0
agent_control:
  limits:
    max_execution_retries: 5
  bypass:
    task_extraction: true
approval:
  global_mode: selective
  capabilities:
    channel_write:
      mode: all
development:
  api_calls:
    log_prompts: true
"#;

    /// **Scenario**: A full YAML config parses into the expected sections.
    #[test]
    fn parse_full_config() {
        let config = ProjectConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.project_name, "als_assistant");
        assert_eq!(
            config.model_for(ModelRole::Orchestrator).unwrap().model_id,
            "gpt-4o"
        );
        assert_eq!(
            config
                .model_for(ModelRole::Classifier)
                .unwrap()
                .temperature,
            Some(0.0)
        );
        assert!(config.agent_control.bypass.task_extraction);
        assert!(!config.agent_control.bypass.classification);
        assert!(config.development.api_calls.log_prompts);
    }

    /// **Scenario**: Limits resolve with configured overrides and defaults elsewhere.
    #[test]
    fn limits_resolve_with_defaults() {
        let config = ProjectConfig::from_yaml(SAMPLE).unwrap();
        let limits = config.agent_control.limits.resolve();
        assert_eq!(limits.max_execution_retries, 5);
        assert_eq!(limits.max_reclassifications, 2);
        assert_eq!(limits.max_concurrent_classifications, 5);
    }

    /// **Scenario**: Approval section builds a policy with per-capability override.
    #[test]
    fn approval_section_builds_policy() {
        let config = ProjectConfig::from_yaml(SAMPLE).unwrap();
        let policy = config.approval.policy();
        assert_eq!(policy.mode_for("channel_write"), ApprovalMode::All);
        assert_eq!(policy.mode_for("channel_read"), ApprovalMode::Selective);
    }

    /// **Scenario**: ${VAR} references expand from the environment at load time.
    #[test]
    fn env_expansion_in_config() {
        std::env::set_var("OSPREY_TEST_PROJECT", "expanded_name");
        let config =
            ProjectConfig::from_yaml("project_name: ${OSPREY_TEST_PROJECT}\n").unwrap();
        assert_eq!(config.project_name, "expanded_name");
        std::env::remove_var("OSPREY_TEST_PROJECT");
    }

    /// **Scenario**: An empty document yields all defaults.
    #[test]
    fn empty_config_defaults() {
        let config = ProjectConfig::from_yaml("{}").unwrap();
        assert!(config.models.is_empty());
        assert_eq!(config.approval.global_mode, ApprovalMode::Selective);
    }

    /// **Scenario**: load_for_project layers a project .env before expansion.
    #[test]
    fn load_for_project_layers_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "OSPREY_TEST_LAYERED_NAME=layered\n",
        )
        .unwrap();
        let config_path = dir.path().join("project.yml");
        std::fs::write(&config_path, "project_name: ${OSPREY_TEST_LAYERED_NAME}\n").unwrap();

        std::env::remove_var("OSPREY_TEST_LAYERED_NAME");
        let config = ProjectConfig::load_for_project(&config_path).unwrap();
        assert_eq!(config.project_name, "layered");
        std::env::remove_var("OSPREY_TEST_LAYERED_NAME");
    }
}
