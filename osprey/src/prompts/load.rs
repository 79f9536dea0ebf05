//! Load prompt packs from a directory of YAML files and apply env overrides.

use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;

use super::{
    AgentPrompts, ClassificationPromptsFile, OrchestrationPromptsFile, ResponsePromptsFile,
    TaskExtractionPromptsFile,
};

/// Embedded default YAML (canonical source: `osprey/prompts/*.yaml`).
macro_rules! embed_prompt_yaml {
    ($name:literal) => {
        include_str!(concat!("../../prompts/", $name))
    };
}
const EMBED_TASK_EXTRACTION: &str = embed_prompt_yaml!("task_extraction.yaml");
const EMBED_CLASSIFICATION: &str = embed_prompt_yaml!("classification.yaml");
const EMBED_ORCHESTRATION: &str = embed_prompt_yaml!("orchestration.yaml");
const EMBED_RESPONSE: &str = embed_prompt_yaml!("response.yaml");

/// Error when loading prompts from a directory (missing dir, invalid YAML).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read prompts file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
}

const TASK_EXTRACTION_FILE: &str = "task_extraction.yaml";
const CLASSIFICATION_FILE: &str = "classification.yaml";
const ORCHESTRATION_FILE: &str = "orchestration.yaml";
const RESPONSE_FILE: &str = "response.yaml";

/// Default directory name when `PROMPTS_DIR` is not set.
const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// Fully-resolved embedded defaults, parsed once.
static EMBEDDED: Lazy<AgentPrompts> = Lazy::new(|| AgentPrompts {
    task_extraction: serde_yaml::from_str(EMBED_TASK_EXTRACTION).unwrap_or_default(),
    classification: serde_yaml::from_str(EMBED_CLASSIFICATION).unwrap_or_default(),
    orchestration: serde_yaml::from_str(EMBED_ORCHESTRATION).unwrap_or_default(),
    response: serde_yaml::from_str(EMBED_RESPONSE).unwrap_or_default(),
});

/// The parsed embedded defaults (used by AgentPrompts accessors as fallback).
pub(super) fn embedded() -> &'static AgentPrompts {
    &EMBEDDED
}

/// Returns the directory to load prompts from: `dir` if `Some`, else
/// `PROMPTS_DIR` env, else `./prompts`.
fn prompts_dir(dir: Option<&Path>) -> std::path::PathBuf {
    dir.map(std::path::PathBuf::from).unwrap_or_else(|| {
        std::env::var("PROMPTS_DIR")
            .ok()
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|| std::path::PathBuf::from(DEFAULT_PROMPTS_DIR))
    })
}

/// Tries to read and parse a YAML file into `T`. Missing file returns `None`.
fn read_yaml_file<T>(dir: &Path, name: &str) -> Result<Option<T>, LoadError>
where
    T: for<'de> Deserialize<'de>,
{
    let path = dir.join(name);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Ok(None);
            }
            return Err(LoadError::ReadFile {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };
    let value: T = serde_yaml::from_str(&content).map_err(|e| LoadError::ParseYaml {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(value))
}

/// Applies env overrides: `OSPREY_TASK_EXTRACTION_PROMPT` and
/// `OSPREY_ORCHESTRATION_PROMPT` override the respective system prompts.
fn apply_env(mut prompts: AgentPrompts) -> AgentPrompts {
    if let Ok(s) = std::env::var("OSPREY_TASK_EXTRACTION_PROMPT") {
        prompts.task_extraction.system_prompt = Some(s);
    }
    if let Ok(s) = std::env::var("OSPREY_ORCHESTRATION_PROMPT") {
        prompts.orchestration.system_prompt = Some(s);
    }
    prompts
}

/// Loads prompts from a directory, applying env overrides. Missing files keep
/// the embedded defaults (fields stay `None` and accessors fall back). Only
/// errors when the directory itself is missing or a present file fails to
/// parse.
pub fn load(dir: Option<&Path>) -> Result<AgentPrompts, LoadError> {
    let base = prompts_dir(dir);
    if !base.exists() || !base.is_dir() {
        return Err(LoadError::DirNotFound(base.display().to_string()));
    }

    let task_extraction =
        read_yaml_file::<TaskExtractionPromptsFile>(&base, TASK_EXTRACTION_FILE)?
            .unwrap_or_default();
    let classification =
        read_yaml_file::<ClassificationPromptsFile>(&base, CLASSIFICATION_FILE)?
            .unwrap_or_default();
    let orchestration =
        read_yaml_file::<OrchestrationPromptsFile>(&base, ORCHESTRATION_FILE)?
            .unwrap_or_default();
    let response =
        read_yaml_file::<ResponsePromptsFile>(&base, RESPONSE_FILE)?.unwrap_or_default();

    Ok(apply_env(AgentPrompts {
        task_extraction,
        classification,
        orchestration,
        response,
    }))
}

/// Returns the default pack parsed from the embedded YAML.
pub fn default_from_embedded() -> AgentPrompts {
    apply_env(EMBEDDED.clone())
}

/// Loads prompts from `dir` if it exists; otherwise the embedded defaults.
pub fn load_or_default(dir: Option<&Path>) -> AgentPrompts {
    load(dir).unwrap_or_else(|_| default_from_embedded())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Missing directory errors from load() but load_or_default falls back.
    #[test]
    fn missing_dir_falls_back() {
        let missing = Path::new("/nonexistent/prompts/dir");
        assert!(matches!(
            load(Some(missing)),
            Err(LoadError::DirNotFound(_))
        ));
        let prompts = load_or_default(Some(missing));
        assert!(!prompts.orchestration_prompt().is_empty());
    }

    /// **Scenario**: A project file overrides one prompt; others keep defaults.
    #[test]
    fn project_file_overrides_one_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("classification.yaml"),
            "system_prompt: project-specific classification\n",
        )
        .unwrap();
        let prompts = load(Some(dir.path())).unwrap();
        assert_eq!(
            prompts.classification_prompt(),
            "project-specific classification"
        );
        assert!(prompts
            .orchestration_prompt()
            .contains("ordered list of steps"));
    }

    /// **Scenario**: Invalid YAML in a present file is a parse error.
    #[test]
    fn invalid_yaml_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("response.yaml"), "::: not yaml {{{\n").unwrap();
        assert!(matches!(
            load(Some(dir.path())),
            Err(LoadError::ParseYaml { .. })
        ));
    }
}
