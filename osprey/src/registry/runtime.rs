//! Runtime registry: lookup by name with lazy construction and caching.
//!
//! Built once from framework defaults plus the application's registry
//! provider. Instantiation is cached on first lookup; lookups thereafter are
//! read-only, so the registry is safe to share across conversations.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::capability::Capability;
use crate::config::ModelConfig;
use crate::llm::LlmProvider;
use crate::prompts::PromptProvider;
use crate::services::{CodeExecutor, ConnectorKind, ControlSystemConnector, DataSource};

use super::entries::{
    ComponentKind, ContextClassRegistration, RegistryConfig, RegistryMode, RegistryProvider,
};
use super::merge;

/// Structured registry failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry not initialized")]
    NotInitialized,
    #[error("component not found: {kind} '{name}'")]
    ComponentNotFound { kind: ComponentKind, name: String },
    #[error("duplicate registration: {kind} '{name}'")]
    DuplicateRegistration { kind: ComponentKind, name: String },
    #[error("invalid registration: {kind} '{name}': {message}")]
    InvalidRegistration {
        kind: ComponentKind,
        name: String,
        message: String,
    },
    #[error("conflicting extension: {kind} '{name}' is both excluded and overridden")]
    ConflictingExtension { kind: ComponentKind, name: String },
}

/// The merged, validated component catalog with instance caches.
pub struct Registry {
    config: RegistryConfig,
    capabilities: DashMap<String, Arc<dyn Capability>>,
    /// Keyed by `provider:model_id` (one instance per bound model).
    providers: DashMap<String, Arc<dyn LlmProvider>>,
    connectors: DashMap<String, Arc<dyn ControlSystemConnector>>,
    data_sources: DashMap<String, Arc<dyn DataSource>>,
    code_generators: DashMap<String, Arc<dyn CodeExecutor>>,
    prompt_providers: DashMap<String, Arc<dyn PromptProvider>>,
}

fn check_unique<T>(
    kind: ComponentKind,
    entries: &[T],
    name_of: impl Fn(&T) -> &str,
) -> Result<(), RegistryError> {
    let mut seen = BTreeSet::new();
    for entry in entries {
        if !seen.insert(name_of(entry).to_string()) {
            return Err(RegistryError::DuplicateRegistration {
                kind,
                name: name_of(entry).to_string(),
            });
        }
    }
    Ok(())
}

impl Registry {
    /// Builds a registry from a merged/standalone config, validating name
    /// uniqueness per kind.
    pub fn from_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        check_unique(ComponentKind::Capability, &config.capabilities, |e| &e.name)?;
        check_unique(ComponentKind::ContextClass, &config.context_classes, |e| {
            &e.type_name
        })?;
        check_unique(ComponentKind::DataSource, &config.data_sources, |e| &e.name)?;
        check_unique(ComponentKind::Provider, &config.providers, |e| &e.name)?;
        check_unique(ComponentKind::Connector, &config.connectors, |e| &e.name)?;
        check_unique(ComponentKind::CodeGenerator, &config.code_generators, |e| {
            &e.name
        })?;
        check_unique(ComponentKind::PromptProvider, &config.prompt_providers, |e| {
            &e.key
        })?;
        Ok(Self {
            config,
            capabilities: DashMap::new(),
            providers: DashMap::new(),
            connectors: DashMap::new(),
            data_sources: DashMap::new(),
            code_generators: DashMap::new(),
            prompt_providers: DashMap::new(),
        })
    }

    /// Resolves the application provider against framework defaults.
    pub fn from_provider(
        defaults: RegistryConfig,
        provider: &dyn RegistryProvider,
    ) -> Result<Self, RegistryError> {
        let config = match provider.registry() {
            RegistryMode::Extend(extension) => merge::merge(defaults, &extension)?,
            RegistryMode::Standalone(config) => config,
        };
        Self::from_config(config)
    }

    /// Capability names in declaration order.
    pub fn capability_names(&self) -> Vec<String> {
        self.config
            .capabilities
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Capability description by name (no instantiation).
    pub fn capability_description(&self, name: &str) -> Option<&str> {
        self.config
            .capabilities
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.description.as_str())
    }

    /// Instantiates (or returns the cached) capability by name.
    pub fn capability(&self, name: &str) -> Result<Arc<dyn Capability>, RegistryError> {
        if let Some(hit) = self.capabilities.get(name) {
            return Ok(hit.clone());
        }
        let registration = self
            .config
            .capabilities
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                kind: ComponentKind::Capability,
                name: name.to_string(),
            })?;
        let built = (registration.builder)()?;
        if built.name() != registration.name {
            return Err(RegistryError::InvalidRegistration {
                kind: ComponentKind::Capability,
                name: name.to_string(),
                message: format!(
                    "builder produced capability named '{}'",
                    built.name()
                ),
            });
        }
        self.capabilities.insert(name.to_string(), built.clone());
        Ok(built)
    }

    /// All capabilities, instantiated, in declaration order.
    pub fn capabilities(&self) -> Result<Vec<Arc<dyn Capability>>, RegistryError> {
        self.capability_names()
            .iter()
            .map(|name| self.capability(name))
            .collect()
    }

    /// True when a context type name is declared.
    pub fn has_context_type(&self, type_name: &str) -> bool {
        self.config
            .context_classes
            .iter()
            .any(|c| c.type_name == type_name)
    }

    /// Declared context classes, in order.
    pub fn context_classes(&self) -> &[ContextClassRegistration] {
        &self.config.context_classes
    }

    /// Instantiates (or returns the cached) provider bound to a model config.
    pub fn provider(
        &self,
        model_config: &ModelConfig,
    ) -> Result<Arc<dyn LlmProvider>, RegistryError> {
        let cache_key = format!("{}:{}", model_config.provider, model_config.model_id);
        if let Some(hit) = self.providers.get(&cache_key) {
            return Ok(hit.clone());
        }
        let registration = self
            .config
            .providers
            .iter()
            .find(|p| p.name == model_config.provider)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                kind: ComponentKind::Provider,
                name: model_config.provider.clone(),
            })?;
        let built = (registration.builder)(model_config)?;
        self.providers.insert(cache_key, built.clone());
        Ok(built)
    }

    /// Instantiates (or returns the cached) connector by name.
    pub fn connector(
        &self,
        name: &str,
    ) -> Result<Arc<dyn ControlSystemConnector>, RegistryError> {
        if let Some(hit) = self.connectors.get(name) {
            return Ok(hit.clone());
        }
        let registration = self
            .config
            .connectors
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                kind: ComponentKind::Connector,
                name: name.to_string(),
            })?;
        let built = (registration.builder)()?;
        self.connectors.insert(name.to_string(), built.clone());
        Ok(built)
    }

    /// First declared connector of the given kind.
    pub fn connector_of_kind(
        &self,
        kind: ConnectorKind,
    ) -> Result<Arc<dyn ControlSystemConnector>, RegistryError> {
        let name = self
            .config
            .connectors
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .ok_or_else(|| RegistryError::ComponentNotFound {
                kind: ComponentKind::Connector,
                name: format!("<any {:?}>", kind),
            })?;
        self.connector(&name)
    }

    /// All data sources, instantiated, in declaration order.
    pub fn data_sources(&self) -> Result<Vec<Arc<dyn DataSource>>, RegistryError> {
        self.config
            .data_sources
            .iter()
            .map(|registration| {
                if let Some(hit) = self.data_sources.get(&registration.name) {
                    return Ok(hit.clone());
                }
                let built = (registration.builder)()?;
                self.data_sources
                    .insert(registration.name.clone(), built.clone());
                Ok(built)
            })
            .collect()
    }

    /// Instantiates (or returns the cached) code generator by name.
    pub fn code_generator(&self, name: &str) -> Result<Arc<dyn CodeExecutor>, RegistryError> {
        if let Some(hit) = self.code_generators.get(name) {
            return Ok(hit.clone());
        }
        let registration = self
            .config
            .code_generators
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                kind: ComponentKind::CodeGenerator,
                name: name.to_string(),
            })?;
        let built = (registration.builder)()?;
        self.code_generators.insert(name.to_string(), built.clone());
        Ok(built)
    }

    /// Instantiates (or returns the cached) prompt provider by key.
    pub fn prompt_provider(&self, key: &str) -> Result<Arc<dyn PromptProvider>, RegistryError> {
        if let Some(hit) = self.prompt_providers.get(key) {
            return Ok(hit.clone());
        }
        let registration = self
            .config
            .prompt_providers
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                kind: ComponentKind::PromptProvider,
                name: key.to_string(),
            })?;
        let built = (registration.builder)()?;
        self.prompt_providers.insert(key.to_string(), built.clone());
        Ok(built)
    }
}

/// Process-wide registry slot. Initialize once from config before the first
/// graph invocation; tests reset it between cases. Never cached across
/// different configurations.
static GLOBAL: Lazy<std::sync::RwLock<Option<Arc<Registry>>>> =
    Lazy::new(|| std::sync::RwLock::new(None));

/// Installs the process-wide registry.
pub fn set_global(registry: Registry) {
    *GLOBAL.write().expect("registry lock poisoned") = Some(Arc::new(registry));
}

/// The process-wide registry, or `NotInitialized` before `set_global`.
pub fn global() -> Result<Arc<Registry>, RegistryError> {
    GLOBAL
        .read()
        .expect("registry lock poisoned")
        .clone()
        .ok_or(RegistryError::NotInitialized)
}

/// Clears the process-wide registry (tests only, between configurations).
pub fn reset_global() {
    *GLOBAL.write().expect("registry lock poisoned") = None;
}
