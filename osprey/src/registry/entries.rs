//! Registration entry types and the registry configuration.
//!
//! Entries declare *how to build* a component, not the component itself;
//! builders run lazily on first lookup. The Python source's "module path +
//! class name" declaration becomes a builder function here.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::capability::Capability;
use crate::config::ModelConfig;
use crate::llm::LlmProvider;
use crate::prompts::PromptProvider;
use crate::services::{CodeExecutor, ConnectorKind, ControlSystemConnector, DataSource};

use super::runtime::RegistryError;

/// Entry kinds, used in error reporting and exclusion/override tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComponentKind {
    Capability,
    ContextClass,
    DataSource,
    Provider,
    Connector,
    CodeGenerator,
    PromptProvider,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Capability => "capability",
            Self::ContextClass => "context_class",
            Self::DataSource => "data_source",
            Self::Provider => "provider",
            Self::Connector => "connector",
            Self::CodeGenerator => "code_generator",
            Self::PromptProvider => "prompt_provider",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type CapabilityBuilder =
    Arc<dyn Fn() -> Result<Arc<dyn Capability>, RegistryError> + Send + Sync>;
pub type DataSourceBuilder =
    Arc<dyn Fn() -> Result<Arc<dyn DataSource>, RegistryError> + Send + Sync>;
pub type ProviderBuilder =
    Arc<dyn Fn(&ModelConfig) -> Result<Arc<dyn LlmProvider>, RegistryError> + Send + Sync>;
pub type ConnectorBuilder =
    Arc<dyn Fn() -> Result<Arc<dyn ControlSystemConnector>, RegistryError> + Send + Sync>;
pub type CodeGeneratorBuilder =
    Arc<dyn Fn() -> Result<Arc<dyn CodeExecutor>, RegistryError> + Send + Sync>;
pub type PromptProviderBuilder =
    Arc<dyn Fn() -> Result<Arc<dyn PromptProvider>, RegistryError> + Send + Sync>;

/// Declares a capability by name with a lazy builder.
#[derive(Clone)]
pub struct CapabilityRegistration {
    pub name: String,
    pub description: String,
    pub builder: CapabilityBuilder,
}

impl CapabilityRegistration {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        builder: CapabilityBuilder,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            builder,
        }
    }
}

/// Declares a known context type name (used in plan validation).
#[derive(Debug, Clone, PartialEq)]
pub struct ContextClassRegistration {
    pub type_name: String,
    pub description: String,
}

impl ContextClassRegistration {
    pub fn new(type_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: description.into(),
        }
    }
}

/// Declares a data-source provider.
#[derive(Clone)]
pub struct DataSourceRegistration {
    pub name: String,
    pub builder: DataSourceBuilder,
}

/// Declares an LLM provider; the builder binds a concrete model selection.
#[derive(Clone)]
pub struct ProviderRegistration {
    pub name: String,
    pub builder: ProviderBuilder,
}

/// Declares a control-system or archiver connector.
#[derive(Clone)]
pub struct ConnectorRegistration {
    pub name: String,
    pub kind: ConnectorKind,
    pub builder: ConnectorBuilder,
}

/// Declares a code generator / executor.
#[derive(Clone)]
pub struct CodeGeneratorRegistration {
    pub name: String,
    pub builder: CodeGeneratorBuilder,
}

/// Declares a prompt provider, keyed like the source keyed module paths.
#[derive(Clone)]
pub struct PromptProviderRegistration {
    pub key: String,
    pub builder: PromptProviderBuilder,
}

/// All component declarations of one party (framework or application).
#[derive(Clone, Default)]
pub struct RegistryConfig {
    pub capabilities: Vec<CapabilityRegistration>,
    pub context_classes: Vec<ContextClassRegistration>,
    pub data_sources: Vec<DataSourceRegistration>,
    pub providers: Vec<ProviderRegistration>,
    pub connectors: Vec<ConnectorRegistration>,
    pub code_generators: Vec<CodeGeneratorRegistration>,
    pub prompt_providers: Vec<PromptProviderRegistration>,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capability(mut self, registration: CapabilityRegistration) -> Self {
        self.capabilities.push(registration);
        self
    }

    pub fn with_context_class(mut self, registration: ContextClassRegistration) -> Self {
        self.context_classes.push(registration);
        self
    }

    pub fn with_data_source(mut self, registration: DataSourceRegistration) -> Self {
        self.data_sources.push(registration);
        self
    }

    pub fn with_provider(mut self, registration: ProviderRegistration) -> Self {
        self.providers.push(registration);
        self
    }

    pub fn with_connector(mut self, registration: ConnectorRegistration) -> Self {
        self.connectors.push(registration);
        self
    }

    pub fn with_code_generator(mut self, registration: CodeGeneratorRegistration) -> Self {
        self.code_generators.push(registration);
        self
    }

    pub fn with_prompt_provider(mut self, registration: PromptProviderRegistration) -> Self {
        self.prompt_providers.push(registration);
        self
    }
}

/// Application extension over the framework defaults: extra entries plus
/// per-kind exclusion and override name sets.
#[derive(Clone, Default)]
pub struct RegistryExtension {
    pub config: RegistryConfig,
    pub exclusions: BTreeMap<ComponentKind, BTreeSet<String>>,
    pub overrides: BTreeMap<ComponentKind, BTreeSet<String>>,
}

impl RegistryExtension {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            exclusions: BTreeMap::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Removes the named framework component of `kind`.
    pub fn exclude(mut self, kind: ComponentKind, name: impl Into<String>) -> Self {
        self.exclusions.entry(kind).or_default().insert(name.into());
        self
    }

    /// Marks a same-named application entry as an intentional replacement.
    pub fn override_entry(mut self, kind: ComponentKind, name: impl Into<String>) -> Self {
        self.overrides.entry(kind).or_default().insert(name.into());
        self
    }
}

/// How an application's registry provider runs: extend the framework
/// defaults, or supply the complete set.
pub enum RegistryMode {
    Extend(RegistryExtension),
    Standalone(RegistryConfig),
}

/// The single registry provider an application supplies.
pub trait RegistryProvider: Send + Sync {
    fn registry(&self) -> RegistryMode;
}
