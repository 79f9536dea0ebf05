//! Component registry: catalog of framework + application components.
//!
//! Registrations declare a name and a builder (lazy construction); lookup by
//! name instantiates on first use and caches the instance. An application
//! supplies one [`RegistryProvider`] running in Extend mode (framework
//! defaults merged with exclusions/overrides) or Standalone mode (complete
//! replacement). The registry is process-wide by default, scoped to one
//! project; tests reset it between cases.

mod entries;
mod merge;
mod runtime;

pub use entries::{
    CapabilityBuilder, CapabilityRegistration, CodeGeneratorBuilder, CodeGeneratorRegistration,
    ComponentKind, ConnectorBuilder, ConnectorRegistration, ContextClassRegistration,
    DataSourceBuilder, DataSourceRegistration, PromptProviderBuilder,
    PromptProviderRegistration, ProviderBuilder, ProviderRegistration, RegistryConfig,
    RegistryExtension, RegistryMode, RegistryProvider,
};
pub use merge::merge;
pub use runtime::{global, reset_global, set_global, Registry, RegistryError};
