//! Extend-mode merge of an application extension over framework defaults.
//!
//! Order per kind: start from the framework entries, drop excluded names,
//! replace overridden names, then append the remaining application entries.
//! Duplicates inside the application set are a structured error; an
//! application entry shadowing a framework entry without being listed as an
//! override takes effect with a warning. Excluding and overriding the same
//! name is a configuration error. The merge is idempotent.

use std::collections::BTreeSet;

use tracing::warn;

use super::entries::{ComponentKind, RegistryConfig, RegistryExtension};
use super::runtime::RegistryError;

fn merge_kind<T: Clone>(
    kind: ComponentKind,
    defaults: Vec<T>,
    extension: &[T],
    exclusions: &BTreeSet<String>,
    overrides: &BTreeSet<String>,
    name_of: impl Fn(&T) -> &str,
) -> Result<Vec<T>, RegistryError> {
    if let Some(name) = exclusions.intersection(overrides).next() {
        return Err(RegistryError::ConflictingExtension {
            kind,
            name: name.clone(),
        });
    }

    let mut out: Vec<T> = defaults
        .into_iter()
        .filter(|entry| !exclusions.contains(name_of(entry)))
        .collect();

    let mut seen_extension: BTreeSet<String> = BTreeSet::new();
    for entry in extension {
        let name = name_of(entry).to_string();
        if !seen_extension.insert(name.clone()) {
            return Err(RegistryError::DuplicateRegistration { kind, name });
        }
        match out.iter_mut().position(|e| name_of(e) == name) {
            Some(pos) => {
                if !overrides.contains(&name) {
                    warn!(
                        kind = %kind,
                        name = %name,
                        "application entry shadows a framework entry without an override"
                    );
                }
                out[pos] = entry.clone();
            }
            None => {
                if overrides.contains(&name) {
                    warn!(
                        kind = %kind,
                        name = %name,
                        "override names no framework entry; appending"
                    );
                }
                out.push(entry.clone());
            }
        }
    }
    Ok(out)
}

/// Merges an application [`RegistryExtension`] over framework defaults.
pub fn merge(
    defaults: RegistryConfig,
    extension: &RegistryExtension,
) -> Result<RegistryConfig, RegistryError> {
    let empty = BTreeSet::new();
    let exclusions = |kind: ComponentKind| extension.exclusions.get(&kind).unwrap_or(&empty);
    let overrides = |kind: ComponentKind| extension.overrides.get(&kind).unwrap_or(&empty);

    Ok(RegistryConfig {
        capabilities: merge_kind(
            ComponentKind::Capability,
            defaults.capabilities,
            &extension.config.capabilities,
            exclusions(ComponentKind::Capability),
            overrides(ComponentKind::Capability),
            |e| e.name.as_str(),
        )?,
        context_classes: merge_kind(
            ComponentKind::ContextClass,
            defaults.context_classes,
            &extension.config.context_classes,
            exclusions(ComponentKind::ContextClass),
            overrides(ComponentKind::ContextClass),
            |e| e.type_name.as_str(),
        )?,
        data_sources: merge_kind(
            ComponentKind::DataSource,
            defaults.data_sources,
            &extension.config.data_sources,
            exclusions(ComponentKind::DataSource),
            overrides(ComponentKind::DataSource),
            |e| e.name.as_str(),
        )?,
        providers: merge_kind(
            ComponentKind::Provider,
            defaults.providers,
            &extension.config.providers,
            exclusions(ComponentKind::Provider),
            overrides(ComponentKind::Provider),
            |e| e.name.as_str(),
        )?,
        connectors: merge_kind(
            ComponentKind::Connector,
            defaults.connectors,
            &extension.config.connectors,
            exclusions(ComponentKind::Connector),
            overrides(ComponentKind::Connector),
            |e| e.name.as_str(),
        )?,
        code_generators: merge_kind(
            ComponentKind::CodeGenerator,
            defaults.code_generators,
            &extension.config.code_generators,
            exclusions(ComponentKind::CodeGenerator),
            overrides(ComponentKind::CodeGenerator),
            |e| e.name.as_str(),
        )?,
        prompt_providers: merge_kind(
            ComponentKind::PromptProvider,
            defaults.prompt_providers,
            &extension.config.prompt_providers,
            exclusions(ComponentKind::PromptProvider),
            overrides(ComponentKind::PromptProvider),
            |e| e.key.as_str(),
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CapabilityRegistration, ContextClassRegistration};
    use std::sync::Arc;

    fn cap(name: &str, description: &str) -> CapabilityRegistration {
        CapabilityRegistration::new(
            name,
            description,
            Arc::new(|| {
                Err(RegistryError::InvalidRegistration {
                    kind: ComponentKind::Capability,
                    name: "unbuildable".into(),
                    message: "test registration".into(),
                })
            }),
        )
    }

    fn defaults() -> RegistryConfig {
        RegistryConfig::new()
            .with_capability(cap("channel_read", "framework read"))
            .with_capability(cap("channel_write", "framework write"))
            .with_context_class(ContextClassRegistration::new("CHANNEL_VALUES", "values"))
    }

    /// **Scenario**: Extending with an empty extension yields the framework defaults.
    #[test]
    fn empty_extension_is_identity() {
        let merged = merge(defaults(), &RegistryExtension::default()).unwrap();
        let names: Vec<_> = merged.capabilities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["channel_read", "channel_write"]);
        assert_eq!(merged.context_classes.len(), 1);
    }

    /// **Scenario**: Exclusion removes a framework entry; appended entries follow defaults.
    #[test]
    fn exclusion_and_append() {
        let ext = RegistryExtension::new(
            RegistryConfig::new().with_capability(cap("archiver_data", "app archiver")),
        )
        .exclude(ComponentKind::Capability, "channel_write");
        let merged = merge(defaults(), &ext).unwrap();
        let names: Vec<_> = merged.capabilities.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["channel_read", "archiver_data"]);
    }

    /// **Scenario**: Override replaces the framework entry in place.
    #[test]
    fn override_replaces_in_place() {
        let ext = RegistryExtension::new(
            RegistryConfig::new().with_capability(cap("channel_read", "app read")),
        )
        .override_entry(ComponentKind::Capability, "channel_read");
        let merged = merge(defaults(), &ext).unwrap();
        assert_eq!(merged.capabilities[0].description, "app read");
        assert_eq!(merged.capabilities.len(), 2);
    }

    /// **Scenario**: Shadowing without an override still replaces (with a warning).
    #[test]
    fn shadowing_without_override_replaces() {
        let ext = RegistryExtension::new(
            RegistryConfig::new().with_capability(cap("channel_read", "shadowed read")),
        );
        let merged = merge(defaults(), &ext).unwrap();
        assert_eq!(merged.capabilities[0].description, "shadowed read");
    }

    /// **Scenario**: Duplicate names inside the extension are a structured error.
    #[test]
    fn duplicate_extension_entries_rejected() {
        let ext = RegistryExtension::new(
            RegistryConfig::new()
                .with_capability(cap("archiver_data", "one"))
                .with_capability(cap("archiver_data", "two")),
        );
        match merge(defaults(), &ext) {
            Err(RegistryError::DuplicateRegistration { kind, name }) => {
                assert_eq!(kind, ComponentKind::Capability);
                assert_eq!(name, "archiver_data");
            }
            other => panic!("expected DuplicateRegistration, got {:?}", other.err()),
        }
    }

    /// **Scenario**: Excluding and overriding the same name is a configuration error.
    #[test]
    fn conflicting_exclude_and_override_rejected() {
        let ext = RegistryExtension::new(
            RegistryConfig::new().with_capability(cap("channel_read", "app read")),
        )
        .exclude(ComponentKind::Capability, "channel_read")
        .override_entry(ComponentKind::Capability, "channel_read");
        assert!(matches!(
            merge(defaults(), &ext),
            Err(RegistryError::ConflictingExtension { .. })
        ));
    }

    /// **Scenario**: Merging the same extension twice produces the same effective registry.
    #[test]
    fn merge_is_idempotent() {
        let ext = RegistryExtension::new(
            RegistryConfig::new().with_capability(cap("channel_read", "app read")),
        )
        .override_entry(ComponentKind::Capability, "channel_read");
        let once = merge(defaults(), &ext).unwrap();
        let twice = merge(once.clone(), &ext).unwrap();
        let names = |c: &RegistryConfig| {
            c.capabilities
                .iter()
                .map(|e| (e.name.clone(), e.description.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&once), names(&twice));
    }
}
