//! Framework-default capabilities and context types.
//!
//! Four built-in capabilities cover the common accelerator-assistant flows:
//! reading a live channel, writing one (behind approval), parsing a relative
//! time range, and retrieving archived history as a plot. Applications
//! extend or replace them through their registry provider.

mod archiver_data;
mod channel_read;
mod channel_write;
mod contexts;
mod time_range;

pub use archiver_data::ArchiverDataCapability;
pub use channel_read::ChannelReadCapability;
pub use channel_write::ChannelWriteCapability;
pub use contexts::{
    ArchiverDataContext, ChannelValueContext, ClarificationContext, TimeRangeContext,
    WriteStatusContext, ARCHIVER_DATA, CHANNEL_VALUES, CLARIFICATION_NEEDED, TIME_RANGE,
    WRITE_STATUS,
};
pub use time_range::TimeRangeCapability;

use std::sync::Arc;

use crate::approval::ApprovalPolicy;
use crate::capability::Capability;
use crate::config::ModelConfig;
use crate::llm::{LlmProvider, MockProvider, OpenAiProvider};
use crate::registry::{
    CapabilityRegistration, ConnectorRegistration, ContextClassRegistration,
    ProviderRegistration, RegistryConfig,
};
use crate::services::{ConnectorKind, ControlSystemConnector, MockConnector};

/// Shared services the framework-default capabilities are built over.
#[derive(Clone)]
pub struct FrameworkServices {
    pub control_system: Arc<dyn ControlSystemConnector>,
    pub archiver: Arc<dyn ControlSystemConnector>,
    pub approval: ApprovalPolicy,
}

impl FrameworkServices {
    /// Mock-backed services for tests and examples.
    pub fn mock(connector: Arc<MockConnector>, approval: ApprovalPolicy) -> Self {
        Self {
            control_system: connector.clone(),
            archiver: connector,
            approval,
        }
    }
}

/// The framework-default registry configuration.
///
/// Components: the four capabilities, their context classes, the `openai` and
/// `mock` providers, and a `mock` connector.
pub fn framework_defaults(services: &FrameworkServices) -> RegistryConfig {
    let read_connector = services.control_system.clone();
    let write_connector = services.control_system.clone();
    let write_policy = services.approval.clone();
    let archiver = services.archiver.clone();

    RegistryConfig::new()
        .with_context_class(ContextClassRegistration::new(
            CHANNEL_VALUES,
            "Live channel readings",
        ))
        .with_context_class(ContextClassRegistration::new(
            TIME_RANGE,
            "Absolute time windows parsed from relative phrases",
        ))
        .with_context_class(ContextClassRegistration::new(
            ARCHIVER_DATA,
            "Historical channel time series",
        ))
        .with_context_class(ContextClassRegistration::new(
            WRITE_STATUS,
            "Outcome of a channel write",
        ))
        .with_context_class(ContextClassRegistration::new(
            CLARIFICATION_NEEDED,
            "A question the assistant must ask before continuing",
        ))
        .with_capability(CapabilityRegistration::new(
            "channel_read",
            "Read the current value of a named control-system channel",
            Arc::new(move || {
                Ok(Arc::new(ChannelReadCapability::new(read_connector.clone()))
                    as Arc<dyn Capability>)
            }),
        ))
        .with_capability(CapabilityRegistration::new(
            "channel_write",
            "Write a value to a control-system channel (requires approval)",
            Arc::new(move || {
                Ok(Arc::new(ChannelWriteCapability::new(
                    write_connector.clone(),
                    write_policy.clone(),
                )) as Arc<dyn Capability>)
            }),
        ))
        .with_capability(CapabilityRegistration::new(
            "time_range",
            "Parse a relative time phrase into an absolute time window",
            Arc::new(|| Ok(Arc::new(TimeRangeCapability::new()) as Arc<dyn Capability>)),
        ))
        .with_capability(CapabilityRegistration::new(
            "archiver_data",
            "Retrieve archived channel history over a time window and plot it",
            Arc::new(move || {
                Ok(Arc::new(ArchiverDataCapability::new(archiver.clone()))
                    as Arc<dyn Capability>)
            }),
        ))
        .with_provider(ProviderRegistration {
            name: "openai".to_string(),
            builder: Arc::new(|config: &ModelConfig| {
                let mut provider = OpenAiProvider::new(config.model_id.clone());
                if let Some(t) = config.temperature {
                    provider = provider.with_temperature(t);
                }
                Ok(Arc::new(provider) as Arc<dyn LlmProvider>)
            }),
        })
        .with_provider(ProviderRegistration {
            name: "mock".to_string(),
            builder: Arc::new(|_: &ModelConfig| {
                Ok(Arc::new(MockProvider::new()) as Arc<dyn LlmProvider>)
            }),
        })
        .with_connector(ConnectorRegistration {
            name: "mock".to_string(),
            kind: ConnectorKind::ControlSystem,
            builder: Arc::new(|| {
                Ok(Arc::new(MockConnector::new()) as Arc<dyn ControlSystemConnector>)
            }),
        })
}

/// Extracts a channel name from a step: the `channel` parameter, else the
/// first backtick-quoted token in the step's task objective.
pub(crate) fn channel_from_step(step: &crate::state::PlannedStep) -> Option<String> {
    if let Some(channel) = step.parameters.get("channel").and_then(|v| v.as_str()) {
        return Some(channel.to_string());
    }
    let objective = &step.task_objective;
    let start = objective.find('`')?;
    let rest = &objective[start + 1..];
    let end = rest.find('`')?;
    let token = &rest[..end];
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
