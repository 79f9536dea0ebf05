//! channel_read: read the current value of a named channel.

use std::sync::Arc;

use async_trait::async_trait;

use crate::capability::{
    Capability, CapabilityError, CapabilityOutcome, ClassifierExample, OrchestratorExample,
    StepView,
};
use crate::services::{ConnectorError, ControlSystemConnector};
use crate::state::PlannedStep;

use super::contexts::{ChannelValueContext, CHANNEL_VALUES};

pub struct ChannelReadCapability {
    connector: Arc<dyn ControlSystemConnector>,
}

impl ChannelReadCapability {
    pub fn new(connector: Arc<dyn ControlSystemConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Capability for ChannelReadCapability {
    fn name(&self) -> &str {
        "channel_read"
    }

    fn description(&self) -> &str {
        "Reads the current value of a named control-system channel."
    }

    fn provides(&self) -> Vec<String> {
        vec![CHANNEL_VALUES.to_string()]
    }

    fn classifier_examples(&self) -> Vec<ClassifierExample> {
        vec![
            ClassifierExample::relevant(
                "What is the current value of channel `SR:BEAM:CURRENT`?",
                "asks for a live channel reading",
            ),
            ClassifierExample::irrelevant(
                "Plot beam current for the last hour",
                "historical data comes from the archiver, not a live read",
            ),
        ]
    }

    fn orchestrator_examples(&self) -> Vec<OrchestratorExample> {
        vec![OrchestratorExample::new(
            "read one channel's present value",
            vec![PlannedStep::new(
                "channel_read",
                "cv_1",
                "Read the current value of `SR:BEAM:CURRENT`",
            )],
        )]
    }

    async fn execute(&self, view: StepView<'_>) -> Result<CapabilityOutcome, CapabilityError> {
        let channel = super::channel_from_step(view.step).ok_or_else(|| {
            CapabilityError::TaskRejected("no channel named in the step".into())
        })?;

        let value = self.connector.read_channel(&channel).await.map_err(|e| match e {
            ConnectorError::Unavailable(msg) => CapabilityError::Retriable(msg),
            other => CapabilityError::failed(other.to_string()),
        })?;

        let context = ChannelValueContext {
            channel,
            value,
            units: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let mut update = view.update();
        update
            .context
            .store_object(
                &view.step.context_key,
                &context,
                &view.step.task_objective,
                self.name(),
            )
            .map_err(|e| CapabilityError::failed(e.to_string()))?;
        Ok(CapabilityOutcome::Update(update))
    }
}
