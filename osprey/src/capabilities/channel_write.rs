//! channel_write: write a value to a channel behind the approval protocol.
//!
//! First entry with an approval-requiring policy returns an interrupt payload
//! carrying the channel and value; the re-entry consumes the resume payload
//! and either performs the write or records a cancelled status.

use std::sync::Arc;

use async_trait::async_trait;

use crate::approval::{ApprovalPolicy, InterruptPayload, OperationFeatures};
use crate::capability::{
    Capability, CapabilityError, CapabilityOutcome, ClassifierExample, OrchestratorExample,
    StepView,
};
use crate::services::{ConnectorError, ControlSystemConnector};
use crate::state::PlannedStep;

use super::contexts::{WriteStatusContext, WRITE_STATUS};

pub struct ChannelWriteCapability {
    connector: Arc<dyn ControlSystemConnector>,
    policy: ApprovalPolicy,
}

impl ChannelWriteCapability {
    pub fn new(connector: Arc<dyn ControlSystemConnector>, policy: ApprovalPolicy) -> Self {
        Self { connector, policy }
    }

    fn value_from_step(step: &PlannedStep) -> Option<f64> {
        if let Some(value) = step.parameters.get("value").and_then(|v| v.as_f64()) {
            return Some(value);
        }
        // Fall back to the last number in the task objective.
        step.task_objective
            .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
            .filter(|t| !t.is_empty())
            .filter_map(|t| t.parse::<f64>().ok())
            .last()
    }
}

#[async_trait]
impl Capability for ChannelWriteCapability {
    fn name(&self) -> &str {
        "channel_write"
    }

    fn description(&self) -> &str {
        "Writes a value to a control-system channel; a direct hardware write \
         that requires human approval under most policies."
    }

    fn provides(&self) -> Vec<String> {
        vec![WRITE_STATUS.to_string()]
    }

    fn classifier_examples(&self) -> Vec<ClassifierExample> {
        vec![
            ClassifierExample::relevant(
                "Set channel `SR:CORRECTOR:1` to 5.0",
                "asks to change a channel setpoint",
            ),
            ClassifierExample::irrelevant(
                "What is the current value of `SR:CORRECTOR:1`?",
                "a read, not a write",
            ),
        ]
    }

    fn orchestrator_examples(&self) -> Vec<OrchestratorExample> {
        vec![OrchestratorExample::new(
            "set one channel to a value",
            vec![PlannedStep::new(
                "channel_write",
                "wr_1",
                "Set `SR:CORRECTOR:1` to 5.0",
            )],
        )]
    }

    fn operation_features(&self) -> OperationFeatures {
        OperationFeatures::writes()
    }

    async fn execute(&self, view: StepView<'_>) -> Result<CapabilityOutcome, CapabilityError> {
        let channel = super::channel_from_step(view.step).ok_or_else(|| {
            CapabilityError::TaskRejected("no channel named in the step".into())
        })?;
        let value = Self::value_from_step(view.step).ok_or_else(|| {
            CapabilityError::TaskRejected("no value named in the step".into())
        })?;

        match &view.resume {
            None => {
                if self.policy.requires_approval(self.name(), &self.operation_features()) {
                    let interrupt =
                        InterruptPayload::new(self.name(), format!("write {} to {}", value, channel))
                            .with_safety_concern("direct hardware write")
                            .with_pending_action(format!("set {} = {}", channel, value))
                            .with_payload(serde_json::json!({
                                "channel": channel,
                                "value": value,
                            }));
                    return Ok(CapabilityOutcome::Interrupt(interrupt));
                }
            }
            Some(resume) if !resume.approved => {
                let status = WriteStatusContext::cancelled(&channel, value);
                let mut update = view.update();
                update
                    .context
                    .store_object(
                        &view.step.context_key,
                        &status,
                        &view.step.task_objective,
                        self.name(),
                    )
                    .map_err(|e| CapabilityError::failed(e.to_string()))?;
                return Ok(CapabilityOutcome::Update(update));
            }
            Some(_) => {}
        }

        self.connector
            .write_channel(&channel, value)
            .await
            .map_err(|e| match e {
                ConnectorError::Unavailable(msg) => CapabilityError::Retriable(msg),
                other => CapabilityError::failed(other.to_string()),
            })?;

        let status = WriteStatusContext::written(&channel, value);
        let mut update = view.update();
        update
            .context
            .store_object(
                &view.step.context_key,
                &status,
                &view.step.task_objective,
                self.name(),
            )
            .map_err(|e| CapabilityError::failed(e.to_string()))?;
        Ok(CapabilityOutcome::Update(update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{ApprovalMode, ResumePayload};
    use crate::services::MockConnector;
    use crate::state::{AgentState, ExtractedContexts};

    fn write_step() -> PlannedStep {
        PlannedStep::new("channel_write", "wr_1", "Set channel `SR:X` to 5.0")
    }

    fn capability(connector: Arc<MockConnector>, mode: ApprovalMode) -> ChannelWriteCapability {
        ChannelWriteCapability::new(connector, ApprovalPolicy::new(mode))
    }

    /// **Scenario**: First entry under a writes_only policy interrupts with the payload.
    #[tokio::test]
    async fn first_entry_interrupts() {
        let connector = Arc::new(MockConnector::new().with_channel("SR:X", 1.0));
        let cap = capability(connector.clone(), ApprovalMode::WritesOnly);
        let step = write_step();
        let state = AgentState::for_query("set X to 5");
        let outcome = cap
            .execute(StepView {
                step: &step,
                state: &state,
                inputs: ExtractedContexts::new(),
                resume: None,
            })
            .await
            .unwrap();
        match outcome {
            CapabilityOutcome::Interrupt(payload) => {
                assert_eq!(payload.payload["channel"], "SR:X");
                assert_eq!(payload.payload["value"], 5.0);
                assert_eq!(payload.safety_concerns, vec!["direct hardware write"]);
            }
            CapabilityOutcome::Update(_) => panic!("expected interrupt"),
        }
        assert!(connector.recorded_writes().is_empty());
    }

    /// **Scenario**: Approved resume performs the write and stores a written status.
    #[tokio::test]
    async fn approved_resume_writes() {
        let connector = Arc::new(MockConnector::new().with_channel("SR:X", 1.0));
        let cap = capability(connector.clone(), ApprovalMode::WritesOnly);
        let step = write_step();
        let state = AgentState::for_query("set X to 5");
        let outcome = cap
            .execute(StepView {
                step: &step,
                state: &state,
                inputs: ExtractedContexts::new(),
                resume: Some(ResumePayload::approved()),
            })
            .await
            .unwrap();
        let update = match outcome {
            CapabilityOutcome::Update(u) => u,
            CapabilityOutcome::Interrupt(_) => panic!("expected update"),
        };
        assert_eq!(
            update.context.get(WRITE_STATUS, "wr_1").unwrap().value["status"],
            "written"
        );
        assert_eq!(connector.recorded_writes(), vec![("SR:X".to_string(), 5.0)]);
    }

    /// **Scenario**: Rejected resume records a cancelled status and writes nothing.
    #[tokio::test]
    async fn rejected_resume_cancels() {
        let connector = Arc::new(MockConnector::new().with_channel("SR:X", 1.0));
        let cap = capability(connector.clone(), ApprovalMode::WritesOnly);
        let step = write_step();
        let state = AgentState::for_query("set X to 5");
        let outcome = cap
            .execute(StepView {
                step: &step,
                state: &state,
                inputs: ExtractedContexts::new(),
                resume: Some(ResumePayload::rejected()),
            })
            .await
            .unwrap();
        let update = match outcome {
            CapabilityOutcome::Update(u) => u,
            CapabilityOutcome::Interrupt(_) => panic!("expected update"),
        };
        assert_eq!(
            update.context.get(WRITE_STATUS, "wr_1").unwrap().value["status"],
            "cancelled"
        );
        assert!(connector.recorded_writes().is_empty());
    }

    /// **Scenario**: Disabled approval writes immediately without an interrupt.
    #[tokio::test]
    async fn disabled_policy_writes_directly() {
        let connector = Arc::new(MockConnector::new().with_channel("SR:X", 1.0));
        let cap = capability(connector.clone(), ApprovalMode::Disabled);
        let step = write_step();
        let state = AgentState::for_query("set X to 5");
        let outcome = cap
            .execute(StepView {
                step: &step,
                state: &state,
                inputs: ExtractedContexts::new(),
                resume: None,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, CapabilityOutcome::Update(_)));
        assert_eq!(connector.recorded_writes().len(), 1);
    }
}
