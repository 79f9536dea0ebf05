//! archiver_data: retrieve archived channel history over a window, with a plot.

use std::sync::Arc;

use async_trait::async_trait;

use crate::capability::{
    Capability, CapabilityError, CapabilityOutcome, ClassifierExample, OrchestratorExample,
    StepView,
};
use crate::services::{ConnectorError, ControlSystemConnector};
use crate::state::{
    ArtifactKind, Cardinality, ContextRequirement, ExtractedValue, PlannedStep, UiArtifact,
};

use super::contexts::{ArchiverDataContext, ARCHIVER_DATA, TIME_RANGE};

pub struct ArchiverDataCapability {
    archiver: Arc<dyn ControlSystemConnector>,
}

impl ArchiverDataCapability {
    pub fn new(archiver: Arc<dyn ControlSystemConnector>) -> Self {
        Self { archiver }
    }
}

#[async_trait]
impl Capability for ArchiverDataCapability {
    fn name(&self) -> &str {
        "archiver_data"
    }

    fn description(&self) -> &str {
        "Retrieves archived history for a channel over a given time window \
         and produces a plot of the series."
    }

    fn provides(&self) -> Vec<String> {
        vec![ARCHIVER_DATA.to_string()]
    }

    fn requires(&self) -> Vec<ContextRequirement> {
        vec![ContextRequirement {
            context_type: TIME_RANGE.to_string(),
            cardinality: Cardinality::Single,
        }]
    }

    fn classifier_examples(&self) -> Vec<ClassifierExample> {
        vec![ClassifierExample::relevant(
            "Plot beam current for the last hour",
            "asks for historical data over a window",
        )]
    }

    fn orchestrator_examples(&self) -> Vec<OrchestratorExample> {
        vec![OrchestratorExample::new(
            "two-step history plot",
            vec![
                PlannedStep::new("time_range", "tr_hour", "Parse the time range"),
                PlannedStep::new("archiver_data", "ar_1", "Fetch `SR:BEAM:CURRENT` history")
                    .with_inputs(vec!["tr_hour".to_string()]),
            ],
        )]
    }

    async fn execute(&self, view: StepView<'_>) -> Result<CapabilityOutcome, CapabilityError> {
        let channel = super::channel_from_step(view.step).ok_or_else(|| {
            CapabilityError::TaskRejected("no channel named in the step".into())
        })?;

        let window = match view.inputs.get(TIME_RANGE) {
            Some(ExtractedValue::One(ctx)) => ctx.clone(),
            _ => {
                return Err(CapabilityError::failed(
                    "archiver_data needs exactly one TIME_RANGE input",
                ))
            }
        };
        let start = window.value["start"].as_str().unwrap_or_default().to_string();
        let end = window.value["end"].as_str().unwrap_or_default().to_string();

        let series = self
            .archiver
            .get_data(&channel, &start, &end)
            .await
            .map_err(|e| match e {
                ConnectorError::Unavailable(msg) => CapabilityError::Retriable(msg),
                other => CapabilityError::failed(other.to_string()),
            })?;

        let context = ArchiverDataContext {
            channel: channel.clone(),
            points: series.points,
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
        update.ui.push(UiArtifact::new(
            ArtifactKind::Image,
            self.name(),
            format!("{} ({} .. {})", channel, start, end),
            serde_json::json!({
                "channel": channel,
                "points": context.points.len(),
            }),
        ));
        Ok(CapabilityOutcome::Update(update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockConnector;
    use crate::state::{AgentState, ExtractedContexts};

    fn time_range_input(store: &mut crate::state::ContextStore) {
        store
            .store(
                TIME_RANGE,
                "tr_hour",
                serde_json::json!({
                    "start": "2026-08-01T00:00:00Z",
                    "end": "2026-08-01T01:00:00Z",
                    "source_phrase": "last hour",
                }),
                "window",
                "parse window",
                "time_range",
            )
            .unwrap();
    }

    /// **Scenario**: With a TIME_RANGE input, the capability stores a series and a plot.
    #[tokio::test]
    async fn fetch_stores_series_and_plot() {
        let connector = Arc::new(MockConnector::new().with_channel("SR:BEAM:CURRENT", 402.1));
        let capability = ArchiverDataCapability::new(connector);
        let step = PlannedStep::new(
            "archiver_data",
            "ar_1",
            "Fetch `SR:BEAM:CURRENT` over the window",
        )
        .with_inputs(vec!["tr_hour".to_string()]);
        let mut state = AgentState::for_query("plot beam current");
        time_range_input(&mut state.context);
        let inputs = state
            .context
            .extract_for_step(&step.inputs, &capability.requires())
            .unwrap();

        let outcome = capability
            .execute(StepView {
                step: &step,
                state: &state,
                inputs,
                resume: None,
            })
            .await
            .unwrap();
        let update = match outcome {
            CapabilityOutcome::Update(u) => u,
            CapabilityOutcome::Interrupt(_) => panic!("should not interrupt"),
        };
        let stored = update.context.get(ARCHIVER_DATA, "ar_1").unwrap();
        assert_eq!(stored.value["channel"], "SR:BEAM:CURRENT");
        assert!(!stored.value["points"].as_array().unwrap().is_empty());
        assert_eq!(update.ui.images.len(), 1);
        assert_eq!(update.ui.images[0].source_capability, "archiver_data");
    }

    /// **Scenario**: A missing TIME_RANGE input is a hard failure.
    #[tokio::test]
    async fn missing_window_fails() {
        let connector = Arc::new(MockConnector::new().with_channel("SR:X", 1.0));
        let capability = ArchiverDataCapability::new(connector);
        let step = PlannedStep::new("archiver_data", "ar_1", "Fetch `SR:X` history");
        let state = AgentState::for_query("q");
        let err = capability
            .execute(StepView {
                step: &step,
                state: &state,
                inputs: ExtractedContexts::new(),
                resume: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Failed { .. }));
    }
}
