//! time_range: parse a relative time phrase into an absolute window.

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::capability::{
    Capability, CapabilityError, CapabilityOutcome, ClassifierExample, OrchestratorExample,
    StepView,
};
use crate::state::PlannedStep;

use super::contexts::{TimeRangeContext, TIME_RANGE};

pub struct TimeRangeCapability;

impl TimeRangeCapability {
    pub fn new() -> Self {
        Self
    }

    /// Parses "last hour", "last N hours", "last N minutes", "last day".
    fn parse_window(phrase: &str) -> Option<(Duration, String)> {
        let lower = phrase.to_lowercase();
        let idx = lower.find("last ")?;
        let rest = &lower[idx + 5..];
        let mut words = rest.split_whitespace();
        let first = words.next()?;
        let (count, unit) = match first.parse::<i64>() {
            Ok(n) => (n, words.next()?),
            Err(_) => (1, first),
        };
        let unit = unit.trim_end_matches(|c: char| !c.is_alphabetic());
        let duration = match unit {
            u if u.starts_with("minute") || u == "min" || u == "mins" => Duration::minutes(count),
            u if u.starts_with("hour") => Duration::hours(count),
            u if u.starts_with("day") => Duration::days(count),
            _ => return None,
        };
        let source = if count == 1 {
            format!("last {}", unit)
        } else {
            format!("last {} {}", count, unit)
        };
        Some((duration, source))
    }
}

impl Default for TimeRangeCapability {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for TimeRangeCapability {
    fn name(&self) -> &str {
        "time_range"
    }

    fn description(&self) -> &str {
        "Parses a relative time phrase (e.g. 'the last hour') into an \
         absolute start/end window for archiver queries."
    }

    fn provides(&self) -> Vec<String> {
        vec![TIME_RANGE.to_string()]
    }

    fn classifier_examples(&self) -> Vec<ClassifierExample> {
        vec![
            ClassifierExample::relevant(
                "Plot beam current for the last hour",
                "the request names a relative time window",
            ),
            ClassifierExample::irrelevant(
                "What is the current beam current?",
                "a present-value read needs no time window",
            ),
        ]
    }

    fn orchestrator_examples(&self) -> Vec<OrchestratorExample> {
        vec![OrchestratorExample::new(
            "history retrieval needs a window first",
            vec![
                PlannedStep::new("time_range", "tr_hour", "Parse 'the last hour' into a window"),
                PlannedStep::new("archiver_data", "ar_1", "Fetch `SR:BEAM:CURRENT` history")
                    .with_inputs(vec!["tr_hour".to_string()]),
            ],
        )]
    }

    async fn execute(&self, view: StepView<'_>) -> Result<CapabilityOutcome, CapabilityError> {
        let phrase = view
            .parameter("window")
            .map(str::to_string)
            .unwrap_or_else(|| view.step.task_objective.clone());
        let (duration, source_phrase) = Self::parse_window(&phrase).ok_or_else(|| {
            CapabilityError::TaskRejected(format!("no relative time window in '{}'", phrase))
        })?;

        let end = Utc::now();
        let start = end - duration;
        let context = TimeRangeContext {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
            source_phrase,
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
