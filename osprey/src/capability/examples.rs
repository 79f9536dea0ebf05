//! Example types capabilities contribute to the LLM prompts.

use crate::state::PlannedStep;

/// One few-shot example for the relevance classifier.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassifierExample {
    pub query: String,
    pub is_relevant: bool,
    pub reason: String,
}

impl ClassifierExample {
    pub fn relevant(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            is_relevant: true,
            reason: reason.into(),
        }
    }

    pub fn irrelevant(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            is_relevant: false,
            reason: reason.into(),
        }
    }
}

/// One worked example for the orchestrator prompt: a scenario and the steps a
/// good plan would contain.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrchestratorExample {
    pub scenario: String,
    pub steps: Vec<PlannedStep>,
}

impl OrchestratorExample {
    pub fn new(scenario: impl Into<String>, steps: Vec<PlannedStep>) -> Self {
        Self {
            scenario: scenario.into(),
            steps,
        }
    }

    /// Renders the example as a numbered block for prompt inclusion.
    pub fn render(&self, index: usize) -> String {
        let steps = self
            .steps
            .iter()
            .map(|s| {
                format!(
                    "  - {} -> {} (inputs: [{}])",
                    s.capability_name,
                    s.context_key,
                    s.inputs.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("Example {}: {}\n{}", index, self.scenario, steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: render numbers the example and lists step wiring.
    #[test]
    fn orchestrator_example_render() {
        let example = OrchestratorExample::new(
            "plot beam current for the last hour",
            vec![
                PlannedStep::new("time_range", "tr_hour", "parse the time range"),
                PlannedStep::new("archiver_data", "ar_1", "fetch the series")
                    .with_inputs(vec!["tr_hour".to_string()]),
            ],
        );
        let text = example.render(1);
        assert!(text.starts_with("Example 1:"));
        assert!(text.contains("time_range -> tr_hour"));
        assert!(text.contains("inputs: [tr_hour]"));
    }
}
