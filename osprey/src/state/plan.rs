//! Execution plan types.
//!
//! A plan is an ordered list of [`PlannedStep`]s produced by the
//! orchestration node and immutable once accepted. Steps reference earlier
//! steps' outputs through context keys, never through direct pointers.

/// One entry in an execution plan.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlannedStep {
    /// Must match a registered capability in the active set at acceptance time.
    pub capability_name: String,
    /// Output name this step will produce; unique within the plan.
    pub context_key: String,
    /// Scoped restatement of the task for this step.
    pub task_objective: String,
    /// Context keys produced by earlier steps (or already stored); no forward
    /// references.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Free-form scalar hints for the capability.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl PlannedStep {
    pub fn new(
        capability_name: impl Into<String>,
        context_key: impl Into<String>,
        task_objective: impl Into<String>,
    ) -> Self {
        Self {
            capability_name: capability_name.into(),
            context_key: context_key.into(),
            task_objective: task_objective.into(),
            inputs: Vec::new(),
            parameters: serde_json::Map::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Builder populates inputs and parameters; serde round-trips.
    #[test]
    fn planned_step_builder_and_serde() {
        let step = PlannedStep::new("archiver_data", "ar_1", "retrieve beam current")
            .with_inputs(vec!["tr_hour".to_string()])
            .with_parameter("channel", serde_json::json!("SR:BEAM:CURRENT"));
        assert_eq!(step.inputs, vec!["tr_hour".to_string()]);
        let json = serde_json::to_string(&step).unwrap();
        let back: PlannedStep = serde_json::from_str(&json).unwrap();
        assert_eq!(step, back);
    }

    /// **Scenario**: Missing inputs/parameters fields deserialize as empty.
    #[test]
    fn planned_step_defaults_on_deserialize() {
        let step: PlannedStep = serde_json::from_str(
            r#"{"capability_name":"channel_read","context_key":"cv_1","task_objective":"read X"}"#,
        )
        .unwrap();
        assert!(step.inputs.is_empty());
        assert!(step.parameters.is_empty());
    }
}
