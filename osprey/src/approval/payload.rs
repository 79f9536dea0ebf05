//! Interrupt and resume payloads plus the in-state approval slot.

/// Payload a capability builds when it needs human approval.
///
/// Carried in the state's approval slot and surfaced to UIs as the interrupt
/// body; clients resume with `{ "approved": true/false, ... }`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InterruptPayload {
    /// Capability requesting approval; resume payloads are matched to it.
    pub capability_name: String,
    /// One-line summary of the operation awaiting approval.
    pub operation_summary: String,
    /// Why this needs a human (e.g. "direct hardware write").
    #[serde(default)]
    pub safety_concerns: Vec<String>,
    /// Concrete actions that will run when approved.
    #[serde(default)]
    pub pending_actions: Vec<String>,
    /// Capability-specific detail (channel, value, code to run, plan body).
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl InterruptPayload {
    pub fn new(
        capability_name: impl Into<String>,
        operation_summary: impl Into<String>,
    ) -> Self {
        Self {
            capability_name: capability_name.into(),
            operation_summary: operation_summary.into(),
            safety_concerns: Vec::new(),
            pending_actions: Vec::new(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_safety_concern(mut self, concern: impl Into<String>) -> Self {
        self.safety_concerns.push(concern.into());
        self
    }

    pub fn with_pending_action(mut self, action: impl Into<String>) -> Self {
        self.pending_actions.push(action.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// External decision that ends an interrupt.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResumePayload {
    pub approved: bool,
    /// Capability-specific fields (edited values, comments).
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ResumePayload {
    pub fn approved() -> Self {
        Self {
            approved: true,
            fields: serde_json::Map::new(),
        }
    }

    pub fn rejected() -> Self {
        Self {
            approved: false,
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// The approval slot stored in agent state.
///
/// States: suspended (`resume` empty) and resumed (`resume` present). While
/// an interrupt is present and unresumed, no capability step may execute.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ApprovalSlot {
    pub capability_name: String,
    pub interrupt: InterruptPayload,
    pub resume: Option<ResumePayload>,
}

impl ApprovalSlot {
    /// Creates a suspended slot for the interrupt's capability.
    pub fn suspended(interrupt: InterruptPayload) -> Self {
        Self {
            capability_name: interrupt.capability_name.clone(),
            interrupt,
            resume: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Interrupt payload builders accumulate concerns and actions.
    #[test]
    fn interrupt_payload_builders() {
        let payload = InterruptPayload::new("channel_write", "write 5.0 to X")
            .with_safety_concern("direct hardware write")
            .with_pending_action("caput X 5.0")
            .with_payload(serde_json::json!({"channel": "X", "value": 5.0}));
        assert_eq!(payload.safety_concerns.len(), 1);
        assert_eq!(payload.pending_actions.len(), 1);
        assert_eq!(payload.payload["value"], 5.0);
    }

    /// **Scenario**: A suspended slot carries the capability name and no resume.
    #[test]
    fn suspended_slot_shape() {
        let slot =
            ApprovalSlot::suspended(InterruptPayload::new("channel_write", "write 5.0 to X"));
        assert_eq!(slot.capability_name, "channel_write");
        assert!(slot.resume.is_none());
    }

    /// **Scenario**: Resume payloads round-trip through serde with extra fields.
    #[test]
    fn resume_payload_serde_roundtrip() {
        let payload =
            ResumePayload::approved().with_field("comment", serde_json::json!("looks safe"));
        let json = serde_json::to_string(&payload).unwrap();
        let back: ResumePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
        assert!(back.approved);
    }
}
