//! Bridge from internal stream events to the external progress protocol.
//!
//! UIs consume `stream-event`'s `ProgressEvent` JSON; this module converts a
//! graph run's [`StreamEvent<AgentState>`] into that wire shape. Advisory
//! only; nothing here touches semantic state.

use stream_event::ProgressEvent;

use crate::state::AgentState;
use crate::stream::StreamEvent;

fn state_to_value(state: &AgentState) -> serde_json::Value {
    serde_json::to_value(state).unwrap_or(serde_json::Value::Null)
}

/// Converts one internal stream event into the external progress event.
///
/// Returns `None` for events with no external representation.
pub fn stream_event_to_progress(event: &StreamEvent<AgentState>) -> Option<ProgressEvent> {
    match event {
        StreamEvent::Values(state) => Some(ProgressEvent::Values {
            state: state_to_value(state),
        }),
        StreamEvent::Updates { node_id, state } => Some(ProgressEvent::Updates {
            id: node_id.clone(),
            state: state_to_value(state),
        }),
        StreamEvent::TaskStart { node_id } => Some(ProgressEvent::NodeEnter {
            id: node_id.clone(),
        }),
        StreamEvent::TaskEnd { node_id, result } => Some(ProgressEvent::NodeExit {
            id: node_id.clone(),
            result: match result {
                Ok(()) => serde_json::json!("ok"),
                Err(message) => serde_json::json!({"error": message}),
            },
        }),
        StreamEvent::Checkpoint(checkpoint) => Some(ProgressEvent::Checkpoint {
            checkpoint_id: checkpoint.checkpoint_id.clone(),
            timestamp: checkpoint.timestamp.clone(),
            step: checkpoint.step,
            thread_id: checkpoint.thread_id.clone(),
            checkpoint_ns: checkpoint.checkpoint_ns.clone(),
        }),
        StreamEvent::Custom(value) => value
            .get("type")
            .and_then(|t| t.as_str())
            .filter(|t| *t == "approval_required")
            .map(|_| ProgressEvent::ApprovalRequired {
                capability_name: value
                    .get("capability_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                payload: value.get("payload").cloned().unwrap_or_default(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Task events become node_enter / node_exit with the id preserved.
    #[test]
    fn task_events_bridge_to_node_events() {
        let enter = stream_event_to_progress(&StreamEvent::TaskStart {
            node_id: "orchestration".into(),
        })
        .unwrap();
        assert_eq!(enter.to_value().unwrap()["type"], "node_enter");

        let exit = stream_event_to_progress(&StreamEvent::TaskEnd {
            node_id: "orchestration".into(),
            result: Err("boom".into()),
        })
        .unwrap();
        let value = exit.to_value().unwrap();
        assert_eq!(value["type"], "node_exit");
        assert_eq!(value["result"]["error"], "boom");
    }

    /// **Scenario**: Values events carry the serialized agent state.
    #[test]
    fn values_event_serializes_state() {
        let state = AgentState::for_query("q");
        let event = stream_event_to_progress(&StreamEvent::Values(state)).unwrap();
        let value = event.to_value().unwrap();
        assert_eq!(value["type"], "values");
        assert_eq!(value["state"]["input_output"]["query"], "q");
    }
}
