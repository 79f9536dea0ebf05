//! Progress event types (type + payload).
//! State-carrying variants use `serde_json::Value`; the bridge in osprey serializes state into that.

use serde::Serialize;
use serde_json::Value;

/// Progress event: wire shape for one stream event (type + payload).
/// Envelope fields (session_id, node_id, event_id) are applied separately.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A graph node started running.
    NodeEnter { id: String },
    /// A graph node finished; `result` is `"ok"` or an error description.
    NodeExit { id: String, result: Value },
    /// Free-form status line from a node (e.g. "classifying 7 capabilities").
    Status { message: String },
    /// One chunk of streamed assistant output.
    MessageChunk { content: String, id: String },
    /// Full state snapshot after a node (Values stream mode).
    Values { state: Value },
    /// Per-node state update (Updates stream mode).
    Updates { id: String, state: Value },
    /// A checkpoint was written for the current thread.
    Checkpoint {
        checkpoint_id: String,
        timestamp: String,
        step: i64,
        thread_id: Option<String>,
        checkpoint_ns: Option<String>,
    },
    /// A capability produced a UI artifact (image, notebook, command, file).
    Artifact {
        kind: String,
        source_capability: String,
        label: String,
    },
    /// Execution suspended pending human approval; payload is the interrupt body.
    ApprovalRequired {
        capability_name: String,
        payload: Value,
    },
    /// Token usage for one LLM call.
    Usage {
        role: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        total_tokens: u32,
    },
}

impl ProgressEvent {
    /// Serializes this event to a JSON object (type + payload only; no envelope).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
