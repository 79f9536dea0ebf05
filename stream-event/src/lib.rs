//! Progress stream event protocol: type + payload + envelope.
//!
//! This crate defines the wire shape of a single progress event emitted while
//! an agent turn runs, and the envelope (session_id, node_id, event_id)
//! injected into each serialized event. It does not depend on osprey; osprey
//! bridges its internal `StreamEvent<S>` into `ProgressEvent` and calls
//! `to_json`. Progress events are advisory to UIs and are never part of the
//! semantic agent state.

pub mod envelope;
pub mod event;

pub use envelope::{to_json, Envelope, EnvelopeState};
pub use event::ProgressEvent;
