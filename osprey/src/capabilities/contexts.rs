//! Typed context objects the built-in capabilities produce.

use crate::state::ContextObject;

pub const CHANNEL_VALUES: &str = "CHANNEL_VALUES";
pub const TIME_RANGE: &str = "TIME_RANGE";
pub const ARCHIVER_DATA: &str = "ARCHIVER_DATA";
pub const WRITE_STATUS: &str = "WRITE_STATUS";
/// Well-known type the clarify node watches for.
pub const CLARIFICATION_NEEDED: &str = "CLARIFICATION_NEEDED";

/// One live channel reading.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelValueContext {
    pub channel: String,
    pub value: f64,
    pub units: Option<String>,
    /// ISO-8601 read timestamp.
    pub timestamp: String,
}

impl ContextObject for ChannelValueContext {
    fn context_type(&self) -> &str {
        CHANNEL_VALUES
    }

    fn summary(&self) -> String {
        match &self.units {
            Some(units) => format!("{} = {} {}", self.channel, self.value, units),
            None => format!("{} = {}", self.channel, self.value),
        }
    }

    fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// An absolute time window.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRangeContext {
    /// ISO-8601 start (inclusive).
    pub start: String,
    /// ISO-8601 end (inclusive).
    pub end: String,
    /// The phrase this was parsed from (e.g. "last hour").
    pub source_phrase: String,
}

impl ContextObject for TimeRangeContext {
    fn context_type(&self) -> &str {
        TIME_RANGE
    }

    fn summary(&self) -> String {
        format!("{} .. {} ({})", self.start, self.end, self.source_phrase)
    }

    fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A historical time series for one channel.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ArchiverDataContext {
    pub channel: String,
    /// `(iso8601, value)` pairs, oldest first.
    pub points: Vec<(String, f64)>,
}

impl ContextObject for ArchiverDataContext {
    fn context_type(&self) -> &str {
        ARCHIVER_DATA
    }

    fn summary(&self) -> String {
        format!("{}: {} archived points", self.channel, self.points.len())
    }

    fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Outcome of a channel write.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WriteStatusContext {
    pub channel: String,
    pub value: f64,
    /// `written` or `cancelled`.
    pub status: String,
}

impl WriteStatusContext {
    pub fn written(channel: impl Into<String>, value: f64) -> Self {
        Self {
            channel: channel.into(),
            value,
            status: "written".into(),
        }
    }

    pub fn cancelled(channel: impl Into<String>, value: f64) -> Self {
        Self {
            channel: channel.into(),
            value,
            status: "cancelled".into(),
        }
    }
}

impl ContextObject for WriteStatusContext {
    fn context_type(&self) -> &str {
        WRITE_STATUS
    }

    fn summary(&self) -> String {
        format!("write {} = {}: {}", self.channel, self.value, self.status)
    }

    fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A question the assistant must ask before it can continue.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClarificationContext {
    pub question: String,
}

impl ContextObject for ClarificationContext {
    fn context_type(&self) -> &str {
        CLARIFICATION_NEEDED
    }

    fn summary(&self) -> String {
        format!("needs clarification: {}", self.question)
    }

    fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
