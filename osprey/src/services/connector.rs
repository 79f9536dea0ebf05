//! Control-system connector interface and the mock implementation.
//!
//! Kinds: live control system and historical archiver. Errors are
//! categorized so capabilities can phrase user-safe messages without parsing
//! backend-specific strings.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

/// Connector kind: live control system or historical archiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    ControlSystem,
    Archiver,
}

/// Categorized connector errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConnectorError {
    #[error("channel not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid value for {channel}: {message}")]
    InvalidValue { channel: String, message: String },
    #[error("connector unavailable: {0}")]
    Unavailable(String),
}

/// A historical time series for one channel.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeSeries {
    pub channel: String,
    /// `(iso8601 timestamp, value)` pairs, oldest first.
    pub points: Vec<(String, f64)>,
}

/// Control-system access: reads, writes, metadata, bulk reads, history.
///
/// **Interaction**: registered via `ConnectorRegistration` (kind control
/// system or archiver); consumed by the channel capabilities.
#[async_trait]
pub trait ControlSystemConnector: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ConnectorKind;

    async fn read_channel(&self, channel: &str) -> Result<f64, ConnectorError>;

    async fn write_channel(&self, channel: &str, value: f64) -> Result<(), ConnectorError>;

    /// Free-form channel metadata (units, limits, description).
    async fn channel_metadata(
        &self,
        channel: &str,
    ) -> Result<serde_json::Value, ConnectorError>;

    /// Subscribes to value updates for a channel. The stream ends when the
    /// connector drops the subscription.
    async fn subscribe(
        &self,
        channel: &str,
    ) -> Result<tokio::sync::mpsc::Receiver<f64>, ConnectorError>;

    /// Reads several channels; result order matches the request order.
    async fn bulk_read(&self, channels: &[String]) -> Result<Vec<f64>, ConnectorError> {
        let mut out = Vec::with_capacity(channels.len());
        for channel in channels {
            out.push(self.read_channel(channel).await?);
        }
        Ok(out)
    }

    /// Historical data for a channel over `[start, end]` (ISO-8601).
    async fn get_data(
        &self,
        channel: &str,
        start: &str,
        end: &str,
    ) -> Result<TimeSeries, ConnectorError>;
}

/// In-memory connector for tests and examples.
///
/// Seeded with channel values; writes are applied and recorded so tests can
/// assert on them. `get_data` synthesizes a short ramp ending at the current
/// value.
pub struct MockConnector {
    values: Mutex<BTreeMap<String, f64>>,
    writes: Mutex<Vec<(String, f64)>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(BTreeMap::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_channel(self, channel: impl Into<String>, value: f64) -> Self {
        self.values.lock().unwrap().insert(channel.into(), value);
        self
    }

    /// Writes recorded so far, in order.
    pub fn recorded_writes(&self) -> Vec<(String, f64)> {
        self.writes.lock().unwrap().clone()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlSystemConnector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::ControlSystem
    }

    async fn read_channel(&self, channel: &str) -> Result<f64, ConnectorError> {
        self.values
            .lock()
            .unwrap()
            .get(channel)
            .copied()
            .ok_or_else(|| ConnectorError::NotFound(channel.to_string()))
    }

    async fn write_channel(&self, channel: &str, value: f64) -> Result<(), ConnectorError> {
        if !value.is_finite() {
            return Err(ConnectorError::InvalidValue {
                channel: channel.to_string(),
                message: "value must be finite".into(),
            });
        }
        let mut values = self.values.lock().unwrap();
        if !values.contains_key(channel) {
            return Err(ConnectorError::NotFound(channel.to_string()));
        }
        values.insert(channel.to_string(), value);
        self.writes.lock().unwrap().push((channel.to_string(), value));
        Ok(())
    }

    async fn channel_metadata(
        &self,
        channel: &str,
    ) -> Result<serde_json::Value, ConnectorError> {
        if !self.values.lock().unwrap().contains_key(channel) {
            return Err(ConnectorError::NotFound(channel.to_string()));
        }
        Ok(serde_json::json!({"channel": channel, "units": "a.u."}))
    }

    async fn subscribe(
        &self,
        channel: &str,
    ) -> Result<tokio::sync::mpsc::Receiver<f64>, ConnectorError> {
        let current = self.read_channel(channel).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        // One update with the present value, then the stream ends.
        let _ = tx.send(current).await;
        Ok(rx)
    }

    async fn get_data(
        &self,
        channel: &str,
        start: &str,
        end: &str,
    ) -> Result<TimeSeries, ConnectorError> {
        let current = self.read_channel(channel).await?;
        // Synthetic five-point ramp between the requested bounds.
        let points = (0..5)
            .map(|i| {
                let ts = if i == 0 {
                    start.to_string()
                } else if i == 4 {
                    end.to_string()
                } else {
                    format!("{}+{}", start, i)
                };
                (ts, current - (4 - i) as f64 * 0.1)
            })
            .collect();
        Ok(TimeSeries {
            channel: channel.to_string(),
            points,
        })
    }
}
