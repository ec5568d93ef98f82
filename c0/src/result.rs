//! Read-only view over a decoded result envelope

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::envelope::{ResultEnvelope, State};
use crate::id::CorrelationId;

/// A command result as returned by the executor
///
/// Accessors never mutate the envelope. `stdout`/`stderr` fall back to an
/// empty string when the executor sent no streams.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    payload: ResultEnvelope,
}

impl CommandResult {
    pub fn new(payload: ResultEnvelope) -> Self {
        Self { payload }
    }

    /// The raw envelope
    pub fn payload(&self) -> &ResultEnvelope {
        &self.payload
    }

    pub fn into_payload(self) -> ResultEnvelope {
        self.payload
    }

    pub fn id(&self) -> &CorrelationId {
        &self.payload.id
    }

    pub fn state(&self) -> &State {
        &self.payload.state
    }

    pub fn is_success(&self) -> bool {
        self.payload.state.is_success()
    }

    /// Data returned by the process
    ///
    /// Only present when the process emitted data at a level the executor
    /// forwards; callers must not assume it is set.
    pub fn data(&self) -> Option<&str> {
        self.payload.data.as_deref()
    }

    /// Message level of `data`, if any
    pub fn level(&self) -> Option<i64> {
        self.payload.level
    }

    /// Execution time in milliseconds
    pub fn time(&self) -> i64 {
        self.payload.time
    }

    /// Start time in epoch seconds, keeping sub-second precision
    pub fn starttime(&self) -> f64 {
        self.payload.starttime as f64 / 1000.0
    }

    /// Start time as a calendar timestamp
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.payload.starttime)
    }

    pub fn stdout(&self) -> &str {
        self.stream(0)
    }

    pub fn stderr(&self) -> &str {
        self.stream(1)
    }

    fn stream(&self, index: usize) -> &str {
        self.payload
            .streams
            .as_ref()
            .and_then(|streams| streams.get(index))
            .and_then(|s| s.as_deref())
            .unwrap_or("")
    }

    /// Decode `data` as JSON; absent data decodes as `null`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self.data() {
            Some(data) => serde_json::from_str(data),
            None => serde_json::from_value(Value::Null),
        }
    }
}

impl From<ResultEnvelope> for CommandResult {
    fn from(payload: ResultEnvelope) -> Self {
        Self::new(payload)
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "STATE: {}", self.state())?;
        writeln!(f, "STDOUT:")?;
        writeln!(f, "{}", self.stdout())?;
        writeln!(f, "STDERR:")?;
        writeln!(f, "{}", self.stderr())?;
        writeln!(f, "DATA:")?;
        writeln!(f, "{}", self.data().unwrap_or("None"))
    }
}
