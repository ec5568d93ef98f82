//! Correlation ID generation and result channel naming
//!
//! Every submitted command gets a fresh random (v4) UUID. The same ID names
//! the result channel the executor publishes into: `result:{id}`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of every result channel
pub const RESULT_CHANNEL_PREFIX: &str = "result:";

/// Generate a new correlation ID string
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Correlation ID wrapper for type-safe ID handling
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a fresh, statistically unique ID
    pub fn new() -> Self {
        Self(generate_id())
    }

    /// Create from an existing ID string (e.g. one returned by an executor)
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the full ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the result channel for this ID
    pub fn result_channel(&self) -> String {
        channel_for(RESULT_CHANNEL_PREFIX, &self.0)
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a result channel name from a prefix and an ID
///
/// Pure function of its inputs; there is no registry mapping IDs to channels.
pub fn channel_for(prefix: &str, id: &str) -> String {
    format!("{}{}", prefix, id)
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
