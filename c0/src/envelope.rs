//! Wire envelopes for commands and results
//!
//! Both envelopes are field-tagged JSON objects. Unknown fields are ignored on
//! decode so either side can grow new optional fields.
//!
//! ```text
//! command: {"id": "...", "command": "core.system", "arguments": {...}}
//! result:  {"id": "...", "state": "SUCCESS", "data": "...", "level": 20,
//!           "time": 5, "starttime": 1700000000000, "streams": ["out", "err"]}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::id::CorrelationId;

/// Command arguments: a JSON object of plain values
pub type Arguments = Map<String, Value>;

/// Convert a serializable value into command arguments
///
/// The value must serialize to a JSON object.
pub fn arguments_from<T: Serialize>(value: &T) -> Result<Arguments, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "arguments must be an object, got {}",
            other
        ))),
    }
}

/// Envelope pushed to the executor's input queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CorrelationId,
    pub command: String,
    #[serde(default)]
    pub arguments: Arguments,
}

impl Command {
    pub fn new(id: CorrelationId, command: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            id,
            command: command.into(),
            arguments,
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode from wire bytes (executor side)
    pub fn decode(queue: &str, bytes: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(bytes).map_err(|source| DecodeError {
            channel: queue.to_string(),
            source,
        })
    }
}

/// Exit state reported by the executor
///
/// Unknown states are kept verbatim in [`State::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum State {
    Success,
    Error,
    Timeout,
    Killed,
    UnknownCmd,
    DuplicateId,
    Other(String),
}

impl State {
    pub fn as_str(&self) -> &str {
        match self {
            State::Success => "SUCCESS",
            State::Error => "ERROR",
            State::Timeout => "TIMEOUT",
            State::Killed => "KILLED",
            State::UnknownCmd => "UNKNOWN_CMD",
            State::DuplicateId => "DUPLICATE_ID",
            State::Other(s) => s,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, State::Success)
    }
}

impl From<&str> for State {
    fn from(s: &str) -> Self {
        match s {
            "SUCCESS" => State::Success,
            "ERROR" => State::Error,
            "TIMEOUT" => State::Timeout,
            "KILLED" => State::Killed,
            "UNKNOWN_CMD" => State::UnknownCmd,
            "DUPLICATE_ID" => State::DuplicateId,
            other => State::Other(other.to_string()),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for State {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(State::from(s.as_str()))
    }
}

/// Envelope the executor publishes on `result:{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub id: CorrelationId,
    pub state: State,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
    /// Execution duration in milliseconds
    #[serde(default)]
    pub time: i64,
    /// Start time in epoch milliseconds
    #[serde(default)]
    pub starttime: i64,
    /// Index 0 is stdout, index 1 is stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streams: Option<Vec<Option<String>>>,
}

impl ResultEnvelope {
    /// Encode to wire bytes (executor side)
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a payload popped from `channel`
    pub fn decode(channel: &str, bytes: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(bytes).map_err(|source| DecodeError {
            channel: channel.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_command_wire_shape() {
        let cmd = Command::new(
            CorrelationId::from("abc"),
            "core.system",
            arguments_from(&json!({"name": "echo", "args": ["hi"]})).unwrap(),
        );
        let value: Value = serde_json::from_slice(&cmd.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"id": "abc", "command": "core.system", "arguments": {"name": "echo", "args": ["hi"]}})
        );
    }

    #[test]
    fn test_arguments_must_be_object() {
        assert!(arguments_from(&json!(["not", "an", "object"])).is_err());
        assert!(arguments_from(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_state_strings() {
        assert_eq!(State::from("SUCCESS"), State::Success);
        assert_eq!(State::from("DUPLICATE_ID"), State::DuplicateId);
        assert_eq!(State::from("PAUSED"), State::Other("PAUSED".to_string()));
        assert_eq!(State::Other("PAUSED".to_string()).as_str(), "PAUSED");
        assert!(State::Success.is_success());
        assert!(!State::Timeout.is_success());
    }

    #[test]
    fn test_decode_minimal_result() {
        let payload = br#"{"id": "x", "state": "ERROR", "data": "disk full"}"#;
        let result = ResultEnvelope::decode("result:x", payload).unwrap();
        assert_eq!(result.state, State::Error);
        assert_eq!(result.data.as_deref(), Some("disk full"));
        assert_eq!(result.level, None);
        assert_eq!(result.streams, None);
        assert_eq!(result.time, 0);
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let payload = br#"{"id": "x", "state": "SUCCESS", "gid": 1, "nid": 2, "tags": null}"#;
        let result = ResultEnvelope::decode("result:x", payload).unwrap();
        assert!(result.state.is_success());
    }

    #[test]
    fn test_decode_malformed_fails() {
        let err = ResultEnvelope::decode("result:x", b"{\"id\": ").unwrap_err();
        assert_eq!(err.channel, "result:x");

        // Structurally valid JSON missing required fields is malformed too
        assert!(ResultEnvelope::decode("result:x", br#"{"data": "x"}"#).is_err());
    }

    #[test]
    fn test_streams_with_nulls() {
        let payload = br#"{"id": "x", "state": "SUCCESS", "streams": [null, "err"]}"#;
        let result = ResultEnvelope::decode("result:x", payload).unwrap();
        assert_eq!(result.streams, Some(vec![None, Some("err".to_string())]));
    }

    fn state_strategy() -> impl Strategy<Value = State> {
        prop_oneof![
            Just(State::Success),
            Just(State::Error),
            Just(State::Timeout),
            Just(State::Killed),
            "[A-Z_]{8,12}".prop_map(|s| State::from(s.as_str())),
        ]
    }

    proptest! {
        #[test]
        fn result_envelope_round_trips(
            id in "[a-f0-9-]{1,36}",
            state in state_strategy(),
            data in proptest::option::of(".{0,32}"),
            level in proptest::option::of(0i64..100),
            time in 0i64..1_000_000,
            starttime in 0i64..2_000_000_000_000,
            streams in proptest::option::of(proptest::collection::vec(proptest::option::of(".{0,16}"), 0..3)),
        ) {
            let envelope = ResultEnvelope {
                id: CorrelationId::from(id),
                state,
                data,
                level,
                time,
                starttime,
                streams,
            };
            let bytes = envelope.encode().unwrap();
            let decoded = ResultEnvelope::decode("result:test", &bytes).unwrap();
            prop_assert_eq!(decoded, envelope);
        }

        #[test]
        fn command_round_trips(
            command in "[a-z]{1,8}\\.[a-z]{1,8}",
            key in "[a-z]{1,8}",
            value in ".{0,16}",
        ) {
            let mut arguments = Arguments::new();
            arguments.insert(key, Value::String(value));
            let cmd = Command::new(CorrelationId::new(), command, arguments);
            let decoded = Command::decode("core:default", &cmd.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded, cmd);
        }
    }
}
