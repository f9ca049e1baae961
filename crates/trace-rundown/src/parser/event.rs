//! Raw trace event records as delivered by the capture host.
//!
//! A `RawEvent` is deliberately loose: only the envelope fields are typed,
//! the category-specific payload stays a `serde_json::Value` until the
//! classifier decodes it.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One event from a trace, as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Category tag (e.g. "disabled-by-default-devtools.target-rundown")
    #[serde(default)]
    pub cat: String,

    /// Event name
    #[serde(default)]
    pub name: String,

    /// Phase ("M" for metadata, "I" for instant, ...)
    #[serde(default)]
    pub ph: String,

    /// Process that emitted the event
    #[serde(default)]
    pub pid: u64,

    /// Thread that emitted the event
    #[serde(default)]
    pub tid: u64,

    /// Timestamp in microseconds
    #[serde(default)]
    pub ts: f64,

    /// Category-specific arguments, usually `{ "data": { ... } }`
    #[serde(default)]
    pub args: Value,
}

impl RawEvent {
    /// The nested `args.data` payload, if present and non-null
    pub fn data(&self) -> Option<&Value> {
        self.args.get("data").filter(|data| !data.is_null())
    }
}

/// Accept a JSON string or number and keep it as a string.
///
/// Isolate ids show up both ways depending on the producer.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

/// Accept an unsigned integer given as a JSON number or a decimal string
pub(crate) fn u64_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, found {}", n))),
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|e| D::Error::custom(format!("invalid integer '{}': {}", s, e))),
        other => Err(D::Error::custom(format!(
            "expected number or string, found {}",
            other
        ))),
    }
}

/// A field that must be present but may be null
pub(crate) fn required_nullable_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}
