//! Top-level trace decoding.
//!
//! Accepts the shapes trace files come in and produces the flat event list
//! the engine consumes:
//! - a bare JSON array of events
//! - an object with a `traceEvents` (or `events`) array
//! - an enhanced trace, whose original events sit under `payload`

use super::event::RawEvent;
use crate::utils::config::{PAYLOAD_FIELD_NAME, TRACE_EVENTS_FIELD_NAMES};
use crate::utils::error::ParseError;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Decoded trace contents (internal representation)
#[derive(Debug, Clone, Default)]
pub struct ParsedTrace {
    pub events: Vec<RawEvent>,

    /// Elements of the event array that were not event objects
    pub dropped: usize,

    /// Top-level `metadata` object, kept for re-export
    pub metadata: Option<Value>,
}

/// Parse a whole trace document
///
/// **Public** - main entry point for trace decoding
///
/// # Errors
/// * `ParseError::InvalidFormat` - the document holds no event array
pub fn parse_trace_events(raw_trace: &Value) -> Result<ParsedTrace, ParseError> {
    let (events_array, metadata) = locate_events(raw_trace)?;
    let (events, dropped) = parse_events_array(events_array);

    debug!(
        "Decoded {} trace events ({} dropped)",
        events.len(),
        dropped
    );

    Ok(ParsedTrace {
        events,
        dropped,
        metadata: metadata.cloned(),
    })
}

/// Parse a trace document from a JSON string
///
/// # Errors
/// * `ParseError::JsonError` - the text is not JSON
/// * `ParseError::InvalidFormat` - the document holds no event array
pub fn parse_trace_str(contents: &str) -> Result<ParsedTrace, ParseError> {
    let raw_trace: Value = serde_json::from_str(contents)?;
    parse_trace_events(&raw_trace)
}

/// Normalize a trace document into a `{ traceEvents, metadata? }` payload
///
/// Unlike `parse_trace_events` the events are kept verbatim, including
/// fields the engine does not read, so the payload can be re-exported.
///
/// # Errors
/// * `ParseError::InvalidFormat` - the document holds no event array
pub fn normalize_payload(raw_trace: &Value) -> Result<Value, ParseError> {
    let (events_array, metadata) = locate_events(raw_trace)?;

    let mut payload = Map::new();
    payload.insert(
        TRACE_EVENTS_FIELD_NAMES[0].to_string(),
        Value::Array(events_array.to_vec()),
    );
    if let Some(metadata) = metadata {
        payload.insert("metadata".to_string(), metadata.clone());
    }

    Ok(Value::Object(payload))
}

/// Find the event array and any sibling metadata
///
/// **Private** - internal helper for parse_trace_events
fn locate_events(raw_trace: &Value) -> Result<(&[Value], Option<&Value>), ParseError> {
    match raw_trace {
        Value::Array(events) => Ok((events.as_slice(), None)),
        Value::Object(obj) => locate_in_object(obj),
        _ => Err(ParseError::InvalidFormat(
            "Trace must be a JSON object or array".to_string(),
        )),
    }
}

fn locate_in_object(obj: &Map<String, Value>) -> Result<(&[Value], Option<&Value>), ParseError> {
    for field in TRACE_EVENTS_FIELD_NAMES {
        if let Some(Value::Array(events)) = obj.get(*field) {
            return Ok((events.as_slice(), obj.get("metadata")));
        }
    }

    if let Some(Value::Object(payload)) = obj.get(PAYLOAD_FIELD_NAME) {
        debug!("Trace is an enhanced trace, reading events from its payload");
        return locate_in_object(payload);
    }

    Err(ParseError::InvalidFormat(format!(
        "Trace object has no event array (expected one of: {})",
        TRACE_EVENTS_FIELD_NAMES.join(", ")
    )))
}

/// Decode each element, skipping the ones that are not event objects
///
/// **Private** - internal parsing logic
fn parse_events_array(events_array: &[Value]) -> (Vec<RawEvent>, usize) {
    let mut events = Vec::with_capacity(events_array.len());
    let mut dropped = 0;

    for (index, event_value) in events_array.iter().enumerate() {
        match RawEvent::deserialize(event_value) {
            Ok(event) => events.push(event),
            Err(e) => {
                // Log but don't fail - the engine tolerates partial captures
                debug!("Skipping trace event {}: {}", index, e);
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        warn!(
            "{} of {} trace events could not be decoded",
            dropped,
            events_array.len()
        );
    }

    (events, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_array() {
        let parsed = parse_trace_events(&json!([{ "name": "a" }, { "name": "b" }])).unwrap();
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.dropped, 0);
        assert!(parsed.metadata.is_none());
    }

    #[test]
    fn test_object_with_metadata() {
        let parsed = parse_trace_events(&json!({
            "traceEvents": [{ "name": "a" }],
            "metadata": { "source": "DevTools" }
        }))
        .unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.metadata, Some(json!({ "source": "DevTools" })));
    }

    #[test]
    fn test_enhanced_trace_payload() {
        let parsed = parse_trace_events(&json!({
            "enhancedTracesMetadata": { "version": "1" },
            "targets": [],
            "payload": { "traceEvents": [{ "name": "a" }, { "name": "b" }] }
        }))
        .unwrap();
        assert_eq!(parsed.events.len(), 2);
    }

    #[test]
    fn test_non_objects_are_dropped() {
        let parsed = parse_trace_events(&json!([{ "name": "a" }, 5, "x", { "pid": "nope" }])).unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.dropped, 3);
    }

    #[test]
    fn test_scalar_top_level_is_rejected() {
        assert!(matches!(
            parse_trace_events(&json!(42)),
            Err(ParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_trace_events(&json!({ "other": [] })),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_normalize_payload_keeps_unknown_fields() {
        let payload = normalize_payload(&json!([{ "name": "a", "dur": 12, "s": "t" }])).unwrap();
        assert_eq!(
            payload,
            json!({ "traceEvents": [{ "name": "a", "dur": 12, "s": "t" }] })
        );

        let payload = normalize_payload(&json!({
            "payload": { "traceEvents": [], "metadata": { "k": 1 } }
        }))
        .unwrap();
        assert_eq!(payload, json!({ "traceEvents": [], "metadata": { "k": 1 } }));
    }

    #[test]
    fn test_invalid_json_text() {
        assert!(matches!(
            parse_trace_str("[{"),
            Err(ParseError::JsonError(_))
        ));
    }
}
