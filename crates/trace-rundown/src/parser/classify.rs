//! Event classification.
//!
//! Decodes a `RawEvent` into one of the event kinds the engine consumes.
//! Every decode is total: a wrong category, a missing payload or a missing
//! required field all yield `None`, never a panic or an error.

use super::event::{required_nullable_string, string_or_number, u64_from_number_or_string, RawEvent};
use super::schema::{ThreadDescriptor, WorkletProcessData, WorkletProcessEvent};
use crate::utils::config::{
    METADATA_PHASE, SCRIPT_RUNDOWN_CATEGORY, SCRIPT_SOURCE_CATEGORY, TARGET_RUNDOWN_CATEGORY,
    THREAD_NAME_EVENT, WORKLET_DONE_EVENT, WORKLET_RUNNING_EVENT,
};
use log::trace;
use serde::Deserialize;

/// Payload of a target rundown event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRundownData {
    pub frame: String,
    pub frame_type: String,
    pub url: String,

    #[serde(deserialize_with = "string_or_number")]
    pub isolate: String,

    #[serde(rename = "v8context")]
    pub v8_context: String,

    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub script_id: u64,

    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default)]
    pub is_default: Option<bool>,

    #[serde(default)]
    pub context_type: Option<String>,
}

/// Payload of a script rundown event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRundownData {
    #[serde(deserialize_with = "string_or_number")]
    pub isolate: String,

    pub execution_context_id: i64,

    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub script_id: u64,

    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub hash: String,
    pub is_module: bool,
    pub has_source_url: bool,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub source_map_url: Option<String>,
}

/// Payload of a script source event, whole or one fragment of a split
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSourceData {
    #[serde(deserialize_with = "string_or_number")]
    pub isolate: String,

    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub script_id: u64,

    #[serde(deserialize_with = "required_nullable_string")]
    pub source_text: Option<String>,

    #[serde(default)]
    pub length: Option<u64>,

    #[serde(default)]
    pub split_index: Option<usize>,

    #[serde(default)]
    pub split_count: Option<usize>,
}

/// How a script source event carries its text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// The full text in one event
    Whole { length: Option<u64> },
    /// Fragment `index` of `count`
    Split { index: usize, count: usize },
}

impl ScriptSourceData {
    /// Split mode needs both split fields; anything else is a whole value.
    ///
    /// Returns `None` for a split descriptor that cannot address a slot.
    pub fn mode(&self) -> Option<SourceMode> {
        match (self.split_index, self.split_count) {
            (Some(index), Some(count)) if count > 0 && index < count => {
                Some(SourceMode::Split { index, count })
            }
            (Some(_), Some(_)) => None,
            _ => Some(SourceMode::Whole {
                length: self.length,
            }),
        }
    }
}

#[derive(Deserialize)]
struct ThreadNameArgs {
    name: String,
}

/// A classified event, ready for the engine
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEventKind {
    /// A target rundown; `pid` is the emitting process
    TargetRundown { pid: u64, data: TargetRundownData },
    ScriptRundown(ScriptRundownData),
    ScriptSource {
        data: ScriptSourceData,
        mode: SourceMode,
    },
    WorkletRunning(WorkletProcessEvent),
    WorkletDone(WorkletProcessEvent),
    ThreadName(ThreadDescriptor),
}

impl TraceEventKind {
    /// Short label used in logs and statistics
    pub fn label(&self) -> &'static str {
        match self {
            Self::TargetRundown { .. } => "target_rundown",
            Self::ScriptRundown(_) => "script_rundown",
            Self::ScriptSource { .. } => "script_source",
            Self::WorkletRunning(_) => "worklet_running",
            Self::WorkletDone(_) => "worklet_done",
            Self::ThreadName(_) => "thread_name",
        }
    }
}

/// Classify a raw event
///
/// **Public** - main entry point for classification
///
/// # Returns
/// The decoded kind, or `None` for unrecognized or malformed events
pub fn classify(event: &RawEvent) -> Option<TraceEventKind> {
    match event.cat.as_str() {
        TARGET_RUNDOWN_CATEGORY => decode_target_rundown(event),
        SCRIPT_RUNDOWN_CATEGORY => decode_script_rundown(event).map(TraceEventKind::ScriptRundown),
        SCRIPT_SOURCE_CATEGORY => decode_script_source(event),
        _ => match event.name.as_str() {
            WORKLET_RUNNING_EVENT => decode_worklet_event(event).map(TraceEventKind::WorkletRunning),
            WORKLET_DONE_EVENT => decode_worklet_event(event).map(TraceEventKind::WorkletDone),
            THREAD_NAME_EVENT => decode_thread_name(event).map(TraceEventKind::ThreadName),
            _ => None,
        },
    }
}

pub fn is_target_rundown(event: &RawEvent) -> bool {
    event.cat == TARGET_RUNDOWN_CATEGORY && decode_target_rundown(event).is_some()
}

pub fn is_script_rundown(event: &RawEvent) -> bool {
    event.cat == SCRIPT_RUNDOWN_CATEGORY && decode_script_rundown(event).is_some()
}

pub fn is_script_source(event: &RawEvent) -> bool {
    event.cat == SCRIPT_SOURCE_CATEGORY && decode_script_source(event).is_some()
}

pub fn is_worklet_running(event: &RawEvent) -> bool {
    event.name == WORKLET_RUNNING_EVENT && decode_worklet_event(event).is_some()
}

pub fn is_worklet_done(event: &RawEvent) -> bool {
    event.name == WORKLET_DONE_EVENT && decode_worklet_event(event).is_some()
}

pub fn is_thread_name(event: &RawEvent) -> bool {
    event.name == THREAD_NAME_EVENT && decode_thread_name(event).is_some()
}

/// Decode `args.data` into `T`, or `None` if absent or wrong-shaped
fn decode_data<'a, T: Deserialize<'a>>(event: &'a RawEvent) -> Option<T> {
    let data = event.data()?;
    match T::deserialize(data) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            trace!("Dropping '{}' event ({}): {}", event.name, event.cat, e);
            None
        }
    }
}

fn decode_target_rundown(event: &RawEvent) -> Option<TraceEventKind> {
    let data = decode_data::<TargetRundownData>(event)?;
    Some(TraceEventKind::TargetRundown {
        pid: event.pid,
        data,
    })
}

fn decode_script_rundown(event: &RawEvent) -> Option<ScriptRundownData> {
    decode_data(event)
}

fn decode_script_source(event: &RawEvent) -> Option<TraceEventKind> {
    let data = decode_data::<ScriptSourceData>(event)?;
    let mode = data.mode()?;
    Some(TraceEventKind::ScriptSource { data, mode })
}

fn decode_worklet_event(event: &RawEvent) -> Option<WorkletProcessEvent> {
    let data = decode_data::<WorkletProcessData>(event)?;
    Some(WorkletProcessEvent {
        cat: event.cat.clone(),
        pid: event.pid,
        tid: event.tid,
        ts: event.ts,
        data,
    })
}

fn decode_thread_name(event: &RawEvent) -> Option<ThreadDescriptor> {
    if event.ph != METADATA_PHASE {
        return None;
    }
    let args = ThreadNameArgs::deserialize(&event.args).ok()?;
    Some(ThreadDescriptor {
        pid: event.pid,
        tid: event.tid,
        name: args.name,
    })
}
