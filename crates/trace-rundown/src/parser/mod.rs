//! Trace decoding, event classification and schema definitions.
//!
//! This module handles:
//! - Decoding whole trace documents into raw events
//! - Classifying raw events into the kinds the engine consumes
//! - Defining the output schema

pub mod classify;
pub mod event;
pub mod schema;
pub mod trace;

// Re-export main types
pub use classify::{classify, SourceMode, TraceEventKind};
pub use event::RawEvent;
pub use schema::{
    ExecutionContext, ExecutionContextAuxData, ModelParts, OutputModel, Script, Target,
    TargetGroup, ThreadDescriptor, WorkletLifecycle, WorkletProcessData, WorkletProcessEvent,
    WorkletType,
};
pub use trace::{normalize_payload, parse_trace_events, parse_trace_str, ParsedTrace};
