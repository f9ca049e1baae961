//! Enhanced trace export.
//!
//! An enhanced trace is the reconstructed model with the original trace
//! attached under `payload`, so one file carries both the events and the
//! targets, contexts and scripts needed to rehydrate them later.

use super::json::write_json_pretty;
use crate::parser::schema::{ExecutionContext, OutputModel, Script, Target};
use crate::utils::config::ENHANCED_TRACE_VERSION;
use crate::utils::error::OutputError;
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedTracesMetadata {
    pub version: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedTrace {
    pub enhanced_traces_metadata: EnhancedTracesMetadata,
    pub targets: Vec<Target>,
    pub execution_contexts: Vec<ExecutionContext>,
    pub scripts: Vec<Script>,

    /// `{ traceEvents, metadata? }` from the source trace, if attached
    pub payload: Option<Value>,
}

/// Combine a model with the trace it was built from
///
/// **Public** - used by the analyze command
pub fn to_enhanced_trace(model: &OutputModel, payload: Option<Value>) -> EnhancedTrace {
    EnhancedTrace {
        enhanced_traces_metadata: EnhancedTracesMetadata {
            version: ENHANCED_TRACE_VERSION.to_string(),
            generated_at: Utc::now().to_rfc3339(),
        },
        targets: model.targets().to_vec(),
        execution_contexts: model.execution_contexts().to_vec(),
        scripts: model.scripts().to_vec(),
        payload,
    }
}

/// Write an enhanced trace to a JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_enhanced_trace(
    trace: &EnhancedTrace,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing enhanced trace to: {}", output_path.display());
    write_json_pretty(trace, output_path)
}
