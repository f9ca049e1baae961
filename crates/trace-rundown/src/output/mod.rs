//! Output writers for reconstructed models.
//!
//! This module handles writing data to disk in various formats:
//! - JSON models
//! - Enhanced traces (model plus the original events)
//! - Text summaries

pub mod enhanced;
pub mod json;
pub mod summary;

// Re-export main functions
pub use enhanced::{to_enhanced_trace, write_enhanced_trace, EnhancedTrace, EnhancedTracesMetadata};
pub use json::{model_to_string, read_model, write_json_pretty, write_model};
pub use summary::render_terminal_summary;

use crate::utils::error::OutputError;
use std::path::Path;

/// Common path validation for output files
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}
