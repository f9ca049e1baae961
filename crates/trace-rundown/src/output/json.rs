//! JSON model output writer.
//!
//! Writes OutputModel (and any other serializable report) to JSON files
//! with proper formatting.

use crate::parser::schema::{ModelParts, OutputModel};
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a model to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// let model = engine.finalize();
/// write_model(&model, "model.json")?;
/// ```
pub fn write_model(model: &OutputModel, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing model to: {}", output_path.display());
    write_json_pretty(model, output_path)
}

/// Serialize any value as pretty JSON, creating parent directories
///
/// **Public** - shared by the model and enhanced trace writers
pub fn write_json_pretty<T: Serialize>(
    value: &T,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    super::validate_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, value).map_err(OutputError::SerializationFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    debug!(
        "Wrote {} ({} bytes)",
        output_path.display(),
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Serialize a model to a JSON string (for tests or in-memory use)
pub fn model_to_string(model: &OutputModel) -> Result<String, OutputError> {
    serde_json::to_string_pretty(model).map_err(OutputError::SerializationFailed)
}

/// Calculate file size in bytes
///
/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Read a model from a JSON file
///
/// **Public** - useful for validation and testing
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
/// * `OutputError::InvalidModel` - Two entities of one kind share a key
pub fn read_model(input_path: impl AsRef<Path>) -> Result<OutputModel, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading model from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let parts: ModelParts =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    let model = OutputModel::from_parts(parts)?;

    debug!(
        "Model loaded: {} targets, {} scripts",
        model.targets().len(),
        model.scripts().len()
    );

    Ok(model)
}
