//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! Individual malformed events are never errors: the classifier drops them.
//! Only top-level input failures and invariant violations surface here.

use thiserror::Error;

/// Errors that can occur while decoding a whole trace
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid trace format: {0}")]
    InvalidFormat(String),
}

/// Invariant violations inside a model that must hold unique keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("cannot insert, already exists: {kind} id = {key}")]
    DuplicateKey { kind: &'static str, key: String },
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Invalid model: {0}")]
    InvalidModel(#[from] ModelError),
}

/// Errors that can occur while loading engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[from] std::io::Error),

    #[error("Config TOML parse error: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
