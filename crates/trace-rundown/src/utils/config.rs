//! Configuration and constants for the engine and CLI.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Version tag written into enhanced trace metadata
pub const ENHANCED_TRACE_VERSION: &str = "1";

/// Execution context id used until the backfill pass resolves it
pub const UNRESOLVED_CONTEXT_ID: i64 = -1;

// Trace categories carrying the rundown data
pub const TARGET_RUNDOWN_CATEGORY: &str = "disabled-by-default-devtools.target-rundown";
pub const SCRIPT_RUNDOWN_CATEGORY: &str = "disabled-by-default-devtools.v8-source-rundown";
pub const SCRIPT_SOURCE_CATEGORY: &str = "disabled-by-default-devtools.v8-source-rundown-sources";

// Event names for the auction worklet metadata
pub const WORKLET_RUNNING_EVENT: &str = "AuctionWorkletRunningInProcess";
pub const WORKLET_DONE_EVENT: &str = "AuctionWorkletDoneWithProcess";
pub const THREAD_NAME_EVENT: &str = "thread_name";
pub const METADATA_PHASE: &str = "M";

pub const UTILITY_THREAD_NAME: &str = "auction_worklet.CrUtilityMain";
pub const V8_HELPER_THREAD_NAME: &str = "AuctionV8HelperThread";

/// Upper bound on `splitCount`; larger values are treated as malformed
pub const MAX_SPLIT_COUNT: usize = 65_536;

// Field names holding the event array (different producers use different names)
pub const TRACE_EVENTS_FIELD_NAMES: &[&str] = &["traceEvents", "events"];
pub const PAYLOAD_FIELD_NAME: &str = "payload";

/// Tunables for the correlation engine.
///
/// Every field has a default, so an empty TOML file is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `thread_name` value identifying a worklet's control thread
    pub utility_thread_name: String,

    /// `thread_name` value identifying the thread running the worklet itself
    pub v8_helper_thread_name: String,

    /// Largest fragment count accepted for a split script source
    pub max_split_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            utility_thread_name: UTILITY_THREAD_NAME.to_string(),
            v8_helper_thread_name: V8_HELPER_THREAD_NAME.to_string(),
            max_split_count: MAX_SPLIT_COUNT,
        }
    }
}

impl EngineConfig {
    /// Check the values a TOML file could have set to something unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.utility_thread_name.is_empty() {
            return Err(ConfigError::Invalid(
                "utility_thread_name cannot be empty".to_string(),
            ));
        }

        if self.v8_helper_thread_name.is_empty() {
            return Err(ConfigError::Invalid(
                "v8_helper_thread_name cannot be empty".to_string(),
            ));
        }

        if self.utility_thread_name == self.v8_helper_thread_name {
            return Err(ConfigError::Invalid(
                "utility and v8 helper thread names must differ".to_string(),
            ));
        }

        if self.max_split_count == 0 {
            return Err(ConfigError::Invalid(
                "max_split_count must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load engine configuration from a TOML file
///
/// # Errors
/// * `ConfigError::ReadFailed` - If file cannot be read
/// * `ConfigError::ParseFailed` - If TOML is invalid
/// * `ConfigError::Invalid` - If a value fails validation
///
/// # Example
/// ```ignore
/// let config = load_config("trace-rundown.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
