//! Trace Rundown library
//!
//! Reconstructs targets, execution contexts, scripts and auction worklet
//! lifecycles from the rundown events of a browser performance trace.
//!
//! ```ignore
//! let mut engine = CorrelationEngine::new();
//! engine.ingest_json(&trace)?;
//! let model = engine.finalize();
//! ```

pub mod aggregator;
pub mod commands;
pub mod output;
pub mod parser;
pub mod utils;

pub use aggregator::CorrelationEngine;
pub use parser::{OutputModel, RawEvent};
pub use utils::config::EngineConfig;
