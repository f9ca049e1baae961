//! Correlation of classified events into the output model.
//!
//! This module handles:
//! - Reassembling values split across events
//! - Correlating entities by compound keys
//! - Pairing auction worklet halves
//! - The two-pass engine tying them together

pub mod engine;
pub mod index;
pub mod reassembler;
pub mod registry;
pub mod worklets;

// Re-export main types
pub use engine::{CorrelationEngine, IngestStats};
pub use index::{ContextKey, KeyedCorrelationIndex, ScriptKey};
pub use reassembler::{ReassembledValue, SplitValueReassembler};
pub use registry::UniqueRegistry;
pub use worklets::WorkletTracker;
