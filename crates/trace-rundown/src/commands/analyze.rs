//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Loads the engine configuration
//! 2. Reads and decodes the recorded trace
//! 3. Ingests every event into a correlation engine
//! 4. Finalizes the model
//! 5. Writes the JSON model and, optionally, an enhanced trace

use crate::aggregator::CorrelationEngine;
use crate::commands::models::AnalyzeArgs;
use crate::output::{render_terminal_summary, to_enhanced_trace, write_enhanced_trace, write_model};
use crate::parser::{normalize_payload, OutputModel};
use crate::utils::config::{load_config, EngineConfig};
use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Config file unreadable or invalid
/// * Trace file unreadable or not a trace document
/// * File write errors
///
/// # Example
/// ```ignore
/// let args = AnalyzeArgs {
///     input: PathBuf::from("trace.json"),
///     output_json: PathBuf::from("model.json"),
///     ..AnalyzeArgs::default()
/// };
///
/// execute_analyze(args)?;
/// ```
pub fn execute_analyze(args: AnalyzeArgs) -> Result<OutputModel> {
    let start_time = Instant::now();

    info!("Analyzing trace: {}", args.input.display());

    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    debug!("Engine config: {:?}", config);

    let raw_trace = read_trace(&args.input)?;

    let mut engine = CorrelationEngine::with_config(config);
    let count = engine
        .ingest_json(&raw_trace)
        .context("Failed to decode trace events")?;
    info!("Ingested {} events", count);

    let mut model = engine.finalize();
    if !args.include_sources {
        debug!("Stripping script source text");
        model = model.without_source_text();
    }

    info!(
        "Reconstructed {} targets, {} execution contexts, {} scripts, {} worklets",
        model.targets().len(),
        model.execution_contexts().len(),
        model.scripts().len(),
        model.worklets().len()
    );

    write_outputs(&args, &model, &raw_trace)?;

    if args.print_summary {
        println!("{}", render_terminal_summary(&model, engine.stats()));
    }

    info!(
        "Analysis completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(model)
}

/// Read a trace file into a JSON value
///
/// **Private** - internal helper for execute_analyze
fn read_trace(path: &Path) -> Result<Value> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open trace file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Trace file is not valid JSON: {}", path.display()))
}

/// Write output files (JSON model and optional enhanced trace).
///
/// **Private** - internal helper for execute_analyze
fn write_outputs(args: &AnalyzeArgs, model: &OutputModel, raw_trace: &Value) -> Result<()> {
    info!("Writing output files...");

    write_model(model, &args.output_json).context("Failed to write model JSON")?;
    info!("✓ Model written to: {}", args.output_json.display());

    if let Some(enhanced_path) = &args.output_enhanced {
        let payload = normalize_payload(raw_trace).context("Failed to extract trace payload")?;
        let enhanced = to_enhanced_trace(model, Some(payload));
        write_enhanced_trace(&enhanced, enhanced_path)
            .context("Failed to write enhanced trace")?;
        info!("✓ Enhanced trace written to: {}", enhanced_path.display());
    }

    Ok(())
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Input trace path cannot be empty");
    }

    if !args.input.is_file() {
        anyhow::bail!("Input trace not found: {}", args.input.display());
    }

    if args.output_json.as_os_str().is_empty() {
        anyhow::bail!("Output path cannot be empty");
    }

    if args.output_json == args.input {
        anyhow::bail!("Output path would overwrite the input trace");
    }

    if let Some(enhanced) = &args.output_enhanced {
        if enhanced == &args.output_json {
            anyhow::bail!("Enhanced trace and model cannot share an output path");
        }
        if enhanced == &args.input {
            anyhow::bail!("Enhanced trace path would overwrite the input trace");
        }
    }

    if let Some(config) = &args.config {
        if !config.is_file() {
            anyhow::bail!("Config file not found: {}", config.display());
        }
    }

    Ok(())
}
