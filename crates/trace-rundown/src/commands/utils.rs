use crate::output::read_model;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Validate a model JSON file
///
/// Loading rebuilds the uniqueness registries, so a file with two targets,
/// contexts, scripts or worklets under one key is rejected.
pub fn validate_model_file(file_path: PathBuf) -> Result<()> {
    println!("Validating model: {}", file_path.display());

    let model = read_model(&file_path)
        .with_context(|| format!("Invalid model file: {}", file_path.display()))?;

    println!("✓ Valid model JSON");
    println!("  Targets: {}", model.targets().len());
    println!("  Execution Contexts: {}", model.execution_contexts().len());
    println!("  Scripts: {}", model.scripts().len());
    println!("  Worklets: {}", model.worklets().len());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Trace Rundown Model Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  targets: array             - Frames, workers and other targets");
        println!("    targetId: string         - Target token");
        println!("    type: string             - Target kind (e.g. 'frame')");
        println!("    isolate: string          - Isolate the target runs in");
        println!("    pid: number              - Owning process");
        println!("    url: string              - Target URL");
        println!("  executionContexts: array   - One per V8 context token");
        println!("    id: number               - Numeric context id (-1 if unresolved)");
        println!("    origin: string           - Security origin");
        println!("    v8Context: string        - Context token");
        println!("    auxData: object?         - frameId, isDefault, type");
        println!("    isolate: string          - Isolate the context lives in");
        println!("  scripts: array             - One per (scriptId, isolate)");
        println!("    scriptId: number         - Isolate-scoped script id");
        println!("    executionContextId: number");
        println!("    url, hash, isModule, hasSourceUrl, sourceMapUrl?");
        println!("    startLine, startColumn, endLine, endColumn");
        println!("    length: number?          - Source length (UTF-16 units)");
        println!("    sourceText: string?      - Reassembled source");
        println!("    auxData: object?         - Copied from the owning context");
        println!("  worklets: array            - Auction worklet lifecycles");
        println!("    target, host, pid, type, utilityThread, v8HelperThread");
        println!("    runningInProcessEvent?, doneWithProcessEvent?");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Trace Rundown v{}", env!("CARGO_PKG_VERSION"));
    println!("Model Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Reconstructs targets, execution contexts, scripts and auction worklets");
    println!("from browser performance traces.");
}
