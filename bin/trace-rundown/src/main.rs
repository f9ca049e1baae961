//! Trace Rundown CLI
//!
//! Rebuilds the targets, execution contexts, scripts and auction worklets
//! recorded in a browser performance trace.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use trace_rundown::commands::{
    display_schema, display_version, execute_analyze, validate_args, validate_model_file,
    AnalyzeArgs,
};

/// Trace Rundown - correlation of trace rundown events
#[derive(Parser, Debug)]
#[command(name = "trace-rundown")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconstruct a model from a recorded trace
    Analyze {
        /// Path to the trace JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for the JSON model (placed in artifacts/ by default)
        #[arg(short, long, default_value = "artifacts/model.json")]
        output: PathBuf,

        /// Also write an enhanced trace (model plus original events)
        #[arg(short, long, default_missing_value = "artifacts/enhanced-trace.json", num_args = 0..=1)]
        enhanced: Option<PathBuf>,

        /// Engine configuration file (TOML)
        #[arg(short, long, env = "TRACE_RUNDOWN_CONFIG")]
        config: Option<PathBuf>,

        /// Drop reassembled script source text from the outputs
        #[arg(long)]
        no_sources: bool,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate a model JSON file
    Validate {
        /// Path to model JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            input,
            mut output,
            mut enhanced,
            config,
            no_sources,
            summary,
        } => {
            // Ensure outputs go to artifacts/ if no directory is specified
            let artifacts_dir = PathBuf::from("artifacts");

            if output.parent().map(|p| p.as_os_str().is_empty()).unwrap_or(true) {
                output = artifacts_dir.join(output);
            }

            if let Some(ref mut path) = enhanced {
                if path.parent().map(|p| p.as_os_str().is_empty()).unwrap_or(true) {
                    *path = artifacts_dir.join(&path);
                }
            }

            let args = AnalyzeArgs {
                input,
                output_json: output,
                output_enhanced: enhanced,
                config,
                include_sources: !no_sources,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Validate { file } => {
            validate_model_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
