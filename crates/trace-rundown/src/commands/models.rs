use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to the recorded trace (JSON)
    pub input: PathBuf,

    /// Output path for the JSON model
    pub output_json: PathBuf,

    /// Output path for an enhanced trace (optional)
    pub output_enhanced: Option<PathBuf>,

    /// Engine configuration file (TOML, optional)
    pub config: Option<PathBuf>,

    /// Keep reassembled script source text in the outputs
    pub include_sources: bool,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_json: PathBuf::from("model.json"),
            output_enhanced: None,
            config: None,
            include_sources: true,
            print_summary: false,
        }
    }
}
