//! Command Line Interface (CLI) arguments.

use clap::Parser;

/// SIMPL pipeline runner command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// Path to the pipeline JSON document to run
    #[arg(env = "SIMPL_PIPELINE_FILE")]
    pub pipeline: String,
    /// Only preflight the pipeline. Nothing is executed.
    #[arg(long, default_value_t = false, env = "SIMPL_PIPELINE_PREFLIGHT_ONLY")]
    pub preflight_only: bool,
    /// Number of threads available to parallel filters. Defaults to one per CPU.
    #[arg(long, env = "SIMPL_PIPELINE_THREADS")]
    pub threads: Option<usize>,
    /// Path of a JSON file to write the montages of the resulting structure to
    #[arg(long, env = "SIMPL_PIPELINE_MONTAGE_RECORD")]
    pub montage_record: Option<String>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
