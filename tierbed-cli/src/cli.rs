//! CLI argument parsing using clap derive API
//!
//! Purely declarative, no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// tierbed -- fixture lifecycle engine for tiered-storage tests.
///
/// Use `tierbed <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "tierbed", version, about, long_about = None)]
pub struct Cli {
    /// Path to the tierbed.toml configuration file.
    #[arg(short, long, global = true, default_value = "tierbed.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the configuration file.
    Validate,

    /// Print the names and scan patterns the plan would use.
    Names,

    /// Run setup and teardown against the in-memory backend.
    Simulate(SimulateArgs),
}

// ---- simulate ----

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Leave the fixtures in place instead of tearing them down.
    #[arg(long)]
    pub keep: bool,
}
