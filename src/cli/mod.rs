//! CLI module for Verdict
//!
//! Command-line interface definitions and handlers for the consensus engine.
//!
//! # Commands
//!
//! - `evaluate` - Evaluate content against the configured backends
//! - `backends` - Inspect configured backends
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Evaluate a string with the default strategy
//! verdict evaluate "some model output"
//!
//! # Cheapest-first cascade over two backends, JSON output
//! verdict evaluate --file answer.txt --strategy cascading \
//!     --backend local-classifier --backend hosted-moderation --json
//!
//! # Generate shell completions
//! verdict completions bash > ~/.bash_completion.d/verdict
//! ```

pub mod backends;
pub mod completions;
pub mod config;
pub mod evaluate;
pub mod output;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::consensus::ConsensusStrategy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Verdict - multi-backend consensus engine
#[derive(Parser, Debug)]
#[command(
    name = "verdict",
    version,
    about = "Multi-backend consensus engine for content risk assessment"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate content against the configured backends
    Evaluate(EvaluateArgs),
    /// Inspect backends
    #[command(subcommand)]
    Backends(BackendsCommands),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Content to evaluate
    #[arg(conflicts_with = "file")]
    pub content: Option<String>,

    /// Read content from a file instead
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Consensus strategy (majority, weighted, unanimous, threshold, cascading)
    #[arg(short, long)]
    pub strategy: Option<ConsensusStrategy>,

    /// Restrict evaluation to this backend (repeatable)
    #[arg(short, long = "backend")]
    pub backends: Vec<String>,

    /// Confidence needed by threshold and cascading to stop early
    #[arg(long, value_parser = parse_unit_interval)]
    pub confidence_threshold: Option<f64>,

    /// Aggregate risk at or above which weighted and cascading flag
    #[arg(long, value_parser = parse_unit_interval)]
    pub risk_threshold: Option<f64>,

    /// Minimum number of successful verdicts
    #[arg(long)]
    pub min_quorum: Option<usize>,

    /// Overall deadline in milliseconds
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "verdict.toml")]
    pub config: PathBuf,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "VERDICT_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum BackendsCommands {
    /// List configured backends
    List(BackendsListArgs),
}

#[derive(Args, Debug)]
pub struct BackendsListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show enabled backends only
    #[arg(long)]
    pub enabled_only: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "verdict.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "verdict.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Parse a threshold in [0, 1]; NaN and infinities are rejected.
fn parse_unit_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("must be between 0 and 1, got {}", s))
    }
}
