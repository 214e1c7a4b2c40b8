// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Strategy;

/// Command-line arguments for `taskdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskdag",
    version,
    about = "Optimize and execute a task graph described in a TOML file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph file (TOML).
    #[arg(long, value_name = "PATH")]
    pub graph: String,

    /// Output key to compute. May be repeated.
    ///
    /// Defaults to the `outputs = [...]` list of the graph file.
    #[arg(long = "output", short = 'o', value_name = "KEY")]
    pub outputs: Vec<String>,

    /// Separate engine config file (TOML). Replaces the `[engine]` and
    /// `[optimize]` sections of the graph file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Execution strategy (sync or threaded).
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<Strategy>,

    /// Number of workers for the threaded strategy.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Abort at the first failing task.
    #[arg(long)]
    pub fail_fast: bool,

    /// Skip every optimization pass.
    #[arg(long)]
    pub no_optimize: bool,

    /// Print the optimized graph, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
