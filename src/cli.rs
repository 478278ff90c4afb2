// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `rundag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rundag",
    version,
    about = "Run a DAG of commands in dependency order on a pool of workers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the manifest (TOML).
    #[arg(long, value_name = "PATH", default_value = "rundag.toml")]
    pub manifest: String,

    /// Nodes to run (glob, `tag:<t>`, `+X`, `X+`, `N+X`, `X+N`, `@X`).
    ///
    /// May be repeated; the union is taken. Default: every node.
    #[arg(long, short = 's', value_name = "SELECTOR", num_args = 1..)]
    pub select: Vec<String>,

    /// Nodes to leave out, same syntax as `--select`.
    #[arg(long, value_name = "SELECTOR", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Worker threads; overrides `[config].threads`.
    #[arg(long, short = 't', value_name = "N")]
    pub threads: Option<usize>,

    /// Stop starting new nodes after the first failure; overrides
    /// `[config].fail_fast`.
    #[arg(long)]
    pub fail_fast: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the manifest and print the plan by level without running
    /// anything.
    #[arg(long)]
    pub dry_run: bool,
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
