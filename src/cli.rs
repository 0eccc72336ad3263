// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetgen`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetgen",
    version,
    about = "Watch a project's asset tree and regenerate sidecar metadata files.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Assetgen.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Assetgen.toml")]
    pub config: String,

    /// Regenerate all metadata for the project in one compiler run, then
    /// exit. The exit code reflects the compiler's success.
    #[arg(long)]
    pub regenerate_all: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETGEN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the effective configuration, but don't watch
    /// or execute anything.
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
