// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{OutputFormat, parse_timeout};

/// Command-line arguments for `procrelay`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procrelay",
    version,
    about = "Run a long-running engine process and relay its output line by line.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Procrelay.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCRELAY_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// How to print the event stream: `plain` or `json` (one event per line).
    #[arg(long, global = true, value_name = "FORMAT", default_value = "plain")]
    pub format: OutputFormat,

    /// Resolve and print the invocation, but don't start anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run an arbitrary program and stream its output.
    Exec(ExecArgs),
    /// Run the engine: `<executable> run --config <dir> --configname <name>`.
    Engine(EngineArgs),
    /// Run a helper script to completion and print what it wrote to stdout.
    Script(ScriptArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    /// Working directory for the child.
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Kill the child after this long (e.g. `90s`, `30m`).
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Program followed by its arguments.
    #[arg(
        value_name = "PROGRAM",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// Engine executable; falls back to `[engine].executable`.
    #[arg(long, value_name = "PATH")]
    pub executable: Option<PathBuf>,

    /// Directory holding engine configs, as seen from the engine's directory;
    /// falls back to `[engine].config_dir`.
    #[arg(long, value_name = "DIR")]
    pub engine_config: Option<PathBuf>,

    /// Name of the config file inside `--engine-config`.
    #[arg(long, value_name = "NAME")]
    pub config_name: String,

    /// Override the working directory (default: the executable's directory).
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Args)]
pub struct ScriptArgs {
    /// Interpreter to run the script with; falls back to `[script].interpreter`.
    #[arg(long, value_name = "BIN")]
    pub interpreter: Option<String>,

    #[arg(long, value_name = "DURATION", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Script path.
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Parameters passed to the script.
    #[arg(value_name = "PARAM", trailing_var_arg = true, allow_hyphen_values = true)]
    pub params: Vec<String>,
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
