//! CLI argument definitions for the `atlas` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "atlas",
    version,
    about = "Malaria analog atlas - match US states to climate and economic analog countries",
    long_about = "Merge country and US state source tables, correlate country factors with \
                  malaria incidence and death rates, assign each state its nearest analog \
                  country, and extrapolate the expected malaria burden per state."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full analysis over a data directory.
    Run(RunArgs),

    /// List the expected source files and their columns.
    Sources(SourcesArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Directory holding the source CSV files.
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// TOML file overriding source layout, columns, and analysis options.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output directory for result tables (default: <DATA_DIR>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Neighbors consulted per state.
    #[arg(long = "k", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub k: Option<u32>,

    /// Leave a state out of the extrapolation table (repeatable).
    #[arg(long = "exclude-state", value_name = "NAME")]
    pub exclude_state: Vec<String>,

    /// Drop the built-in exclusions (Alaska, Hawaii).
    #[arg(long = "no-default-exclusions")]
    pub no_default_exclusions: bool,

    /// Join policy for the incidence/death merge.
    #[arg(long = "outcome-join", value_enum)]
    pub outcome_join: Option<OutcomeJoinArg>,

    /// Analyze and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct SourcesArgs {
    /// TOML file overriding source layout and columns.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutcomeJoinArg {
    /// Keep every incidence row; deaths must match.
    Left,
    /// Keep rows present in both tables.
    Inner,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
