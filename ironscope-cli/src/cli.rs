//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ironscope -- host-activity log analysis and threat detection.
///
/// Use `ironscope <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "ironscope", version, about, long_about = None)]
pub struct Cli {
    /// Path to the ironscope.toml configuration file.
    ///
    /// When omitted, `ironscope.toml` in the working directory is used if it
    /// exists and built-in defaults otherwise.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Analyze a log file and report detections.
    Analyze(AnalyzeArgs),

    /// Detect the format of a log file without analyzing it.
    Detect(DetectArgs),

    /// Inspect the built-in detection rules.
    Rules(RulesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- analyze ----

/// Run a full analysis on one log file.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Log file to analyze (Sysmon/event log CSV or Sysmon text export).
    pub file: PathBuf,

    /// Maximum number of records to process (overrides engine.row_budget).
    #[arg(long)]
    pub row_budget: Option<usize>,

    /// Abort on the first invalid record.
    #[arg(long)]
    pub strict: bool,

    /// Count invalid records without listing them in the report.
    #[arg(long)]
    pub skip_invalid: bool,

    /// Do not print progress updates to stderr.
    #[arg(long)]
    pub no_progress: bool,
}

// ---- detect ----

/// Report the detected format and confidence of a log file.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Log file to inspect.
    pub file: PathBuf,
}

// ---- rules ----

/// Inspect the built-in detection rules.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List all built-in detection rules.
    List {
        /// Filter by severity (high, medium, low).
        #[arg(long)]
        severity: Option<String>,
        /// Filter by tactic (case-insensitive, e.g. "Persistence").
        #[arg(long)]
        tactic: Option<String>,
    },
    /// Show one rule with its clauses and MITRE ATT&CK metadata.
    Show {
        /// Rule id (see `ironscope rules list`).
        id: String,
    },
}

// ---- config ----

/// Manage ironscope configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, engine).
        #[arg(long)]
        section: Option<String>,
    },
}
