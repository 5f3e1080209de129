//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// lognorm -- rule-driven log normalization.
///
/// Use `lognorm <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "lognorm", version, about, long_about = None)]
pub struct Cli {
    /// Path to the lognorm.toml configuration file (default: ./lognorm.toml if present).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Rule set directory; repeat to search several (overrides normalizer.paths).
    #[arg(short = 'r', long = "rules", global = true)]
    pub rules: Vec<PathBuf>,

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
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize log lines and print one JSON record per line.
    Normalize(NormalizeArgs),

    /// Inspect and validate rule sets.
    Rules(RulesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- normalize ----

/// Normalize log lines read from a file or stdin.
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Input file (default: stdin).
    pub file: Option<PathBuf>,

    /// Record field that receives each input line.
    #[arg(long, default_value = "raw")]
    pub field: String,

    /// Time zone of the input dates (e.g. Europe/Paris); dates are converted to UTC.
    #[arg(long)]
    pub timezone: Option<String>,

    /// Deactivate a rule set by id (repeatable).
    #[arg(long = "disable", value_name = "ID")]
    pub disable: Vec<String>,
}

// ---- rules ----

/// Inspect and validate rule sets.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List loaded rule sets in application order.
    List {
        /// Only active rule sets.
        #[arg(long, conflicts_with = "inactive")]
        active: bool,
        /// Only inactive rule sets.
        #[arg(long)]
        inactive: bool,
    },
    /// Show the long description of a rule set.
    Show {
        /// Rule set id (`<name>-<version>`).
        id: String,
        /// Description language.
        #[arg(long, default_value = "en")]
        lang: String,
    },
    /// Load every rule set and run its bundled examples.
    Validate {
        /// Rule directory (default: the configured directories).
        path: Option<PathBuf>,
    },
}

// ---- config ----

/// Manage lognorm configuration.
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
        /// Show only a specific section (general, normalizer).
        #[arg(long)]
        section: Option<String>,
    },
}
