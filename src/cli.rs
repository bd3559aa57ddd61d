//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::judgement::{CompareMethod, DEFAULT_SIGNIFICANCE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fresnel - browser performance scenarios, recorded and compared
///
/// Loads each configured page in headless Chromium several times,
/// records timing and transfer metrics, and compares two recordings
/// to find regressions.
///
/// Examples:
///   fresnel init
///   fresnel record before
///   fresnel record after
///   fresnel compare before after
///   fresnel compare before after --format markdown --method mann-whitney
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Directory where recordings are stored
    #[arg(
        long,
        global = true,
        default_value = ".fresnel_records",
        env = "FRESNEL_DIR",
        value_name = "DIR"
    )]
    pub dir: PathBuf,

    /// Path to the scenario file
    ///
    /// If not specified, looks for .fresnel.yml, .fresnel.yaml or
    /// .fresnel.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra command-line flags for Chromium (whitespace-separated)
    ///
    /// In containers Chromium typically needs --no-sandbox.
    #[arg(
        long,
        global = true,
        env = "CHROMIUM_FLAGS",
        value_name = "FLAGS",
        allow_hyphen_values = true
    )]
    pub chromium_flags: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the configured scenarios and save a recording
    Record {
        /// Name of this recording; must be usable as a directory name
        #[arg(default_value = "default")]
        label: String,
    },

    /// Compare two recordings
    ///
    /// Exit code 2 when a metric regressed past its threshold.
    Compare {
        /// Label of the earlier recording
        before: String,

        /// Label of the later recording
        after: String,

        /// Output format
        #[arg(long, default_value = "text", value_name = "FORMAT")]
        format: OutputFormat,

        /// How two series are compared
        #[arg(long, default_value = "declared", value_name = "METHOD")]
        method: CompareMethod,

        /// Significance level for --method mann-whitney
        #[arg(long, default_value_t = DEFAULT_SIGNIFICANCE, value_name = "LEVEL")]
        significance: f64,
    },

    /// Write a starter .fresnel.yml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the installed version
    Version,
}

/// Output format for comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain-text table (default)
    #[default]
    Text,
    /// Markdown table
    Markdown,
    /// JSON document
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Record { label } => {
                crate::writer::validate_name(label).map_err(|e| e.to_string())?;
            }
            Command::Compare {
                before,
                after,
                significance,
                ..
            } => {
                for label in [before, after] {
                    crate::writer::validate_name(label).map_err(|e| e.to_string())?;
                }
                if !(*significance > 0.0 && *significance < 1.0) {
                    return Err("Significance must be between 0.0 and 1.0".to_string());
                }
            }
            Command::Init { .. } | Command::Version => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
