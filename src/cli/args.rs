//! Command-line argument definitions for survey-tidy
//!
//! This module defines the CLI interface using the clap derive API.

use crate::config::{OutputFormat, TidyConfig};
use crate::error::{Result, TidyError};
use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the survey tidier
///
/// Splits the packed response column of a raw survey export into a tidy
/// table of typed pre-test, continuation and post-test fields.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "survey-tidy",
    version,
    about = "Tidy packed survey responses into one typed column per field",
    long_about = "Reads a raw survey export (participant id plus one packed response string), \
                  recovers rows where a demographic item was skipped, coerces every field to its \
                  type and checks pre/post consistency of demographic answers. Writes a tidy \
                  CSV or Parquet table and an optional JSON diagnostics report."
)]
pub struct Args {
    /// Raw survey export (CSV with an id column and a packed response column)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output path for the tidy table
    ///
    /// If not specified, writes `<input stem>_tidy.<format>` next to the input.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        help = "Output path for the tidy table"
    )]
    pub output: Option<PathBuf>,

    /// Output file format
    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        help = "Output format for the tidy table [default: csv]"
    )]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// TOML file overriding column names, condition codes and field bounds.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Write the diagnostics report as JSON
    #[arg(
        short = 'r',
        long = "report",
        value_name = "FILE",
        help = "Write row failures and warnings to a JSON report"
    )]
    pub report: Option<PathBuf>,

    /// Name of the participant id column
    #[arg(long = "id-column", value_name = "NAME")]
    pub id_column: Option<String>,

    /// Name of the packed response column
    #[arg(long = "encoded-column", value_name = "NAME")]
    pub encoded_column: Option<String>,

    /// Experiment condition code (repeat for several)
    #[arg(long = "condition-code", value_name = "CODE")]
    pub condition_codes: Vec<String>,

    /// Recover short rows without confirming the skip pattern from the batch
    #[arg(long = "no-skip-pattern-check")]
    pub no_skip_pattern_check: bool,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Args {
    /// Validate the arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if !self.input.exists() {
            return Err(TidyError::InputNotFound {
                path: self.input.clone(),
            });
        }

        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(TidyError::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }

        if let Some(output) = &self.output {
            if output == &self.input {
                return Err(TidyError::configuration(
                    "Output path must differ from the input path",
                ));
            }
        }

        Ok(())
    }

    /// Get the log level based on verbosity and quiet flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }

        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Build the run configuration: file (if any), then flag overrides
    pub fn build_config(&self) -> Result<TidyConfig> {
        let mut config = match &self.config_file {
            Some(path) => TidyConfig::from_file(path)?,
            None => TidyConfig::default(),
        };

        if let Some(id_column) = &self.id_column {
            config.id_column = id_column.clone();
        }
        if let Some(encoded_column) = &self.encoded_column {
            config.encoded_column = encoded_column.clone();
        }
        if !self.condition_codes.is_empty() {
            config.condition_codes = self.condition_codes.clone();
        }
        if self.no_skip_pattern_check {
            config.verify_skip_pattern = false;
        }
        if let Some(format) = self.format {
            config.output_format = format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the output path, defaulting to `<stem>_tidy.<ext>` beside the input
    pub fn get_output_path(&self, format: OutputFormat) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => {
                let stem = self
                    .input
                    .file_stem()
                    .unwrap_or_default()
                    .to_string_lossy();
                self.input
                    .with_file_name(format!("{}_tidy.{}", stem, format.extension()))
            }
        }
    }
}
