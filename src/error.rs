//! Error handling for survey tidying operations.
//!
//! [`TidyError`] covers failures that stop a whole run (unreadable input,
//! bad configuration, output that cannot be written). [`RowError`] covers
//! failures confined to one encoded response; those never abort the batch
//! and end up in the diagnostics report instead.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TidyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Input table is missing column '{column}' (found: {found})")]
    MissingColumn { column: String, found: String },

    #[error("Input row {row} has no value in column '{column}'")]
    NullCell { row: usize, column: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize diagnostics report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("Invalid zip pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl TidyError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TidyError>;

/// Failure confined to a single encoded response
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowError {
    /// A split stage produced a piece count outside the documented one
    #[error(
        "structural mismatch at {stage}: split on '{delimiter}' gave {found} pieces, expected {expected} (remainder: {remainder:?})"
    )]
    StructuralMismatch {
        stage: String,
        delimiter: char,
        expected: usize,
        found: usize,
        remainder: String,
    },

    /// No recovery rule maps the observed field layout onto canonical names
    #[error("alignment failed in {section}: {reason} (observed {observed} delimiters)")]
    Alignment {
        section: String,
        observed: usize,
        reason: String,
        fragments: Vec<String>,
    },
}

impl RowError {
    pub fn alignment(
        section: impl Into<String>,
        observed: usize,
        reason: impl Into<String>,
        fragments: &[String],
    ) -> Self {
        Self::Alignment {
            section: section.into(),
            observed,
            reason: reason.into(),
            fragments: fragments.to_vec(),
        }
    }

    /// Short label used in the output table's status column
    pub fn kind(&self) -> &'static str {
        match self {
            RowError::StructuralMismatch { .. } => "structural_mismatch",
            RowError::Alignment { .. } => "alignment_error",
        }
    }
}
