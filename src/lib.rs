//! Survey Tidy Library
//!
//! A Rust library for turning a raw survey export, where each participant's
//! answers are packed into a single delimited string, into a tidy table with
//! one typed column per logical field.
//!
//! This library provides tools for:
//! - Checked, wrapper-aware chunking of the packed response string
//! - Recovering rows where a demographic item was skipped, using a declared
//!   and versioned rule table confirmed against the batch itself
//! - Coercing every field to its type while keeping out-of-domain values
//! - Checking that demographic answers agree between occasions
//! - Writing the tidy table as CSV or Parquet with a JSON diagnostics report

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod table;

// Re-export commonly used types
pub use config::{OutputFormat, TidyConfig};
pub use error::{Result, RowError, TidyError};
pub use models::{FieldValue, RawRecord, RowStatus, TidyRecord};
pub use pipeline::{Pipeline, PipelineOutput};
pub use schema::SurveySchema;
