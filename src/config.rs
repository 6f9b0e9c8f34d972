//! Configuration management and validation.
//!
//! Provides the tunable parameters of a tidying run: input column names,
//! field bounds, the experiment condition codes the recovery rule anchors
//! on, and output settings. Defaults describe the 2019 export; a TOML file
//! can override any of them.

use crate::constants::{
    AGE_MAX, AGE_MIN, DEFAULT_CONDITION_CODE, DEFAULT_ENCODED_COLUMN, DEFAULT_ID_COLUMN,
    DEFAULT_ZIP_PATTERN, ITEM_MAX, ITEM_MIN,
};
use crate::error::{Result, TidyError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Output file format for the tidy table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Global configuration for a tidying run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TidyConfig {
    /// Column holding the participant identifier
    pub id_column: String,

    /// Column holding the packed response string
    pub encoded_column: String,

    /// Experiment condition codes; the short-row rule only re-anchors onto these
    pub condition_codes: Vec<String>,

    /// Regular expression a zip code must match
    pub zip_pattern: String,

    /// Inclusive bounds for intellectual-humility items
    pub item_bounds: (i64, i64),

    /// Inclusive bounds for participant age
    pub age_bounds: (i64, i64),

    /// Re-derive the omitted field from the batch and refuse to recover
    /// short rows when it disagrees with the rule table
    pub verify_skip_pattern: bool,

    /// Treat a field missing at both occasions as consistent
    pub missing_pairs_consistent: bool,

    /// Output file format
    pub output_format: OutputFormat,
}

impl Default for TidyConfig {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            encoded_column: DEFAULT_ENCODED_COLUMN.to_string(),
            condition_codes: vec![DEFAULT_CONDITION_CODE.to_string()],
            zip_pattern: DEFAULT_ZIP_PATTERN.to_string(),
            item_bounds: (ITEM_MIN, ITEM_MAX),
            age_bounds: (AGE_MIN, AGE_MAX),
            verify_skip_pattern: true,
            missing_pairs_consistent: true,
            output_format: OutputFormat::Csv,
        }
    }
}

impl TidyConfig {
    /// Load configuration from a TOML file, falling back to defaults for absent keys
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TidyConfig =
            toml::from_str(&content).map_err(|source| TidyError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.id_column.trim().is_empty() || self.encoded_column.trim().is_empty() {
            return Err(TidyError::configuration("input column names must not be empty"));
        }
        if self.id_column == self.encoded_column {
            return Err(TidyError::configuration(format!(
                "id and encoded columns must differ (both '{}')",
                self.id_column
            )));
        }
        if self.condition_codes.is_empty() {
            return Err(TidyError::configuration(
                "at least one experiment condition code is required",
            ));
        }
        if self.condition_codes.iter().any(|code| code.contains(',')) {
            return Err(TidyError::configuration(
                "condition codes must not contain the field delimiter",
            ));
        }
        for (label, (min, max)) in [("item", self.item_bounds), ("age", self.age_bounds)] {
            if min > max {
                return Err(TidyError::configuration(format!(
                    "{} bounds are inverted: {} > {}",
                    label, min, max
                )));
            }
        }
        Ok(())
    }

    /// Set the input column names
    pub fn with_columns(mut self, id_column: impl Into<String>, encoded_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self.encoded_column = encoded_column.into();
        self
    }

    /// Set the experiment condition codes
    pub fn with_condition_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.condition_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the zip code pattern
    pub fn with_zip_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.zip_pattern = pattern.into();
        self
    }

    /// Set the age bounds
    pub fn with_age_bounds(mut self, min: i64, max: i64) -> Self {
        self.age_bounds = (min, max);
        self
    }

    /// Recover short rows without checking the batch skip pattern
    pub fn without_skip_pattern_check(mut self) -> Self {
        self.verify_skip_pattern = false;
        self
    }

    /// Set the output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = TidyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.condition_codes, vec!["B1".to_string()]);
        assert_eq!(config.item_bounds, (0, 6));
        assert!(config.verify_skip_pattern);
    }

    #[test]
    fn test_builder_methods() {
        let config = TidyConfig::default()
            .with_columns("participant", "blob")
            .with_condition_codes(["A1", "B1"])
            .with_age_bounds(16, 90)
            .without_skip_pattern_check()
            .with_output_format(OutputFormat::Parquet);

        assert_eq!(config.id_column, "participant");
        assert_eq!(config.encoded_column, "blob");
        assert_eq!(config.condition_codes.len(), 2);
        assert_eq!(config.age_bounds, (16, 90));
        assert!(!config.verify_skip_pattern);
        assert_eq!(config.output_format.extension(), "parquet");
    }

    #[test]
    fn test_validation_failures() {
        assert!(TidyConfig::default().with_columns("x", "x").validate().is_err());
        assert!(
            TidyConfig::default()
                .with_condition_codes(Vec::<String>::new())
                .validate()
                .is_err()
        );
        assert!(TidyConfig::default().with_age_bounds(90, 18).validate().is_err());
        assert!(
            TidyConfig::default()
                .with_condition_codes(["B1,B2"])
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "encoded_column = \"blob\"\ncondition_codes = [\"B1\", \"B2\"]\noutput_format = \"parquet\""
        )
        .unwrap();

        let config = TidyConfig::from_file(file.path()).unwrap();
        assert_eq!(config.encoded_column, "blob");
        assert_eq!(config.id_column, "id");
        assert_eq!(config.condition_codes, vec!["B1", "B2"]);
        assert_eq!(config.output_format, OutputFormat::Parquet);
    }

    #[test]
    fn test_load_malformed_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "condition_codes = B1").unwrap();

        let err = TidyConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, TidyError::ConfigParse { .. }));
    }
}
