//! Loading the raw two-column export
//!
//! The export is read with every column as a string so identifiers with
//! leading zeros and packed responses survive untouched.

use crate::config::TidyConfig;
use crate::error::{Result, TidyError};
use crate::models::RawRecord;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Read a CSV export into a frame of string columns
pub fn read_raw_table(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(TidyError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(
        "Read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Extract raw records from the configured id and encoded columns
///
/// A null id is an input error. A null response becomes an empty one, which
/// the pipeline reports as a structural failure rather than dropping.
/// Duplicate ids are kept here and reported by the pipeline.
pub fn records_from_frame(df: &DataFrame, config: &TidyConfig) -> Result<Vec<RawRecord>> {
    let ids = string_column(df, &config.id_column)?;
    let encoded = string_column(df, &config.encoded_column)?;

    let mut records = Vec::with_capacity(ids.len());
    for (row, (id, encoded)) in ids.into_iter().zip(encoded).enumerate() {
        let id = id.ok_or_else(|| TidyError::NullCell {
            row,
            column: config.id_column.clone(),
        })?;
        records.push(RawRecord::new(id, encoded.unwrap_or_default()));
    }

    Ok(records)
}

/// Read a CSV export straight into raw records
pub fn load_raw_records(path: &Path, config: &TidyConfig) -> Result<Vec<RawRecord>> {
    let df = read_raw_table(path)?;
    let records = records_from_frame(&df, config)?;
    info!("Loaded {} raw records from {}", records.len(), path.display());
    Ok(records)
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name).map_err(|_| TidyError::MissingColumn {
        column: name.to_string(),
        found: df
            .get_column_names()
            .iter()
            .map(|column| column.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })?;

    let column = column.cast(&DataType::String)?;
    let values = column
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}
