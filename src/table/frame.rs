//! Building the tidy output frame
//!
//! One row per input record, one column per logical field. Integer fields
//! become `Int64` columns unless some record kept a raw out-of-domain value,
//! in which case the whole column is rendered as strings so nothing is lost.
//! A `(not asked)` integer is written as null, with a `<field>_not_asked`
//! flag column added whenever the column holds at least one.

use crate::constants::{INVARIANT_FIELDS, STATUS, occasion_column};
use crate::error::Result;
use crate::models::{FieldValue, Occasion, RowStatus, TidyRecord};
use crate::pipeline::PipelineOutput;
use crate::schema::{FieldDomain, SurveySchema};
use polars::prelude::*;
use tracing::debug;

/// Column with typed values, falling back to strings when a value stayed raw
fn value_column(name: &str, domain: Option<&FieldDomain>, values: &[&FieldValue]) -> Vec<Column> {
    let integer_domain = matches!(domain, Some(FieldDomain::Integer { .. }));
    let any_raw = values
        .iter()
        .any(|value| matches!(value, FieldValue::Raw(_)));

    if !integer_domain || any_raw {
        let rendered: Vec<Option<String>> = values.iter().map(|value| value.render()).collect();
        return vec![Column::new(name.into(), rendered)];
    }

    let integers: Vec<Option<i64>> = values.iter().map(|value| value.as_integer()).collect();
    let mut columns = vec![Column::new(name.into(), integers)];

    if values.iter().any(|value| matches!(value, FieldValue::NotAsked)) {
        let not_asked: Vec<bool> = values
            .iter()
            .map(|value| matches!(value, FieldValue::NotAsked))
            .collect();
        columns.push(Column::new(format!("{}_not_asked", name).into(), not_asked));
    }
    columns
}

fn occasion_columns(
    records: &[TidyRecord],
    schema: &SurveySchema,
    occasion: Occasion,
) -> Result<Vec<Column>> {
    let suffix = occasion.suffix();
    let mut columns = Vec::new();

    for spec in schema.occasion_fields() {
        let values: Vec<&FieldValue> = records
            .iter()
            .map(|record| {
                record
                    .occasion(occasion)
                    .fields
                    .get(&spec.name)
                    .unwrap_or(&FieldValue::Missing)
            })
            .collect();
        columns.extend(value_column(
            &occasion_column(&spec.name, suffix),
            Some(&spec.domain),
            &values,
        ));
    }

    let mut texts = Vec::with_capacity(records.len());
    for record in records {
        let responses = &record.occasion(occasion).texts;
        texts.push(if record.status.is_failed() {
            None
        } else {
            Some(serde_json::to_string(responses)?)
        });
    }
    columns.push(Column::new(occasion_column("Text", suffix).into(), texts));

    let dates: Vec<&FieldValue> = records
        .iter()
        .map(|record| &record.occasion(occasion).date)
        .collect();
    columns.extend(value_column(&occasion_column("Date", suffix), None, &dates));

    let timestamps: Vec<Option<String>> = records
        .iter()
        .map(|record| {
            record
                .occasion(occasion)
                .timestamp
                .map(|timestamp| timestamp.to_rfc3339())
        })
        .collect();
    columns.push(Column::new(
        occasion_column("Timestamp", suffix).into(),
        timestamps,
    ));

    Ok(columns)
}

/// Tidy table for a pipeline run, one row per input record
pub fn to_dataframe(output: &PipelineOutput, schema: &SurveySchema) -> Result<DataFrame> {
    let records = &output.records;
    let mut columns = Vec::new();

    let ids: Vec<&str> = records.iter().map(|record| record.id.as_str()).collect();
    columns.push(Column::new("id".into(), ids));

    let statuses: Vec<&str> = records.iter().map(|record| record.status.label()).collect();
    columns.push(Column::new("status".into(), statuses));

    let failures: Vec<Option<String>> = records
        .iter()
        .map(|record| match &record.status {
            RowStatus::Failed { error } => Some(error.to_string()),
            _ => None,
        })
        .collect();
    columns.push(Column::new("failure".into(), failures));

    columns.extend(occasion_columns(records, schema, Occasion::Pre)?);

    for spec in schema.continuation_fields() {
        let values: Vec<&FieldValue> = records
            .iter()
            .map(|record| {
                record
                    .continuation
                    .get(&spec.name)
                    .unwrap_or(&FieldValue::Missing)
            })
            .collect();
        columns.extend(value_column(&spec.name, Some(&spec.domain), &values));
    }

    columns.extend(occasion_columns(records, schema, Occasion::Post)?);

    let survey_statuses: Vec<&FieldValue> =
        records.iter().map(|record| &record.survey_status).collect();
    columns.extend(value_column(STATUS, None, &survey_statuses));

    for field in INVARIANT_FIELDS {
        let flags: Vec<Option<bool>> = output
            .consistency
            .field(field)
            .map(|consistency| consistency.flags.clone())
            .unwrap_or_else(|| vec![None; records.len()]);
        columns.push(Column::new(format!("{}_consistent", field).into(), flags));
    }

    let df = DataFrame::new(columns)?;
    debug!("Built tidy frame: {} rows x {} columns", df.height(), df.width());
    Ok(df)
}
