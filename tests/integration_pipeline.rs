//! Integration tests for the tidy workflow
//!
//! These tests write a raw export to disk, run it through loading, the
//! pipeline and both output formats, and read the results back.

use clap::Parser;
use polars::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use survey_tidy::cli::Args;
use survey_tidy::table::{load_raw_records, to_dataframe, write_table};
use survey_tidy::{OutputFormat, Pipeline, Result, TidyConfig, TidyError};
use tempfile::TempDir;

const PRE_TIMESTAMP: &str = "2019-02-11T04:36:04.112Z";
const POST_TIMESTAMP: &str = "2019-02-11T04:52:17.480Z";

/// Occasion block with sixteen items, demographics and one text response
fn occasion_block(age: u32, religion: Option<&str>, text: &str) -> String {
    let items: Vec<String> = (0..16).map(|index| (index % 7).to_string()).collect();
    let religion = religion.map(|value| format!("{},", value)).unwrap_or_default();
    format!(
        "[[{},{},Male,Asian,Liberal,{}10001,B1,[|{}|",
        items.join(","),
        age,
        religion,
        text
    )
}

fn encoded(pre_age: u32, post_age: u32, religion: Option<&str>, continuation: &str) -> String {
    format!(
        "{}]{}]{}]Complete>{}>{}]",
        occasion_block(pre_age, religion, "Not sure, really"),
        continuation,
        occasion_block(post_age, religion, "Same [as before]"),
        PRE_TIMESTAMP,
        POST_TIMESTAMP
    )
}

/// Raw export: two full rows, two short rows, one malformed row
fn write_raw_export(dir: &Path) -> PathBuf {
    let rows = [
        ("p001", encoded(34, 34, Some("Jewish"), "Yes,5,5,6,(not asked),(not asked)")),
        ("p002", encoded(19, 20, Some("None"), "Yes, but later,3,4,2,Yes,No")),
        ("p003", encoded(45, 45, None, "No,1,1,1,No,No")),
        ("p004", encoded(27, 27, None, "No, not now, thanks,0,2,1,No,Yes")),
        ("p005", "truncated[[1,2,3".to_string()),
    ];

    let path = dir.join("raw_2019.csv");
    let mut file = File::create(&path).unwrap();
    writeln!(file, "id,response").unwrap();
    for (id, response) in rows {
        writeln!(file, "{},\"{}\"", id, response).unwrap();
    }
    path
}

fn run_pipeline(path: &Path) -> Result<(Pipeline, survey_tidy::PipelineOutput)> {
    let config = TidyConfig::default();
    let records = load_raw_records(path, &config)?;
    let pipeline = Pipeline::new(config)?;
    let output = pipeline.run(&records);
    Ok((pipeline, output))
}

#[test]
fn test_end_to_end_statistics() -> Result<()> {
    let dir = TempDir::new()?;
    let input = write_raw_export(dir.path());

    let (_, output) = run_pipeline(&input)?;
    assert_eq!(output.stats.total_records, 5);
    assert_eq!(output.stats.complete, 2);
    assert_eq!(output.stats.recovered, 2);
    assert_eq!(output.stats.failed, 1);
    assert_eq!(output.stats.consistency_mismatches, 1);
    assert!(output.stats.is_balanced());
    assert_eq!(output.diagnostics.count("recovery_applied"), 4);
    assert_eq!(output.diagnostics.count("row_failed"), 1);
    Ok(())
}

#[test]
fn test_parquet_output_is_typed() -> Result<()> {
    let dir = TempDir::new()?;
    let input = write_raw_export(dir.path());
    let (pipeline, output) = run_pipeline(&input)?;

    let mut df = to_dataframe(&output, pipeline.schema())?;
    assert_eq!(df.height(), 5);

    let path = dir.path().join("out").join("tidy.parquet");
    write_table(&mut df, &path, OutputFormat::Parquet)?;
    let df = ParquetReader::new(File::open(&path)?).finish()?;

    assert_eq!(df.height(), 5);
    assert_eq!(df.column("Age_pre")?.dtype(), &DataType::Int64);
    assert_eq!(df.column("Enjoyment")?.dtype(), &DataType::Int64);
    assert_eq!(df.column("Age_consistent")?.dtype(), &DataType::Boolean);

    let status = df.column("status")?.as_materialized_series().str()?.clone();
    assert_eq!(status.get(0), Some("complete"));
    assert_eq!(status.get(2), Some("recovered"));
    assert_eq!(status.get(4), Some("failed"));

    let religion = df.column("Religion_pre")?.as_materialized_series().str()?.clone();
    assert_eq!(religion.get(0), Some("Jewish"));
    assert_eq!(religion.get(2), None);

    let condition = df.column("Condition_post")?.as_materialized_series().str()?.clone();
    assert_eq!(condition.get(3), Some("B1"));

    let zip = df.column("Zip_pre")?.as_materialized_series().str()?.clone();
    assert_eq!(zip.get(3), Some("10001"));

    let continuation = df.column("Continue")?.as_materialized_series().str()?.clone();
    assert_eq!(continuation.get(1), Some("Yes, but later"));
    assert_eq!(continuation.get(3), Some("No, not now, thanks"));

    let dates = df.column("Date_pre")?.as_materialized_series().str()?.clone();
    assert_eq!(dates.get(0), Some("2019-02-11"));

    let texts = df.column("Text_post")?.as_materialized_series().str()?.clone();
    assert_eq!(texts.get(0), Some("[\"Same [as before]\"]"));
    assert_eq!(texts.get(4), None);

    let age = df.column("Age_consistent")?.as_materialized_series().bool()?.clone();
    assert_eq!(age.get(0), Some(true));
    assert_eq!(age.get(1), Some(false));
    assert_eq!(age.get(4), None);
    Ok(())
}

#[test]
fn test_csv_output_keeps_every_row() -> Result<()> {
    let dir = TempDir::new()?;
    let input = write_raw_export(dir.path());
    let (pipeline, output) = run_pipeline(&input)?;

    let mut df = to_dataframe(&output, pipeline.schema())?;
    let path = dir.path().join("tidy.csv");
    write_table(&mut df, &path, OutputFormat::Csv)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))?
        .finish()?;
    assert_eq!(df.height(), 5);

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names[0], "id");
    assert_eq!(names[1], "status");
    assert!(names.contains(&"Q16_pre".to_string()));
    assert!(names.contains(&"Timestamp_post".to_string()));
    assert!(names.contains(&"Followup_share".to_string()));
    assert!(names.contains(&"Zip_consistent".to_string()));
    Ok(())
}

#[test]
fn test_missing_input_column() -> Result<()> {
    let dir = TempDir::new()?;
    let input = write_raw_export(dir.path());

    let config = TidyConfig::default().with_columns("id", "blob");
    let err = load_raw_records(&input, &config).unwrap_err();
    assert!(matches!(err, TidyError::MissingColumn { ref column, .. } if column == "blob"));
    Ok(())
}

#[test]
fn test_missing_input_file() {
    let err = load_raw_records(Path::new("/nonexistent/raw.csv"), &TidyConfig::default())
        .unwrap_err();
    assert!(matches!(err, TidyError::InputNotFound { .. }));
}

#[test]
fn test_cli_run_writes_table_and_report() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_raw_export(dir.path());
    let report = dir.path().join("report.json");

    let args = Args::parse_from([
        "survey-tidy".to_string(),
        input.display().to_string(),
        "--format".to_string(),
        "parquet".to_string(),
        "--report".to_string(),
        report.display().to_string(),
        "--quiet".to_string(),
    ]);
    let stats = survey_tidy::cli::run(args)?;
    assert_eq!(stats.failed, 1);

    assert!(dir.path().join("raw_2019_tidy.parquet").exists());

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report)?)?;
    assert_eq!(json["ruleset_version"], "2019.1");
    assert_eq!(json["skip_pattern"]["short_rows"], 4);
    Ok(())
}
