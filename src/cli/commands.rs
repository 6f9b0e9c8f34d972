//! Command execution for the survey-tidy CLI
//!
//! Loads the raw export, runs the pipeline, writes the tidy table and the
//! optional diagnostics report, then prints a summary to stdout.

use crate::cli::args::Args;
use crate::config::TidyConfig;
use crate::constants::LOG_TARGET;
use crate::pipeline::stats::PipelineStats;
use crate::pipeline::{Pipeline, PipelineOutput};
use crate::table::{load_raw_records, to_dataframe, write_table};
use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", LOG_TARGET, log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Run the full tidy workflow for one input file
pub fn run(args: Args) -> Result<PipelineStats> {
    let start = Instant::now();

    args.validate()?;
    let config = args
        .build_config()
        .context("Failed to build configuration")?;
    let output_path = args.get_output_path(config.output_format);

    let records = load_raw_records(&args.input, &config)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let pipeline = Pipeline::new(config.clone())?;
    let output = pipeline.run(&records);

    let mut df = to_dataframe(&output, pipeline.schema())?;
    write_table(&mut df, &output_path, config.output_format)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if let Some(report_path) = &args.report {
        output
            .diagnostics
            .write_json(report_path)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        info!("Diagnostics report written to {}", report_path.display());
    }

    if !args.quiet {
        print_summary(&output, &config, &output_path, start.elapsed().as_secs_f64());
    }

    Ok(output.stats)
}

/// Print a human-readable summary of the run
pub fn print_summary(output: &PipelineOutput, config: &TidyConfig, output_path: &Path, seconds: f64) {
    let stats = &output.stats;

    println!("\n{}", "Survey tidy complete".bright_green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("   • Records read: {}", stats.total_records);
    println!("   • Complete: {}", stats.complete);
    println!(
        "   • Recovered (ruleset {}): {}",
        output.diagnostics.ruleset_version, stats.recovered
    );
    if stats.failed > 0 {
        println!("   • {}: {}", "Failed".red().bold(), stats.failed);
    } else {
        println!("   • Failed: 0");
    }
    println!("   • Domain violations: {}", stats.domain_violations);
    println!("   • Consistency mismatches: {}", stats.consistency_mismatches);
    println!("   • Success rate: {:.1}%", stats.success_rate());

    if let Some(skip_pattern) = &output.diagnostics.skip_pattern {
        let derived = skip_pattern.omitted_field.as_deref().unwrap_or("none");
        println!(
            "   • Skip pattern: {} short of {} occasion blocks, omitted field {}",
            skip_pattern.short_rows, skip_pattern.rows_examined, derived
        );
    }
    if !config.verify_skip_pattern {
        println!("   • {}", "Skip-pattern check disabled".yellow());
    }

    println!("   • Output: {} ({:.2}s)", output_path.display(), seconds);

    if !stats.is_successful() {
        println!(
            "{}",
            "⚠️  Fewer than 90% of records produced typed fields; see the diagnostics report"
                .yellow()
        );
    }
    println!();
}
