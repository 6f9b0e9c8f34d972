//! Tidying pipeline for packed survey responses
//!
//! Turns raw records into typed, tidy records through a linear sequence of
//! pure stages. Each record is handled on its own except for the batch-wide
//! skip-pattern check and the consistency aggregate.
//!
//! ## Architecture
//!
//! - [`chunker`] - Checked, wrapper-aware splitting into sections and blocks
//! - [`recovery`] - Recovery rule table, field alignment, skip-pattern derivation
//! - [`coercion`] - Typed values and domain violations
//! - [`consistency`] - Pre/post agreement of demographic fields
//! - [`diagnostics`] - Row failures and warnings gathered over the run
//! - [`stats`] - Run statistics
//!
//! ## Usage
//!
//! ```rust
//! use survey_tidy::{Pipeline, RawRecord, TidyConfig};
//!
//! # fn example(records: Vec<RawRecord>) -> survey_tidy::Result<()> {
//! let pipeline = Pipeline::new(TidyConfig::default())?;
//! let output = pipeline.run(&records);
//!
//! println!("{} of {} rows typed", output.stats.complete + output.stats.recovered,
//!          output.stats.total_records);
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod coercion;
pub mod consistency;
pub mod diagnostics;
pub mod recovery;
pub mod stats;

#[cfg(test)]
pub mod tests;

use self::chunker::{EncodingLayout, RecordChunks, chunk_record};
use self::coercion::{coerce_field_set, coerce_value, parse_timestamp};
use self::consistency::{ConsistencyReport, check_batch};
use self::diagnostics::{Diagnostic, DiagnosticsReport, DomainViolation};
use self::recovery::{FieldRecoverer, RecoveryRules, SkipPattern, derive_skip_pattern};
use self::stats::PipelineStats;

use crate::config::TidyConfig;
use crate::constants::INVARIANT_FIELDS;
use crate::error::{Result, RowError};
use crate::models::{FieldSet, FieldValue, Occasion, OccasionRecord, RawRecord, RowStatus, TidyRecord};
use crate::schema::{FieldDomain, SurveySchema};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One tidy record per raw record, in input order
    pub records: Vec<TidyRecord>,
    pub diagnostics: DiagnosticsReport,
    pub consistency: ConsistencyReport,
    pub stats: PipelineStats,
}

/// Configured tidying pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: TidyConfig,
    schema: SurveySchema,
    layout: EncodingLayout,
    rules: RecoveryRules,
}

impl Pipeline {
    /// Create a pipeline with the default encoding layout and rule table
    pub fn new(config: TidyConfig) -> Result<Self> {
        config.validate()?;
        let schema = SurveySchema::from_config(&config)?;
        Ok(Self {
            config,
            schema,
            layout: EncodingLayout::default(),
            rules: RecoveryRules::default(),
        })
    }

    /// Replace the recovery rule table
    pub fn with_rules(mut self, rules: RecoveryRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &TidyConfig {
        &self.config
    }

    pub fn schema(&self) -> &SurveySchema {
        &self.schema
    }

    pub fn rules(&self) -> &RecoveryRules {
        &self.rules
    }

    /// Tidy a batch of raw records
    pub fn run(&self, records: &[RawRecord]) -> PipelineOutput {
        info!(
            "Tidying {} records with recovery ruleset {}",
            records.len(),
            self.rules.version
        );

        let mut diagnostics = DiagnosticsReport::new(&self.rules.version);
        flag_duplicate_ids(records, &mut diagnostics);

        // Stage 1: split every record into its sections
        let chunked: Vec<std::result::Result<RecordChunks, RowError>> = records
            .iter()
            .map(|record| chunk_record(&record.encoded, &self.layout))
            .collect();

        // Stage 2: confirm the omitted field from the batch itself
        let skip_pattern = self.skip_pattern(&chunked);
        let allow_reanchor = self.reanchor_confirmed(&skip_pattern, &mut diagnostics);
        diagnostics.skip_pattern = Some(skip_pattern);
        let recoverer = FieldRecoverer::new(&self.schema, &self.rules).with_reanchor(allow_reanchor);

        // Stage 3: align and coerce each record on its own
        let mut stats = PipelineStats::new();
        stats.total_records = records.len();
        let mut tidy = Vec::with_capacity(records.len());

        for (record, chunks) in records.iter().zip(chunked) {
            let outcome = chunks.and_then(|chunks| self.tidy_record(record, &chunks, &recoverer));
            match outcome {
                Ok((tidy_record, entries)) => {
                    match &tidy_record.status {
                        RowStatus::Recovered { .. } => stats.recovered += 1,
                        _ => stats.complete += 1,
                    }
                    for entry in entries {
                        if matches!(entry, Diagnostic::DomainViolation(_)) {
                            stats.domain_violations += 1;
                        }
                        diagnostics.push(entry);
                    }
                    tidy.push(tidy_record);
                }
                Err(error) => {
                    warn!("Record {} failed: {}", record.id, error);
                    stats.failed += 1;
                    diagnostics.push(Diagnostic::RowFailed {
                        record_id: record.id.clone(),
                        error: error.clone(),
                    });
                    tidy.push(self.failed_record(record, error));
                }
            }
        }

        // Stage 4: cross-occasion consistency
        let (consistency, mismatches) =
            check_batch(&tidy, INVARIANT_FIELDS, self.config.missing_pairs_consistent);
        stats.consistency_mismatches = mismatches.len();
        for mismatch in mismatches {
            debug!(
                "Record {} disagrees on {}: {} vs {}",
                mismatch.record_id, mismatch.field, mismatch.pre, mismatch.post
            );
            diagnostics.push(Diagnostic::ConsistencyMismatch(mismatch));
        }

        info!(
            "Tidied {} records: {} complete, {} recovered, {} failed, {} domain violations, {} consistency mismatches",
            stats.total_records,
            stats.complete,
            stats.recovered,
            stats.failed,
            stats.domain_violations,
            stats.consistency_mismatches
        );

        PipelineOutput {
            records: tidy,
            diagnostics,
            consistency,
            stats,
        }
    }

    /// Derive the skip pattern from every occasion block that chunked cleanly
    fn skip_pattern(&self, chunked: &[std::result::Result<RecordChunks, RowError>]) -> SkipPattern {
        let scalar_lists: Vec<&str> = chunked
            .iter()
            .filter_map(|chunks| chunks.as_ref().ok())
            .flat_map(|chunks| {
                [Occasion::Pre, Occasion::Post]
                    .map(|occasion| chunks.occasion(occasion).scalars.as_str())
            })
            .collect();
        derive_skip_pattern(&scalar_lists, &self.schema)
    }

    fn reanchor_confirmed(&self, skip_pattern: &SkipPattern, diagnostics: &mut DiagnosticsReport) -> bool {
        if !self.config.verify_skip_pattern {
            return true;
        }
        let declared = self.rules.omitted_fields();
        let has_short_rows = skip_pattern.short_rows > 0;
        let confirmed = skip_pattern
            .omitted_field
            .as_deref()
            .is_some_and(|derived| declared.contains(&derived));

        if has_short_rows && !confirmed {
            warn!(
                "Skip pattern points at {:?} but the rule table declares {:?}; short rows will not be re-anchored",
                skip_pattern.omitted_field, declared
            );
            diagnostics.push(Diagnostic::SkipPatternDisagreement {
                declared: declared.iter().map(|field| field.to_string()).collect(),
                derived: skip_pattern.omitted_field.clone(),
            });
            return false;
        }
        true
    }

    /// Align and coerce one chunked record
    fn tidy_record(
        &self,
        record: &RawRecord,
        chunks: &RecordChunks,
        recoverer: &FieldRecoverer<'_>,
    ) -> std::result::Result<(TidyRecord, Vec<Diagnostic>), RowError> {
        let mut entries = Vec::new();
        let mut missing_fields = Vec::new();

        let pre = self.tidy_occasion(
            record,
            chunks,
            Occasion::Pre,
            recoverer,
            &mut entries,
            &mut missing_fields,
        )?;
        let post = self.tidy_occasion(
            record,
            chunks,
            Occasion::Post,
            recoverer,
            &mut entries,
            &mut missing_fields,
        )?;

        let (continuation_raw, _) = recoverer
            .align_continuation(&chunks.continuation)
            .into_result("continuation")?;
        let (continuation, violations) =
            coerce_field_set(&record.id, "", &self.schema, &continuation_raw);
        entries.extend(violations.into_iter().map(Diagnostic::DomainViolation));

        let survey_status = coerce_value(&FieldDomain::FreeText, Some(&chunks.metadata[0])).value;

        let status = if missing_fields.is_empty() {
            RowStatus::Complete
        } else {
            RowStatus::Recovered { missing_fields }
        };

        debug!("Record {} tidied ({})", record.id, status.label());
        Ok((
            TidyRecord {
                id: record.id.clone(),
                status,
                pre,
                continuation,
                post,
                survey_status,
            },
            entries,
        ))
    }

    /// Align and coerce one occasion block with its timestamp
    fn tidy_occasion(
        &self,
        record: &RawRecord,
        chunks: &RecordChunks,
        occasion: Occasion,
        recoverer: &FieldRecoverer<'_>,
        entries: &mut Vec<Diagnostic>,
        missing_fields: &mut Vec<String>,
    ) -> std::result::Result<OccasionRecord, RowError> {
        let block = chunks.occasion(occasion);
        let (raw, omitted) = recoverer
            .align_occasion(&block.scalars)
            .into_result(occasion.section())?;

        if let Some(omitted) = omitted {
            let field = format!("{}{}", omitted, occasion.suffix());
            debug!("Record {}: {} was never collected", record.id, field);
            entries.push(Diagnostic::RecoveryApplied {
                record_id: record.id.clone(),
                section: occasion.section().to_string(),
                ruleset_version: self.rules.version.clone(),
                missing_field: omitted,
            });
            missing_fields.push(field);
        }

        let (fields, violations) = coerce_field_set(&record.id, occasion.suffix(), &self.schema, &raw);
        entries.extend(violations.into_iter().map(Diagnostic::DomainViolation));

        let raw_timestamp = match occasion {
            Occasion::Pre => &chunks.metadata[1],
            Occasion::Post => &chunks.metadata[2],
        };
        let (date, timestamp, violations) = self.coerce_timestamp(&record.id, occasion, raw_timestamp);
        entries.extend(violations.into_iter().map(Diagnostic::DomainViolation));

        Ok(OccasionRecord {
            fields,
            texts: block.texts.clone(),
            timestamp,
            date,
        })
    }

    /// Date and full timestamp of one occasion
    fn coerce_timestamp(
        &self,
        record_id: &str,
        occasion: Occasion,
        raw: &str,
    ) -> (FieldValue, Option<chrono::DateTime<chrono::Utc>>, Vec<DomainViolation>) {
        let mut violations = Vec::new();
        let date = coerce_value(&FieldDomain::Date, Some(raw));
        if let Some(reason) = date.violation {
            violations.push(DomainViolation {
                record_id: record_id.to_string(),
                field: format!("Date{}", occasion.suffix()),
                value: raw.to_string(),
                reason,
            });
        }

        let timestamp = parse_timestamp(raw);
        if timestamp.is_none() && !raw.trim().is_empty() {
            violations.push(DomainViolation {
                record_id: record_id.to_string(),
                field: format!("Timestamp{}", occasion.suffix()),
                value: raw.to_string(),
                reason: "not an RFC 3339 timestamp".to_string(),
            });
        }
        (date.value, timestamp, violations)
    }

    /// Placeholder row for a record that could not be tidied
    fn failed_record(&self, record: &RawRecord, error: RowError) -> TidyRecord {
        let occasion_names = self.schema.occasion_names();
        TidyRecord {
            id: record.id.clone(),
            status: RowStatus::Failed { error },
            pre: OccasionRecord::empty(&occasion_names),
            continuation: FieldSet::all_missing(&self.schema.continuation_names()),
            post: OccasionRecord::empty(&occasion_names),
            survey_status: FieldValue::Missing,
        }
    }
}

/// Report every row whose participant id was already seen earlier in the batch
fn flag_duplicate_ids(records: &[RawRecord], diagnostics: &mut DiagnosticsReport) {
    let mut seen = HashSet::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        if !seen.insert(record.id.as_str()) {
            warn!("Duplicate participant id {} at row {}", record.id, row);
            diagnostics.push(Diagnostic::DuplicateId {
                record_id: record.id.clone(),
                row,
            });
        }
    }
}
