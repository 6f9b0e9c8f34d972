//! Diagnostics accumulated over a pipeline run
//!
//! Every deviation from the documented encoding ends up either in the typed
//! output as an explicit missing value or here, so nothing is dropped
//! silently. The report serialises to JSON for review next to the table.

use super::recovery::SkipPattern;
use crate::error::{Result, RowError};
use crate::models::FieldValue;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// A value outside its field's declared domain, kept raw in the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainViolation {
    pub record_id: String,
    pub field: String,
    pub value: String,
    pub reason: String,
}

/// Pre and post values of a field that should not change between occasions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyMismatch {
    pub record_id: String,
    pub field: String,
    pub pre: FieldValue,
    pub post: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Structural or alignment failure; the row's fields are all missing
    RowFailed { record_id: String, error: RowError },
    /// A re-anchoring rule was applied
    RecoveryApplied {
        record_id: String,
        section: String,
        ruleset_version: String,
        missing_field: String,
    },
    DomainViolation(DomainViolation),
    ConsistencyMismatch(ConsistencyMismatch),
    /// A participant id already used by an earlier row of the batch
    DuplicateId { record_id: String, row: usize },
    /// The batch skip pattern does not confirm the declared omitted field
    SkipPatternDisagreement {
        declared: Vec<String>,
        derived: Option<String>,
    },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::RowFailed { .. } => "row_failed",
            Diagnostic::RecoveryApplied { .. } => "recovery_applied",
            Diagnostic::DomainViolation(_) => "domain_violation",
            Diagnostic::ConsistencyMismatch(_) => "consistency_mismatch",
            Diagnostic::DuplicateId { .. } => "duplicate_id",
            Diagnostic::SkipPatternDisagreement { .. } => "skip_pattern_disagreement",
        }
    }

    pub fn record_id(&self) -> Option<&str> {
        match self {
            Diagnostic::RowFailed { record_id, .. }
            | Diagnostic::RecoveryApplied { record_id, .. }
            | Diagnostic::DuplicateId { record_id, .. } => Some(record_id),
            Diagnostic::DomainViolation(violation) => Some(&violation.record_id),
            Diagnostic::ConsistencyMismatch(mismatch) => Some(&mismatch.record_id),
            Diagnostic::SkipPatternDisagreement { .. } => None,
        }
    }
}

/// Everything the run noticed, in the order it was noticed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    pub ruleset_version: String,
    pub skip_pattern: Option<SkipPattern>,
    pub entries: Vec<Diagnostic>,
}

impl DiagnosticsReport {
    pub fn new(ruleset_version: impl Into<String>) -> Self {
        Self {
            ruleset_version: ruleset_version.into(),
            skip_pattern: None,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn count(&self, kind: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.kind() == kind)
            .count()
    }

    pub fn for_record<'a>(&'a self, record_id: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.entries
            .iter()
            .filter(move |entry| entry.record_id() == Some(record_id))
    }

    pub fn domain_violations(&self) -> impl Iterator<Item = &DomainViolation> {
        self.entries.iter().filter_map(|entry| match entry {
            Diagnostic::DomainViolation(violation) => Some(violation),
            _ => None,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        info!(
            "Wrote {} diagnostics to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }
}
