//! Cross-occasion consistency of demographic fields
//!
//! Demographics were asked at both occasions, so the pre and post answers of
//! one participant should agree. Disagreements are surfaced, never repaired.

use super::diagnostics::ConsistencyMismatch;
use crate::models::{FieldValue, TidyRecord};
use serde::Serialize;

/// Equality of one field across occasions for every record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldConsistency {
    pub field: String,
    /// One flag per record; `None` for records that failed and have no values
    pub flags: Vec<Option<bool>>,
    pub mismatches: usize,
}

impl FieldConsistency {
    pub fn checked(&self) -> usize {
        self.flags.iter().filter(|flag| flag.is_some()).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub fields: Vec<FieldConsistency>,
}

impl ConsistencyReport {
    pub fn field(&self, name: &str) -> Option<&FieldConsistency> {
        self.fields.iter().find(|field| field.field == name)
    }

    pub fn total_mismatches(&self) -> usize {
        self.fields.iter().map(|field| field.mismatches).sum()
    }
}

/// Whether a pre and a post value agree
pub fn values_agree(pre: &FieldValue, post: &FieldValue, missing_pairs_consistent: bool) -> bool {
    match (pre, post) {
        (FieldValue::Missing, FieldValue::Missing) => missing_pairs_consistent,
        (pre, post) => pre == post,
    }
}

/// Check one field of one record; `None` when the record failed
pub fn check_record(record: &TidyRecord, field: &str, missing_pairs_consistent: bool) -> Option<bool> {
    if record.status.is_failed() {
        return None;
    }
    let pre = record.pre.fields.get(field).unwrap_or(&FieldValue::Missing);
    let post = record.post.fields.get(field).unwrap_or(&FieldValue::Missing);
    Some(values_agree(pre, post, missing_pairs_consistent))
}

/// Check every invariant field over the batch
pub fn check_batch<S: AsRef<str>>(
    records: &[TidyRecord],
    fields: &[S],
    missing_pairs_consistent: bool,
) -> (ConsistencyReport, Vec<ConsistencyMismatch>) {
    let mut mismatches = Vec::new();
    let mut report = ConsistencyReport::default();

    for field in fields {
        let field = field.as_ref();
        let flags: Vec<Option<bool>> = records
            .iter()
            .map(|record| check_record(record, field, missing_pairs_consistent))
            .collect();

        for (record, flag) in records.iter().zip(&flags) {
            if *flag == Some(false) {
                mismatches.push(ConsistencyMismatch {
                    record_id: record.id.clone(),
                    field: field.to_string(),
                    pre: record.pre.fields.get(field).cloned().unwrap_or(FieldValue::Missing),
                    post: record.post.fields.get(field).cloned().unwrap_or(FieldValue::Missing),
                });
            }
        }

        report.fields.push(FieldConsistency {
            field: field.to_string(),
            mismatches: flags.iter().filter(|flag| **flag == Some(false)).count(),
            flags,
        });
    }

    (report, mismatches)
}
