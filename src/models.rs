//! Core data structures for survey tidying.
//!
//! Defines the raw input row, the ordered field sets produced by recovery,
//! the typed values produced by coercion and the tidy output record.

use crate::constants::{NOT_ASKED, POST_SUFFIX, PRE_SUFFIX};
use crate::error::RowError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the raw export: an identifier and the packed response string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub encoded: String,
}

impl RawRecord {
    pub fn new(id: impl Into<String>, encoded: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            encoded: encoded.into(),
        }
    }
}

/// Measurement occasion relative to the intervention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occasion {
    Pre,
    Post,
}

impl Occasion {
    pub fn suffix(&self) -> &'static str {
        match self {
            Occasion::Pre => PRE_SUFFIX,
            Occasion::Post => POST_SUFFIX,
        }
    }

    /// Section label used in traces and diagnostics
    pub fn section(&self) -> &'static str {
        match self {
            Occasion::Pre => "pre",
            Occasion::Post => "post",
        }
    }
}

/// Named fields in canonical order
///
/// Values are `Option<String>` after recovery (`None` is an explicitly
/// missing field) and [`FieldValue`] after coercion. Insertion order is the
/// canonical order; inserting an existing name replaces its value in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSet<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for FieldSet<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> FieldSet<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: V) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Transform every value, keeping names and order
    pub fn map<U>(&self, mut f: impl FnMut(&str, &V) -> U) -> FieldSet<U> {
        FieldSet {
            entries: self
                .entries
                .iter()
                .map(|(name, value)| (name.clone(), f(name, value)))
                .collect(),
        }
    }
}

impl FieldSet<Option<String>> {
    /// Raw field set from names and values zipped positionally
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Option<String>)>) -> Self {
        let mut set = Self::new();
        for (name, value) in pairs {
            set.insert(name, value);
        }
        set
    }

    /// Raw value of a field, `None` when absent or explicitly missing
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.as_deref())
    }
}

impl FieldSet<FieldValue> {
    /// Field set where every name is missing, used for failed rows
    pub fn all_missing<S: AsRef<str>>(names: &[S]) -> Self {
        let mut set = Self::new();
        for name in names {
            set.insert(name.as_ref(), FieldValue::Missing);
        }
        set
    }

    pub fn is_missing(&self, name: &str) -> bool {
        self.get(name).is_none_or(FieldValue::is_missing)
    }
}

/// Typed value of one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Blank in the source, or never collected
    Missing,
    /// The survey tool did not show the question
    NotAsked,
    Integer(i64),
    Category(String),
    Text(String),
    Date(NaiveDate),
    /// Present but outside the field's declared domain, kept verbatim
    Raw(String),
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Category(value) | FieldValue::Text(value) | FieldValue::Raw(value) => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(date) => Some(*date),
            _ => None,
        }
    }

    /// Rendered text for output columns, `None` for missing
    pub fn render(&self) -> Option<String> {
        match self {
            FieldValue::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Missing => Ok(()),
            FieldValue::NotAsked => write!(f, "{}", NOT_ASKED),
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Category(value) | FieldValue::Text(value) | FieldValue::Raw(value) => {
                write!(f, "{}", value)
            }
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Outcome of processing one raw record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowStatus {
    /// Every section matched its documented layout
    Complete,
    /// A recovery rule re-anchored fields; listed fields were never collected
    Recovered { missing_fields: Vec<String> },
    /// Structural or alignment failure; all fields are missing
    Failed { error: RowError },
}

impl RowStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RowStatus::Complete => "complete",
            RowStatus::Recovered { .. } => "recovered",
            RowStatus::Failed { .. } => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RowStatus::Failed { .. })
    }
}

/// Everything recorded for one occasion of one participant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccasionRecord {
    pub fields: FieldSet<FieldValue>,
    /// Free-text responses, in the order they were written
    pub texts: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub date: FieldValue,
}

impl OccasionRecord {
    pub fn empty<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            fields: FieldSet::all_missing(names),
            texts: Vec::new(),
            timestamp: None,
            date: FieldValue::Missing,
        }
    }
}

/// Final per-participant row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidyRecord {
    pub id: String,
    pub status: RowStatus,
    pub pre: OccasionRecord,
    pub continuation: FieldSet<FieldValue>,
    pub post: OccasionRecord,
    /// Completion status written by the survey tool
    pub survey_status: FieldValue,
}

impl TidyRecord {
    pub fn occasion(&self, occasion: Occasion) -> &OccasionRecord {
        match occasion {
            Occasion::Pre => &self.pre,
            Occasion::Post => &self.post,
        }
    }
}
