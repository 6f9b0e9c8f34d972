//! Type coercion of recovered string fields
//!
//! Blank strings become [`FieldValue::Missing`], the survey tool's
//! `(not asked)` marker becomes [`FieldValue::NotAsked`], and everything else
//! is checked against the field's declared domain. Values outside their
//! domain are kept verbatim as [`FieldValue::Raw`] and reported; they never
//! abort the row.

use super::diagnostics::DomainViolation;
use super::recovery::RawFieldSet;
use crate::constants::{DATE_TIME_SEPARATOR, NOT_ASKED};
use crate::models::{FieldSet, FieldValue};
use crate::schema::{FieldDomain, SurveySchema};
use chrono::{DateTime, NaiveDate, Utc};

/// Typed value plus the reason it fell outside its domain, if it did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coercion {
    pub value: FieldValue,
    pub violation: Option<String>,
}

impl Coercion {
    fn ok(value: FieldValue) -> Self {
        Self {
            value,
            violation: None,
        }
    }

    fn raw(value: &str, reason: String) -> Self {
        Self {
            value: FieldValue::Raw(value.to_string()),
            violation: Some(reason),
        }
    }
}

/// Date part of a combined date-time string such as `2019-02-11T04:36:04.112Z`
pub fn parse_date_prefix(value: &str) -> Option<NaiveDate> {
    let date = value.trim().split(DATE_TIME_SEPARATOR).next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Full RFC 3339 timestamp, normalised to UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

/// Coerce one raw value into its declared domain
pub fn coerce_value(domain: &FieldDomain, raw: Option<&str>) -> Coercion {
    let value = match raw.map(str::trim) {
        None | Some("") => return Coercion::ok(FieldValue::Missing),
        Some(NOT_ASKED) => return Coercion::ok(FieldValue::NotAsked),
        Some(value) => value,
    };

    match domain {
        FieldDomain::Integer { min, max } => match value.parse::<i64>() {
            Ok(number) if (*min..=*max).contains(&number) => {
                Coercion::ok(FieldValue::Integer(number))
            }
            Ok(number) => Coercion::raw(value, format!("{} is outside {}..={}", number, min, max)),
            Err(_) => Coercion::raw(value, "not a whole number".to_string()),
        },
        FieldDomain::Categorical(known) => {
            if known.iter().any(|category| category == value) {
                Coercion::ok(FieldValue::Category(value.to_string()))
            } else {
                Coercion::raw(value, format!("not one of {:?}", known))
            }
        }
        FieldDomain::Pattern(pattern) => {
            if pattern.is_match(value) {
                Coercion::ok(FieldValue::Text(value.to_string()))
            } else {
                Coercion::raw(value, format!("does not match {}", pattern.as_str()))
            }
        }
        FieldDomain::FreeText => Coercion::ok(FieldValue::Text(value.to_string())),
        FieldDomain::Date => match parse_date_prefix(value) {
            Some(date) => Coercion::ok(FieldValue::Date(date)),
            None => Coercion::raw(value, "no YYYY-MM-DD date prefix".to_string()),
        },
    }
}

/// Coerce an already-typed value again; typed values come back unchanged
pub fn recoerce(domain: &FieldDomain, value: &FieldValue) -> Coercion {
    coerce_value(domain, value.render().as_deref())
}

/// Coerce every field of a recovered set using the schema's domains
///
/// `suffix` is appended to field names in reported violations.
pub fn coerce_field_set(
    record_id: &str,
    suffix: &str,
    schema: &SurveySchema,
    raw: &RawFieldSet,
) -> (FieldSet<FieldValue>, Vec<DomainViolation>) {
    let mut violations = Vec::new();
    let typed = raw.map(|name, value| {
        let coercion = match schema.domain(name) {
            Some(domain) => coerce_value(domain, value.as_deref()),
            None => coerce_value(&FieldDomain::FreeText, value.as_deref()),
        };
        if let Some(reason) = coercion.violation {
            violations.push(DomainViolation {
                record_id: record_id.to_string(),
                field: format!("{}{}", name, suffix),
                value: value.clone().unwrap_or_default(),
                reason,
            });
        }
        coercion.value
    });
    (typed, violations)
}
