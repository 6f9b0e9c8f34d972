//! Declared field schema for the survey export.
//!
//! Every logical field has exactly one canonical position and one declared
//! domain. The recoverer uses positions; the coercer and the skip-pattern
//! derivation use domains.

use crate::config::TidyConfig;
use crate::constants::{
    AGE, CONDITION, CONTINUATION_FIELDS, CONTINUE, CONTINUE_CATEGORIES, EFFORT, ENJOYMENT,
    FOLLOWUP_CATEGORIES, FOLLOWUP_CONTACT, FOLLOWUP_SHARE, INTEREST, ITEM_COUNT,
    POLITICAL_CATEGORIES, POLITICAL_IDEOLOGY, RACE_ETHNICITY, RATING_MAX, RATING_MIN, RELIGION,
    SEX, SEX_CATEGORIES, ZIP, item_name,
};
use crate::error::{Result, TidyError};
use regex::Regex;
use tracing::debug;

/// Set of values a field may legitimately hold
#[derive(Debug, Clone)]
pub enum FieldDomain {
    /// Whole number within inclusive bounds
    Integer { min: i64, max: i64 },
    /// One of a fixed set of answers, compared exactly after trimming
    Categorical(Vec<String>),
    /// Free-form string matching a pattern
    Pattern(Regex),
    /// Anything goes
    FreeText,
    /// Date, optionally followed by a time-of-day suffix
    Date,
}

impl FieldDomain {
    pub fn categorical(values: &[&str]) -> Self {
        FieldDomain::Categorical(values.iter().map(|v| v.to_string()).collect())
    }

    /// Whether the domain rejects some non-blank values
    pub fn is_restrictive(&self) -> bool {
        !matches!(self, FieldDomain::FreeText)
    }

    /// Whether a trimmed, non-blank value belongs to this domain
    pub fn accepts(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            FieldDomain::Integer { min, max } => value
                .parse::<i64>()
                .is_ok_and(|number| (*min..=*max).contains(&number)),
            FieldDomain::Categorical(values) => values.iter().any(|known| known == value),
            FieldDomain::Pattern(pattern) => pattern.is_match(value),
            FieldDomain::FreeText => true,
            FieldDomain::Date => crate::pipeline::coercion::parse_date_prefix(value).is_some(),
        }
    }

    /// Whether the domain positively identifies a value as its own.
    ///
    /// Free text claims nothing: every string is free text, so it carries no
    /// evidence about where a value came from.
    pub fn claims(&self, value: &str) -> bool {
        self.is_restrictive() && !value.trim().is_empty() && self.accepts(value)
    }
}

/// One named field and its domain
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub domain: FieldDomain,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, domain: FieldDomain) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }
}

/// Canonical field orderings and domains for one survey
#[derive(Debug, Clone)]
pub struct SurveySchema {
    occasion: Vec<FieldSpec>,
    continuation: Vec<FieldSpec>,
}

impl SurveySchema {
    /// Build the schema with bounds and codes taken from configuration
    pub fn from_config(config: &TidyConfig) -> Result<Self> {
        let zip_pattern = Regex::new(&config.zip_pattern).map_err(|source| TidyError::Pattern {
            pattern: config.zip_pattern.clone(),
            source,
        })?;

        let mut occasion: Vec<FieldSpec> = (0..ITEM_COUNT)
            .map(|index| {
                FieldSpec::new(
                    item_name(index),
                    FieldDomain::Integer {
                        min: config.item_bounds.0,
                        max: config.item_bounds.1,
                    },
                )
            })
            .collect();

        occasion.extend([
            FieldSpec::new(
                AGE,
                FieldDomain::Integer {
                    min: config.age_bounds.0,
                    max: config.age_bounds.1,
                },
            ),
            FieldSpec::new(SEX, FieldDomain::categorical(SEX_CATEGORIES)),
            FieldSpec::new(RACE_ETHNICITY, FieldDomain::FreeText),
            FieldSpec::new(POLITICAL_IDEOLOGY, FieldDomain::categorical(POLITICAL_CATEGORIES)),
            FieldSpec::new(RELIGION, FieldDomain::FreeText),
            FieldSpec::new(ZIP, FieldDomain::Pattern(zip_pattern)),
            FieldSpec::new(
                CONDITION,
                FieldDomain::Categorical(config.condition_codes.clone()),
            ),
        ]);

        let rating = FieldDomain::Integer {
            min: RATING_MIN,
            max: RATING_MAX,
        };
        let continuation = vec![
            FieldSpec::new(CONTINUE, FieldDomain::categorical(CONTINUE_CATEGORIES)),
            FieldSpec::new(ENJOYMENT, rating.clone()),
            FieldSpec::new(INTEREST, rating.clone()),
            FieldSpec::new(EFFORT, rating),
            FieldSpec::new(FOLLOWUP_CONTACT, FieldDomain::categorical(FOLLOWUP_CATEGORIES)),
            FieldSpec::new(FOLLOWUP_SHARE, FieldDomain::categorical(FOLLOWUP_CATEGORIES)),
        ];
        debug_assert_eq!(continuation.len(), CONTINUATION_FIELDS);

        debug!(
            "Built survey schema: {} occasion fields, {} continuation fields",
            occasion.len(),
            continuation.len()
        );

        Ok(Self {
            occasion,
            continuation,
        })
    }

    /// Occasion fields in canonical order
    pub fn occasion_fields(&self) -> &[FieldSpec] {
        &self.occasion
    }

    pub fn occasion_names(&self) -> Vec<&str> {
        self.occasion.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Continuation fields in canonical order
    pub fn continuation_fields(&self) -> &[FieldSpec] {
        &self.continuation
    }

    pub fn continuation_names(&self) -> Vec<&str> {
        self.continuation
            .iter()
            .map(|spec| spec.name.as_str())
            .collect()
    }

    /// Canonical position of an occasion field
    pub fn position(&self, name: &str) -> Option<usize> {
        self.occasion.iter().position(|spec| spec.name == name)
    }

    /// Domain of any field, occasion or continuation
    pub fn domain(&self, name: &str) -> Option<&FieldDomain> {
        self.occasion
            .iter()
            .chain(self.continuation.iter())
            .find(|spec| spec.name == name)
            .map(|spec| &spec.domain)
    }

    /// Known answers of a categorical field, empty for other domains
    pub fn categories(&self, name: &str) -> &[String] {
        match self.domain(name) {
            Some(FieldDomain::Categorical(values)) => values,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CONTINUATION_FIELD_NAMES, DEMOGRAPHIC_FIELDS, FULL_ROW_COMMAS};

    fn schema() -> SurveySchema {
        SurveySchema::from_config(&TidyConfig::default()).unwrap()
    }

    #[test]
    fn test_canonical_order() {
        let schema = schema();
        let names = schema.occasion_names();
        assert_eq!(names.len(), FULL_ROW_COMMAS);
        assert_eq!(names[0], "Q1");
        assert_eq!(names[15], "Q16");
        assert_eq!(&names[ITEM_COUNT..], DEMOGRAPHIC_FIELDS);
        assert_eq!(schema.position(RELIGION), Some(20));
        assert_eq!(schema.continuation_names(), CONTINUATION_FIELD_NAMES);
    }

    #[test]
    fn test_domain_membership() {
        let schema = schema();
        let item = schema.domain("Q5").unwrap();
        assert!(item.accepts("0"));
        assert!(item.accepts(" 6 "));
        assert!(!item.accepts("7"));
        assert!(!item.accepts("five"));

        let zip = schema.domain(ZIP).unwrap();
        assert!(zip.accepts("02139"));
        assert!(!zip.accepts("B1"));

        let condition = schema.domain(CONDITION).unwrap();
        assert!(condition.accepts("B1"));
        assert!(!condition.accepts("12345"));
    }

    #[test]
    fn test_free_text_claims_nothing() {
        let religion = FieldDomain::FreeText;
        assert!(religion.accepts("12345"));
        assert!(!religion.claims("12345"));
        assert!(!FieldDomain::categorical(&["B1"]).claims("  "));
    }

    #[test]
    fn test_invalid_zip_pattern_is_a_configuration_error() {
        let config = TidyConfig::default().with_zip_pattern("(");
        let err = SurveySchema::from_config(&config).unwrap_err();
        assert!(matches!(err, TidyError::Pattern { .. }));
    }
}
