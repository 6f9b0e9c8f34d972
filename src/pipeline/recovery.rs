//! Field recovery: mapping comma-separated fragments onto canonical names
//!
//! Occasion scalar lists come in two shapes. Full rows carry one comma per
//! field. Rows where Religion was never collected carry one comma fewer, so
//! a naive positional split leaves Condition blank and pushes the zip code
//! into Religion and the condition code into Zip. The declared
//! [`RecoveryRules`] table maps each observed comma count to a strategy;
//! anything outside the table is refused.
//!
//! Which field was omitted is a documented assumption drawn from a 186-row
//! sample. [`derive_skip_pattern`] re-derives it from the batch at hand by
//! cross-tabulating each slot against its successor's domain, so the
//! pipeline can refuse to re-anchor when the data no longer agrees.

use crate::constants::{
    CONDITION, CONTINUE, FIELD_DELIMITER, FULL_ROW_COMMAS, MAX_CATEGORY_FRAGMENTS,
    RECOVERY_RULESET_VERSION, RELIGION, SHORT_ROW_COMMAS,
};
use crate::error::RowError;
use crate::models::FieldSet;
use crate::schema::SurveySchema;
use serde::Serialize;
use tracing::debug;

/// Raw field set: `None` marks a field that was never collected or left blank
pub type RawFieldSet = FieldSet<Option<String>>;

/// How a scalar list with a given comma count is mapped onto names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RecoveryStrategy {
    /// One fragment per canonical name
    Positional,
    /// `omitted` was never collected; later fragments move one name right
    ReanchorAfterOmission { omitted: String },
}

/// One row of the rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryRule {
    pub observed_delimiters: usize,
    pub strategy: RecoveryStrategy,
}

/// Declared, versioned recovery rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryRules {
    pub version: String,
    pub rules: Vec<RecoveryRule>,
}

impl Default for RecoveryRules {
    fn default() -> Self {
        Self {
            version: RECOVERY_RULESET_VERSION.to_string(),
            rules: vec![
                RecoveryRule {
                    observed_delimiters: FULL_ROW_COMMAS,
                    strategy: RecoveryStrategy::Positional,
                },
                RecoveryRule {
                    observed_delimiters: SHORT_ROW_COMMAS,
                    strategy: RecoveryStrategy::ReanchorAfterOmission {
                        omitted: RELIGION.to_string(),
                    },
                },
            ],
        }
    }
}

impl RecoveryRules {
    pub fn lookup(&self, observed_delimiters: usize) -> Option<&RecoveryRule> {
        self.rules
            .iter()
            .find(|rule| rule.observed_delimiters == observed_delimiters)
    }

    /// Fields the table assumes can be omitted
    pub fn omitted_fields(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter_map(|rule| match &rule.strategy {
                RecoveryStrategy::ReanchorAfterOmission { omitted } => Some(omitted.as_str()),
                RecoveryStrategy::Positional => None,
            })
            .collect()
    }

    pub fn expected_counts(&self) -> Vec<usize> {
        self.rules.iter().map(|rule| rule.observed_delimiters).collect()
    }
}

/// Result of aligning one fragment list
#[derive(Debug, Clone, PartialEq)]
pub enum Alignment {
    /// Fragments mapped one-to-one onto canonical names
    Aligned(RawFieldSet),
    /// Re-anchored after an omitted field, which is explicitly missing
    ShortByOne(RawFieldSet, String),
    /// No rule applies; the fragments are returned untouched
    Unrecognized {
        fragments: Vec<String>,
        observed: usize,
        reason: String,
    },
}

impl Alignment {
    /// Turn the tagged result into fields plus the omitted name, or a row error
    pub fn into_result(self, section: &str) -> Result<(RawFieldSet, Option<String>), RowError> {
        match self {
            Alignment::Aligned(fields) => Ok((fields, None)),
            Alignment::ShortByOne(fields, missing) => Ok((fields, Some(missing))),
            Alignment::Unrecognized {
                fragments,
                observed,
                reason,
            } => Err(RowError::alignment(section, observed, reason, &fragments)),
        }
    }
}

/// Split a scalar list on the field delimiter, keeping blank fragments
pub fn split_fragments(scalars: &str) -> Vec<String> {
    scalars
        .split(FIELD_DELIMITER)
        .map(|fragment| fragment.to_string())
        .collect()
}

fn blank_to_none(fragment: &str) -> Option<String> {
    if fragment.trim().is_empty() {
        None
    } else {
        Some(fragment.to_string())
    }
}

/// Maps fragment lists onto canonical names using the rule table
#[derive(Debug, Clone)]
pub struct FieldRecoverer<'a> {
    schema: &'a SurveySchema,
    rules: &'a RecoveryRules,
    allow_reanchor: bool,
}

impl<'a> FieldRecoverer<'a> {
    pub fn new(schema: &'a SurveySchema, rules: &'a RecoveryRules) -> Self {
        Self {
            schema,
            rules,
            allow_reanchor: true,
        }
    }

    /// Refuse every re-anchoring rule, e.g. when the batch skip pattern disagrees
    pub fn with_reanchor(mut self, allow: bool) -> Self {
        self.allow_reanchor = allow;
        self
    }

    /// Align an occasion scalar list
    pub fn align_occasion(&self, scalars: &str) -> Alignment {
        let fragments = split_fragments(scalars);
        let observed = fragments.len() - 1;
        let unrecognized = |reason: String| Alignment::Unrecognized {
            fragments: fragments.clone(),
            observed,
            reason,
        };

        let Some(rule) = self.rules.lookup(observed) else {
            return unrecognized(format!(
                "no recovery rule for {} delimiters (known: {:?})",
                observed,
                self.rules.expected_counts()
            ));
        };

        // The last comma introduces the text block, so the final fragment is
        // blank on every well-formed row. On a short row this is exactly the
        // slot a naive split assigns to Condition.
        if let Some(last) = fragments.last().filter(|last| !last.trim().is_empty()) {
            return unrecognized(format!(
                "expected a blank trailing slot, found '{}'",
                last
            ));
        }
        let values = &fragments[..observed];
        let names = self.schema.occasion_names();

        match &rule.strategy {
            RecoveryStrategy::Positional => {
                if values.len() != names.len() {
                    return unrecognized(format!(
                        "positional rule needs {} values, found {}",
                        names.len(),
                        values.len()
                    ));
                }
                let fields = RawFieldSet::from_pairs(
                    names
                        .iter()
                        .zip(values)
                        .map(|(name, value)| (*name, blank_to_none(value))),
                );
                if fields.raw(RELIGION).is_none() && fields.raw(CONDITION).is_none() {
                    return unrecognized(
                        "Religion and Condition are both blank on a full row".to_string(),
                    );
                }
                Alignment::Aligned(fields)
            }
            RecoveryStrategy::ReanchorAfterOmission { omitted } => {
                if !self.allow_reanchor {
                    return unrecognized(format!(
                        "short row, but the batch skip pattern does not confirm '{}' as the omitted field",
                        omitted
                    ));
                }
                self.reanchor(values, &names, omitted)
                    .unwrap_or_else(unrecognized)
            }
        }
    }

    fn reanchor(&self, values: &[String], names: &[&str], omitted: &str) -> Result<Alignment, String> {
        let position = self
            .schema
            .position(omitted)
            .ok_or_else(|| format!("rule names unknown field '{}'", omitted))?;
        if values.len() + 1 != names.len() {
            return Err(format!(
                "re-anchoring needs {} values, found {}",
                names.len() - 1,
                values.len()
            ));
        }

        let mut fields = RawFieldSet::new();
        let mut shifted = values.iter();
        for (index, name) in names.iter().enumerate() {
            if index == position {
                fields.insert(*name, None);
            } else {
                fields.insert(*name, shifted.next().and_then(|value| blank_to_none(value)));
            }
        }

        // Every re-anchored value must land in a domain that accepts it
        for spec in &self.schema.occasion_fields()[position + 1..] {
            if let Some(value) = fields.raw(&spec.name) {
                if spec.domain.is_restrictive() && !spec.domain.accepts(value) {
                    return Err(format!(
                        "re-anchored value '{}' does not fit {}",
                        value, spec.name
                    ));
                }
            }
        }
        if fields.raw(CONDITION).is_none() {
            return Err(format!(
                "{} is still blank after re-anchoring past {}",
                CONDITION, omitted
            ));
        }

        debug!("Re-anchored short row after omitted field {}", omitted);
        Ok(Alignment::ShortByOne(fields, omitted.to_string()))
    }

    /// Align the continuation section, rebuilding a comma-containing answer
    pub fn align_continuation(&self, section: &str) -> Alignment {
        let fragments = split_fragments(section);
        let observed = fragments.len() - 1;
        let names = self.schema.continuation_names();
        let categories = self.schema.categories(CONTINUE);
        let remaining = names.len() - 1;

        let longest_match = (1..=MAX_CATEGORY_FRAGMENTS.min(fragments.len()))
            .rev()
            .find(|&span| {
                let candidate = fragments[..span].join(&FIELD_DELIMITER.to_string());
                categories.iter().any(|known| known == candidate.trim())
            });

        let span = match longest_match {
            Some(span) => span,
            // Unknown or blank answer: only safe when nothing else could have spilled
            None if fragments.len() == names.len() => 1,
            None => {
                return Alignment::Unrecognized {
                    fragments,
                    observed,
                    reason: format!("no known {} answer spans the leading fragments", CONTINUE),
                };
            }
        };

        if fragments.len() - span != remaining {
            return Alignment::Unrecognized {
                reason: format!(
                    "{} answer spans {} fragments, leaving {} for {} fields",
                    CONTINUE,
                    span,
                    fragments.len() - span,
                    remaining
                ),
                fragments,
                observed,
            };
        }

        let answer = fragments[..span].join(&FIELD_DELIMITER.to_string());
        let mut fields = RawFieldSet::new();
        fields.insert(names[0], blank_to_none(&answer));
        for (name, value) in names[1..].iter().zip(&fragments[span..]) {
            fields.insert(*name, blank_to_none(value));
        }
        Alignment::Aligned(fields)
    }
}

/// Contamination of one slot by its successor's domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotCrossTab {
    pub field: String,
    pub successor: String,
    /// Non-blank values observed in this slot
    pub observed: usize,
    /// Values the successor's domain claims and this slot's domain does not
    pub claimed_by_successor: usize,
    pub examples: Vec<String>,
}

impl SlotCrossTab {
    pub fn is_contaminated(&self) -> bool {
        self.claimed_by_successor > 0
    }
}

/// Empirical evidence about which field short rows omit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipPattern {
    pub rows_examined: usize,
    pub short_rows: usize,
    pub crosstab: Vec<SlotCrossTab>,
    /// Head of the contaminated chain that ends at the last slot
    pub omitted_field: Option<String>,
}

const MAX_EXAMPLES: usize = 3;

/// Cross-tabulate adjacent slots of naive positional splits
///
/// `rows` are scalar lists as written. A slot is contaminated when it holds
/// values that its successor's domain claims and its own domain does not.
/// Contamination that starts at some field and runs to the last slot is the
/// signature of that field being skipped.
pub fn derive_skip_pattern<S: AsRef<str>>(rows: &[S], schema: &SurveySchema) -> SkipPattern {
    let specs = schema.occasion_fields();
    let mut crosstab: Vec<SlotCrossTab> = specs
        .windows(2)
        .map(|pair| SlotCrossTab {
            field: pair[0].name.clone(),
            successor: pair[1].name.clone(),
            observed: 0,
            claimed_by_successor: 0,
            examples: Vec::new(),
        })
        .collect();

    let mut short_rows = 0;
    for row in rows {
        let fragments = split_fragments(row.as_ref());
        let values = &fragments[..fragments.len() - 1];
        if values.len() < specs.len() {
            short_rows += 1;
        }

        for (slot, value) in values.iter().enumerate().take(crosstab.len()) {
            if value.trim().is_empty() {
                continue;
            }
            let cell = &mut crosstab[slot];
            cell.observed += 1;
            if specs[slot + 1].domain.claims(value) && !specs[slot].domain.claims(value) {
                cell.claimed_by_successor += 1;
                if cell.examples.len() < MAX_EXAMPLES {
                    cell.examples.push(value.trim().to_string());
                }
            }
        }
    }

    let omitted_field = crosstab
        .iter()
        .rev()
        .take_while(|cell| cell.is_contaminated())
        .last()
        .map(|cell| cell.field.clone());

    debug!(
        "Skip pattern over {} rows ({} short): omitted field {:?}",
        rows.len(),
        short_rows,
        omitted_field
    );

    SkipPattern {
        rows_examined: rows.len(),
        short_rows,
        crosstab,
        omitted_field,
    }
}
