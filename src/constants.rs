//! Application constants for the survey tidier
//!
//! This module contains the structural delimiters, canonical field orderings,
//! known categorical values and default bounds used throughout the pipeline.

// =============================================================================
// Structural Delimiters
// =============================================================================

/// Separates the four top-level sections of an encoded response
pub const SECTION_DELIMITER: char = ']';

/// Peels the leading markers and the free-text block off an occasion block
pub const BLOCK_DELIMITER: char = '[';

/// Separates scalar fields inside a section
pub const FIELD_DELIMITER: char = ',';

/// Separates status and timestamps in the metadata section
pub const METADATA_DELIMITER: char = '>';

/// Separates the date from the time of day in a timestamp
pub const DATE_TIME_SEPARATOR: char = 'T';

/// Wraps free-text responses; delimiters inside a wrapper never split
pub const TEXT_WRAPPER: char = '|';

// =============================================================================
// Expected Piece Counts
// =============================================================================

/// Top-level split: four sections plus the closing-bracket remainder
pub const TOP_LEVEL_PIECES: usize = 5;

/// Occasion block split: two empty leading markers, scalar list, text block
pub const OCCASION_BLOCK_PIECES: usize = 4;

/// Metadata split: status, pre timestamp, post timestamp
pub const METADATA_PIECES: usize = 3;

/// Continuation section fields once the categorical answer is rebuilt
pub const CONTINUATION_FIELDS: usize = 6;

/// Most leading fragments a single categorical answer may span
pub const MAX_CATEGORY_FRAGMENTS: usize = 3;

// =============================================================================
// Field Names
// =============================================================================

/// Number of intellectual-humility items asked at each occasion
pub const ITEM_COUNT: usize = 16;

pub const AGE: &str = "Age";
pub const SEX: &str = "Sex";
pub const RACE_ETHNICITY: &str = "Race_ethnicity";
pub const POLITICAL_IDEOLOGY: &str = "Political_ideology";
pub const RELIGION: &str = "Religion";
pub const ZIP: &str = "Zip";
pub const CONDITION: &str = "Condition";

/// Demographic and assignment fields following the items, in encoded order
pub const DEMOGRAPHIC_FIELDS: &[&str] = &[
    AGE,
    SEX,
    RACE_ETHNICITY,
    POLITICAL_IDEOLOGY,
    RELIGION,
    ZIP,
    CONDITION,
];

/// Fields collected at both occasions that must agree
pub const INVARIANT_FIELDS: &[&str] = &[AGE, SEX, RACE_ETHNICITY, POLITICAL_IDEOLOGY, RELIGION, ZIP];

pub const CONTINUE: &str = "Continue";
pub const ENJOYMENT: &str = "Enjoyment";
pub const INTEREST: &str = "Interest";
pub const EFFORT: &str = "Effort";
pub const FOLLOWUP_CONTACT: &str = "Followup_contact";
pub const FOLLOWUP_SHARE: &str = "Followup_share";

/// Continuation section fields in encoded order
pub const CONTINUATION_FIELD_NAMES: &[&str] = &[
    CONTINUE,
    ENJOYMENT,
    INTEREST,
    EFFORT,
    FOLLOWUP_CONTACT,
    FOLLOWUP_SHARE,
];

pub const STATUS: &str = "Status";

/// Suffix for fields recorded before the intervention
pub const PRE_SUFFIX: &str = "_pre";

/// Suffix for fields recorded after the intervention
pub const POST_SUFFIX: &str = "_post";

// =============================================================================
// Known Values
// =============================================================================

/// Marker the survey tool writes for a question that was never shown
pub const NOT_ASKED: &str = "(not asked)";

/// Experiment condition code carried by every collected row in this sample
pub const DEFAULT_CONDITION_CODE: &str = "B1";

/// Answers to the "continue to the second session" question
pub const CONTINUE_CATEGORIES: &[&str] = &["Yes", "No", "Yes, but later", "No, not now, thanks"];

/// Answers to the follow-up questions
pub const FOLLOWUP_CATEGORIES: &[&str] = &["Yes", "No"];

pub const SEX_CATEGORIES: &[&str] = &["Female", "Male", "Other", "Prefer not to say"];

pub const POLITICAL_CATEGORIES: &[&str] = &[
    "Very liberal",
    "Liberal",
    "Moderate",
    "Conservative",
    "Very conservative",
    "Prefer not to say",
];

/// US five digit zip code
pub const DEFAULT_ZIP_PATTERN: &str = r"^\d{5}$";

// =============================================================================
// Observed Bounds
// =============================================================================

/// Intellectual-humility items are answered on a 0-6 scale
pub const ITEM_MIN: i64 = 0;
pub const ITEM_MAX: i64 = 6;

/// Session ratings share the item scale
pub const RATING_MIN: i64 = 0;
pub const RATING_MAX: i64 = 6;

/// Participants were adults; the oldest observed was in their eighties
pub const AGE_MIN: i64 = 18;
pub const AGE_MAX: i64 = 99;

// =============================================================================
// Recovery Rules
// =============================================================================

/// Version of the declared recovery rule table
pub const RECOVERY_RULESET_VERSION: &str = "2019.1";

/// Comma count of a scalar list where every occasion field was collected
pub const FULL_ROW_COMMAS: usize = 23;

/// Comma count of a scalar list where one optional field was never collected
pub const SHORT_ROW_COMMAS: usize = 22;

// =============================================================================
// Input and Output
// =============================================================================

pub const DEFAULT_ID_COLUMN: &str = "id";
pub const DEFAULT_ENCODED_COLUMN: &str = "response";

/// Name of the logging target used by the env filter
pub const LOG_TARGET: &str = "survey_tidy";

/// Build the name of an occasion field with its suffix
pub fn occasion_column(field: &str, suffix: &str) -> String {
    format!("{}{}", field, suffix)
}

/// Item field name, numbered from one
pub fn item_name(index: usize) -> String {
    format!("Q{}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_names_are_one_based() {
        assert_eq!(item_name(0), "Q1");
        assert_eq!(item_name(ITEM_COUNT - 1), "Q16");
    }

    #[test]
    fn test_row_comma_counts_match_field_count() {
        // One comma per field, the last one introducing the text block
        assert_eq!(FULL_ROW_COMMAS, ITEM_COUNT + DEMOGRAPHIC_FIELDS.len());
        assert_eq!(SHORT_ROW_COMMAS + 1, FULL_ROW_COMMAS);
    }

    #[test]
    fn test_occasion_column() {
        assert_eq!(occasion_column("Q5", PRE_SUFFIX), "Q5_pre");
        assert_eq!(occasion_column(AGE, POST_SUFFIX), "Age_post");
    }
}
