//! Checked splitting of the encoded response into nested chunks
//!
//! The encoding nests one delimiter style inside another, so splits run in a
//! fixed priority order: sections on `]`, occasion blocks on `[`, metadata on
//! `>`. Every split is checked against its expected piece count and leaves a
//! [`SplitTrace`] behind so a mismatch can be diagnosed from the row alone.
//! Delimiters inside a `|...|` free-text wrapper never split.

use crate::constants::{
    BLOCK_DELIMITER, METADATA_DELIMITER, METADATA_PIECES, OCCASION_BLOCK_PIECES,
    SECTION_DELIMITER, TEXT_WRAPPER, TOP_LEVEL_PIECES,
};
use crate::error::RowError;
use crate::models::Occasion;
use serde::Serialize;

/// One split stage: which delimiter, and how many pieces it must produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDirective {
    pub stage: &'static str,
    pub delimiter: char,
    pub expected_pieces: usize,
}

impl SplitDirective {
    pub const fn new(stage: &'static str, delimiter: char, expected_pieces: usize) -> Self {
        Self {
            stage,
            delimiter,
            expected_pieces,
        }
    }
}

/// Ordered split directives for the whole encoding
#[derive(Debug, Clone)]
pub struct EncodingLayout {
    pub top_level: SplitDirective,
    pub occasion_block: SplitDirective,
    pub metadata: SplitDirective,
    pub wrapper: char,
}

impl Default for EncodingLayout {
    fn default() -> Self {
        Self {
            top_level: SplitDirective::new("sections", SECTION_DELIMITER, TOP_LEVEL_PIECES),
            occasion_block: SplitDirective::new("block", BLOCK_DELIMITER, OCCASION_BLOCK_PIECES),
            metadata: SplitDirective::new("metadata", METADATA_DELIMITER, METADATA_PIECES),
            wrapper: TEXT_WRAPPER,
        }
    }
}

/// What one split stage observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitTrace {
    pub stage: String,
    pub delimiter: char,
    pub expected: usize,
    pub found: usize,
    /// Trailing text past the last expected piece (empty when none)
    pub remainder: String,
}

/// Pieces of one checked split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub pieces: Vec<String>,
    pub trace: SplitTrace,
}

/// Scalar list and free-text responses of one occasion block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccasionChunks {
    pub scalars: String,
    pub texts: Vec<String>,
}

/// Every section of one encoded response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChunks {
    pub pre: OccasionChunks,
    pub continuation: String,
    pub post: OccasionChunks,
    /// Status, pre timestamp, post timestamp
    pub metadata: Vec<String>,
    pub trace: Vec<SplitTrace>,
}

impl RecordChunks {
    pub fn occasion(&self, occasion: Occasion) -> &OccasionChunks {
        match occasion {
            Occasion::Pre => &self.pre,
            Occasion::Post => &self.post,
        }
    }
}

/// Split on `delimiter`, ignoring delimiters inside `wrapper` pairs
pub fn split_outside_wrapper(text: &str, delimiter: char, wrapper: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut inside = false;
    let mut start = 0;

    for (index, ch) in text.char_indices() {
        if ch == wrapper {
            inside = !inside;
        } else if ch == delimiter && !inside {
            pieces.push(&text[start..index]);
            start = index + ch.len_utf8();
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// Split and validate the piece count
///
/// On a mismatch the remainder is the text past the last expected delimiter
/// when there are too many pieces, or the last piece when there are too few.
pub fn split_checked(
    text: &str,
    directive: &SplitDirective,
    wrapper: char,
    section: &str,
) -> Result<Chunk, RowError> {
    let pieces = split_outside_wrapper(text, directive.delimiter, wrapper);
    let expected = directive.expected_pieces;
    let found = pieces.len();
    let stage = stage_name(section, directive.stage);

    if found != expected {
        let remainder = if found > expected {
            pieces[expected.saturating_sub(1)..].join(&directive.delimiter.to_string())
        } else {
            pieces.last().map(|piece| piece.to_string()).unwrap_or_default()
        };
        return Err(RowError::StructuralMismatch {
            stage,
            delimiter: directive.delimiter,
            expected,
            found,
            remainder,
        });
    }

    Ok(Chunk {
        pieces: pieces.iter().map(|piece| piece.to_string()).collect(),
        trace: SplitTrace {
            stage,
            delimiter: directive.delimiter,
            expected,
            found,
            remainder: String::new(),
        },
    })
}

fn stage_name(section: &str, stage: &str) -> String {
    if section.is_empty() {
        stage.to_string()
    } else {
        format!("{}.{}", section, stage)
    }
}

/// Parse a sequence of `|...|` wrapped responses
pub fn parse_text_block(block: &str, wrapper: char, section: &str) -> Result<Vec<String>, RowError> {
    let mut responses = Vec::new();
    let mut rest = block;

    while !rest.is_empty() {
        let opened = rest.strip_prefix(wrapper).ok_or_else(|| unwrapped_text(block, section))?;
        let close = opened.find(wrapper).ok_or_else(|| unwrapped_text(block, section))?;
        responses.push(opened[..close].to_string());
        rest = &opened[close + wrapper.len_utf8()..];
    }

    if responses.is_empty() {
        return Err(unwrapped_text(block, section));
    }
    Ok(responses)
}

fn unwrapped_text(block: &str, section: &str) -> RowError {
    RowError::StructuralMismatch {
        stage: stage_name(section, "text"),
        delimiter: TEXT_WRAPPER,
        expected: 2,
        found: block.matches(TEXT_WRAPPER).count(),
        remainder: block.to_string(),
    }
}

/// Split an occasion block into its scalar list and free-text responses
pub fn chunk_occasion(
    block: &str,
    layout: &EncodingLayout,
    section: &str,
    trace: &mut Vec<SplitTrace>,
) -> Result<OccasionChunks, RowError> {
    let chunk = split_checked(block, &layout.occasion_block, layout.wrapper, section)?;
    trace.push(chunk.trace);

    // Both leading markers are empty in every collected row
    for (index, marker) in chunk.pieces[..2].iter().enumerate() {
        if !marker.is_empty() {
            return Err(RowError::StructuralMismatch {
                stage: stage_name(section, &format!("marker{}", index + 1)),
                delimiter: layout.occasion_block.delimiter,
                expected: layout.occasion_block.expected_pieces,
                found: layout.occasion_block.expected_pieces,
                remainder: marker.clone(),
            });
        }
    }

    let texts = parse_text_block(&chunk.pieces[3], layout.wrapper, section)?;
    Ok(OccasionChunks {
        scalars: chunk.pieces[2].clone(),
        texts,
    })
}

/// Run every split directive over one encoded response
pub fn chunk_record(encoded: &str, layout: &EncodingLayout) -> Result<RecordChunks, RowError> {
    let mut trace = Vec::new();

    let sections = split_checked(encoded, &layout.top_level, layout.wrapper, "")?;
    let remainder = &sections.pieces[TOP_LEVEL_PIECES - 1];
    if !remainder.trim().is_empty() {
        return Err(RowError::StructuralMismatch {
            stage: layout.top_level.stage.to_string(),
            delimiter: layout.top_level.delimiter,
            expected: layout.top_level.expected_pieces,
            found: sections.pieces.len(),
            remainder: remainder.clone(),
        });
    }
    let mut top_trace = sections.trace;
    top_trace.remainder = remainder.clone();
    trace.push(top_trace);

    let pre = chunk_occasion(&sections.pieces[0], layout, Occasion::Pre.section(), &mut trace)?;
    let post = chunk_occasion(&sections.pieces[2], layout, Occasion::Post.section(), &mut trace)?;

    let metadata = split_checked(&sections.pieces[3], &layout.metadata, layout.wrapper, "")?;
    trace.push(metadata.trace);

    Ok(RecordChunks {
        pre,
        continuation: sections.pieces[1].clone(),
        post,
        metadata: metadata.pieces,
        trace,
    })
}
