//! Unit tests for the tidying pipeline
//!
//! Shared fixture builders live here; each stage has its own test module.

use crate::config::TidyConfig;
use crate::models::RawRecord;
use crate::pipeline::Pipeline;
use crate::schema::SurveySchema;

pub mod consistency_tests;

pub const PRE_TIMESTAMP: &str = "2019-02-11T04:36:04.112Z";
pub const POST_TIMESTAMP: &str = "2019-02-11T04:52:17.480Z";
pub const CONTINUATION: &str = "Yes,5,5,6,(not asked),(not asked)";

/// One occasion block of an encoded response
#[derive(Debug, Clone)]
pub struct OccasionFixture {
    pub items: Vec<String>,
    pub age: String,
    pub sex: String,
    pub race: String,
    pub politics: String,
    /// `None` drops the slot entirely, producing a short row
    pub religion: Option<String>,
    pub zip: String,
    pub condition: String,
    pub texts: Vec<String>,
}

impl Default for OccasionFixture {
    fn default() -> Self {
        Self {
            items: (0..16).map(|index| (index % 7).to_string()).collect(),
            age: "21".to_string(),
            sex: "Female".to_string(),
            race: "White".to_string(),
            politics: "Moderate".to_string(),
            religion: Some("Catholic".to_string()),
            zip: "02139".to_string(),
            condition: "B1".to_string(),
            texts: vec!["I could be wrong, sometimes.".to_string()],
        }
    }
}

impl OccasionFixture {
    /// Comma-separated scalars, ending with the comma that opens the text block
    pub fn scalars(&self) -> String {
        let mut values = self.items.clone();
        values.extend([
            self.age.clone(),
            self.sex.clone(),
            self.race.clone(),
            self.politics.clone(),
        ]);
        if let Some(religion) = &self.religion {
            values.push(religion.clone());
        }
        values.extend([self.zip.clone(), self.condition.clone()]);
        format!("{},", values.join(","))
    }

    pub fn encode(&self) -> String {
        let texts: String = self.texts.iter().map(|text| format!("|{}|", text)).collect();
        format!("[[{}[{}", self.scalars(), texts)
    }
}

/// Builder for a whole encoded response
#[derive(Debug, Clone)]
pub struct EncodedRow {
    pub pre: OccasionFixture,
    pub continuation: String,
    pub post: OccasionFixture,
    pub status: String,
    pub pre_timestamp: String,
    pub post_timestamp: String,
}

impl Default for EncodedRow {
    fn default() -> Self {
        Self {
            pre: OccasionFixture::default(),
            continuation: CONTINUATION.to_string(),
            post: OccasionFixture::default(),
            status: "Complete".to_string(),
            pre_timestamp: PRE_TIMESTAMP.to_string(),
            post_timestamp: POST_TIMESTAMP.to_string(),
        }
    }
}

impl EncodedRow {
    /// Row where every field was collected
    pub fn full() -> Self {
        Self::default()
    }

    /// Row where Religion was never collected at either occasion
    pub fn short() -> Self {
        let mut row = Self::default();
        row.pre.religion = None;
        row.post.religion = None;
        row
    }

    pub fn encode(&self) -> String {
        format!(
            "{}]{}]{}]{}>{}>{}]",
            self.pre.encode(),
            self.continuation,
            self.post.encode(),
            self.status,
            self.pre_timestamp,
            self.post_timestamp
        )
    }

    pub fn record(&self, id: &str) -> RawRecord {
        RawRecord::new(id, self.encode())
    }
}

pub fn schema() -> SurveySchema {
    SurveySchema::from_config(&TidyConfig::default()).unwrap()
}

pub fn pipeline() -> Pipeline {
    Pipeline::new(TidyConfig::default()).unwrap()
}

/// Two full rows followed by two short ones
pub fn mixed_batch() -> Vec<RawRecord> {
    vec![
        EncodedRow::full().record("p001"),
        EncodedRow::full().record("p002"),
        EncodedRow::short().record("p003"),
        EncodedRow::short().record("p004"),
    ]
}
