use crate::constants::{AGE, RELIGION, SEX};
use crate::error::RowError;
use crate::models::{FieldSet, FieldValue, OccasionRecord, RowStatus, TidyRecord};
use crate::pipeline::consistency::{check_batch, check_record, values_agree};

fn occasion(age: FieldValue, religion: FieldValue) -> OccasionRecord {
    let mut fields = FieldSet::new();
    fields.insert(AGE, age);
    fields.insert(SEX, FieldValue::Category("Male".to_string()));
    fields.insert(RELIGION, religion);
    OccasionRecord {
        fields,
        texts: Vec::new(),
        timestamp: None,
        date: FieldValue::Missing,
    }
}

fn record(id: &str, pre_age: i64, post_age: i64) -> TidyRecord {
    TidyRecord {
        id: id.to_string(),
        status: RowStatus::Complete,
        pre: occasion(FieldValue::Integer(pre_age), FieldValue::Missing),
        continuation: FieldSet::new(),
        post: occasion(FieldValue::Integer(post_age), FieldValue::Missing),
        survey_status: FieldValue::Text("Complete".to_string()),
    }
}

#[test]
fn test_equal_age_is_consistent() {
    assert_eq!(check_record(&record("p001", 21, 21), AGE, true), Some(true));
}

#[test]
fn test_changed_age_is_flagged() {
    let records = vec![record("p001", 21, 21), record("p002", 21, 22)];
    let (report, mismatches) = check_batch(&records, &[AGE], true);

    let age = report.field(AGE).unwrap();
    assert_eq!(age.flags, vec![Some(true), Some(false)]);
    assert_eq!(age.mismatches, 1);
    assert_eq!(age.checked(), 2);

    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].record_id, "p002");
    assert_eq!(mismatches[0].pre, FieldValue::Integer(21));
    assert_eq!(mismatches[0].post, FieldValue::Integer(22));
}

#[test]
fn test_missing_pairs() {
    let missing = FieldValue::Missing;
    assert!(values_agree(&missing, &missing, true));
    assert!(!values_agree(&missing, &missing, false));
    assert!(!values_agree(&missing, &FieldValue::Integer(21), true));
    assert!(values_agree(&FieldValue::NotAsked, &FieldValue::NotAsked, false));

    let records = vec![record("p001", 30, 30)];
    let (strict, mismatches) = check_batch(&records, &[RELIGION], false);
    assert_eq!(strict.total_mismatches(), 1);
    assert_eq!(mismatches[0].field, RELIGION);
}

#[test]
fn test_failed_records_are_not_checked() {
    let mut failed = record("p003", 21, 40);
    failed.status = RowStatus::Failed {
        error: RowError::alignment("pre", 21, "no recovery rule", &[]),
    };
    let records = vec![record("p001", 21, 21), failed];

    let (report, mismatches) = check_batch(&records, &[AGE, SEX], true);
    assert!(mismatches.is_empty());
    assert_eq!(report.fields.len(), 2);
    assert_eq!(report.field(AGE).unwrap().flags, vec![Some(true), None]);
    assert_eq!(report.field(SEX).unwrap().checked(), 1);
}
