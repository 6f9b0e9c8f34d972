//! Run statistics for a tidying pass

use serde::{Deserialize, Serialize};

/// Counts gathered over one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Raw records handed to the pipeline
    pub total_records: usize,

    /// Records whose every section matched the documented layout
    pub complete: usize,

    /// Records re-anchored by a recovery rule
    pub recovered: usize,

    /// Records that failed structurally or could not be aligned
    pub failed: usize,

    /// Field values kept raw because they fell outside their domain
    pub domain_violations: usize,

    /// Pre/post disagreements on invariant fields
    pub consistency_mismatches: usize,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that produced typed fields, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            ((self.complete + self.recovered) as f64 / self.total_records as f64) * 100.0
        }
    }

    /// Check if the run was mostly successful (>90% of rows typed)
    pub fn is_successful(&self) -> bool {
        self.success_rate() > 90.0
    }

    /// Every input row is accounted for exactly once
    pub fn is_balanced(&self) -> bool {
        self.complete + self.recovered + self.failed == self.total_records
    }
}
