use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNSPECIFIED_REASON: &str = "unspecified";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureReasonCount {
    pub reason: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentMetrics {
    pub total_assigned: u64,
    pub success_rate: f64,
    /// Seconds; see `AverageTimeMode` for what is being averaged.
    pub average_time: f64,
    pub failure_reasons: Vec<FailureReasonCount>,
    pub computed_at: DateTime<Utc>,
}

impl AssignmentMetrics {
    pub fn failure_count(&self) -> u64 {
        self.failure_reasons.iter().map(|fr| fr.count).sum()
    }

    pub fn reason_count(&self, reason: &str) -> u64 {
        self.failure_reasons
            .iter()
            .find(|fr| fr.reason == reason)
            .map(|fr| fr.count)
            .unwrap_or(0)
    }
}
