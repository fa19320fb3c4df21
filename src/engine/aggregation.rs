//! Recomputes the assignment metrics snapshot from the assignment and
//! order collections.
//!
//! The snapshot is always rebuilt from scratch and swapped in with one
//! write, so it can never drift from the records it summarizes. The scan
//! streams over the collections and only keeps per-reason counters in
//! memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::AverageTimeMode;
use crate::error::AppError;
use crate::events::DispatchEvent;
use crate::models::assignment::{Assignment, AssignmentOutcome};
use crate::models::metrics::{AssignmentMetrics, FailureReasonCount, UNSPECIFIED_REASON};
use crate::state::AppState;
use crate::store::Transaction;

#[derive(Debug)]
pub struct MetricsAccumulator {
    mode: AverageTimeMode,
    successes: u64,
    failures: u64,
    timed_successes: u64,
    time_sum_secs: f64,
    reasons: HashMap<String, u64>,
}

impl MetricsAccumulator {
    pub fn new(mode: AverageTimeMode) -> Self {
        Self {
            mode,
            successes: 0,
            failures: 0,
            timed_successes: 0,
            time_sum_secs: 0.0,
            reasons: HashMap::new(),
        }
    }

    /// `order_created_at` is the creation time of the assignment's order,
    /// or `None` when that order no longer exists.
    pub fn observe(&mut self, assignment: &Assignment, order_created_at: Option<DateTime<Utc>>) {
        match assignment.status {
            AssignmentOutcome::Success => {
                self.successes += 1;

                let sample = match self.mode {
                    AverageTimeMode::Elapsed => order_created_at.map(|created| {
                        let elapsed = assignment.timestamp - created;
                        (elapsed.num_milliseconds().max(0) as f64) / 1000.0
                    }),
                    AverageTimeMode::Timestamp => {
                        Some(assignment.timestamp.timestamp_millis() as f64 / 1000.0)
                    }
                };

                if let Some(secs) = sample {
                    self.timed_successes += 1;
                    self.time_sum_secs += secs;
                }
            }
            AssignmentOutcome::Failed => {
                self.failures += 1;
                let reason = normalize_reason(assignment.reason.as_deref());
                *self.reasons.entry(reason).or_insert(0) += 1;
            }
        }
    }

    pub fn finish(self) -> AssignmentMetrics {
        let total = self.successes + self.failures;

        let success_rate = if total == 0 {
            0.0
        } else {
            self.successes as f64 / total as f64
        };

        let average_time = if self.timed_successes == 0 {
            0.0
        } else {
            self.time_sum_secs / self.timed_successes as f64
        };

        let mut failure_reasons: Vec<FailureReasonCount> = self
            .reasons
            .into_iter()
            .map(|(reason, count)| FailureReasonCount { reason, count })
            .collect();
        failure_reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

        AssignmentMetrics {
            total_assigned: total,
            success_rate,
            average_time,
            failure_reasons,
            computed_at: Utc::now(),
        }
    }
}

fn normalize_reason(reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.trim().is_empty() => reason.to_string(),
        _ => UNSPECIFIED_REASON.to_string(),
    }
}

/// Recomputes the snapshot inside an already open transaction.
pub fn refresh_in_tx(state: &AppState, _tx: &Transaction<'_>) -> AssignmentMetrics {
    let start = Instant::now();
    let mut acc = MetricsAccumulator::new(state.average_time_mode);

    for entry in state.store.assignments.iter() {
        let assignment = entry.value();
        let created_at = state
            .store
            .orders
            .get(&assignment.order_id)
            .map(|order| order.created_at);
        acc.observe(assignment, created_at);
    }

    let snapshot = acc.finish();
    state.store.replace_metrics(snapshot.clone());

    state
        .metrics
        .metrics_refresh_seconds
        .observe(start.elapsed().as_secs_f64());

    info!(
        total_assigned = snapshot.total_assigned,
        success_rate = snapshot.success_rate,
        average_time = snapshot.average_time,
        failure_reasons = snapshot.failure_reasons.len(),
        "assignment metrics refreshed"
    );

    state.publish(DispatchEvent::MetricsRefreshed {
        metrics: snapshot.clone(),
    });

    snapshot
}

pub async fn refresh_metrics(state: Arc<AppState>) -> Result<AssignmentMetrics, AppError> {
    let tx = state
        .store
        .begin()
        .await
        .map_err(|err| AppError::AggregationFailed(err.to_string()))?;

    Ok(refresh_in_tx(&state, &tx))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::MetricsAccumulator;
    use crate::config::AverageTimeMode;
    use crate::models::assignment::{Assignment, AssignmentOutcome};
    use crate::models::metrics::UNSPECIFIED_REASON;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn assignment(status: AssignmentOutcome, timestamp: DateTime<Utc>, reason: Option<&str>) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            timestamp,
            status,
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn empty_collection_yields_zeroes() {
        let metrics = MetricsAccumulator::new(AverageTimeMode::Elapsed).finish();

        assert_eq!(metrics.total_assigned, 0);
        assert_eq!(metrics.success_rate, 0.0);
        assert_eq!(metrics.average_time, 0.0);
        assert!(metrics.failure_reasons.is_empty());
    }

    #[test]
    fn success_rate_counts_successes_over_all_records() {
        let mut acc = MetricsAccumulator::new(AverageTimeMode::Elapsed);
        for _ in 0..3 {
            acc.observe(&assignment(AssignmentOutcome::Success, at(100), None), Some(at(40)));
        }
        acc.observe(&assignment(AssignmentOutcome::Failed, at(100), Some("rain")), None);

        let metrics = acc.finish();
        assert_eq!(metrics.total_assigned, 4);
        assert!((metrics.success_rate - 0.75).abs() < f64::EPSILON);
        assert!((0.0..=1.0).contains(&metrics.success_rate));
    }

    #[test]
    fn only_failures_gives_zero_success_rate() {
        let mut acc = MetricsAccumulator::new(AverageTimeMode::Elapsed);
        acc.observe(&assignment(AssignmentOutcome::Failed, at(1), None), None);
        acc.observe(&assignment(AssignmentOutcome::Failed, at(2), None), None);

        let metrics = acc.finish();
        assert_eq!(metrics.total_assigned, 2);
        assert_eq!(metrics.success_rate, 0.0);
    }

    #[test]
    fn elapsed_mode_averages_creation_to_delivery_spans() {
        let mut acc = MetricsAccumulator::new(AverageTimeMode::Elapsed);
        let created = at(1_000);
        acc.observe(
            &assignment(AssignmentOutcome::Success, created + Duration::seconds(600), None),
            Some(created),
        );
        acc.observe(
            &assignment(AssignmentOutcome::Success, created + Duration::seconds(1_200), None),
            Some(created),
        );

        assert!((acc.finish().average_time - 900.0).abs() < 1e-9);
    }

    #[test]
    fn elapsed_mode_skips_successes_whose_order_is_gone() {
        let mut acc = MetricsAccumulator::new(AverageTimeMode::Elapsed);
        acc.observe(&assignment(AssignmentOutcome::Success, at(500), None), Some(at(200)));
        acc.observe(&assignment(AssignmentOutcome::Success, at(10_000), None), None);

        let metrics = acc.finish();
        assert_eq!(metrics.total_assigned, 2);
        assert!((metrics.average_time - 300.0).abs() < 1e-9);
    }

    #[test]
    fn elapsed_mode_clamps_clock_skew_to_zero() {
        let mut acc = MetricsAccumulator::new(AverageTimeMode::Elapsed);
        acc.observe(&assignment(AssignmentOutcome::Success, at(100), None), Some(at(200)));

        assert_eq!(acc.finish().average_time, 0.0);
    }

    #[test]
    fn timestamp_mode_averages_epoch_seconds() {
        let mut acc = MetricsAccumulator::new(AverageTimeMode::Timestamp);
        acc.observe(&assignment(AssignmentOutcome::Success, at(1_000), None), None);
        acc.observe(&assignment(AssignmentOutcome::Success, at(3_000), None), Some(at(0)));

        assert!((acc.finish().average_time - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn failure_reasons_are_grouped_and_sum_to_failures() {
        let mut acc = MetricsAccumulator::new(AverageTimeMode::Elapsed);
        acc.observe(&assignment(AssignmentOutcome::Failed, at(1), Some("address unreachable")), None);
        acc.observe(&assignment(AssignmentOutcome::Failed, at(2), Some("address unreachable")), None);
        acc.observe(&assignment(AssignmentOutcome::Failed, at(3), Some("customer absent")), None);
        acc.observe(&assignment(AssignmentOutcome::Failed, at(4), None), None);
        acc.observe(&assignment(AssignmentOutcome::Failed, at(5), Some("   ")), None);
        acc.observe(&assignment(AssignmentOutcome::Success, at(6), None), Some(at(0)));

        let metrics = acc.finish();
        assert_eq!(metrics.failure_count(), 5);
        assert_eq!(metrics.reason_count("address unreachable"), 2);
        assert_eq!(metrics.reason_count("customer absent"), 1);
        assert_eq!(metrics.reason_count(UNSPECIFIED_REASON), 2);
        assert_eq!(metrics.failure_reasons.len(), 3);
        assert_eq!(metrics.failure_reasons[2].reason, "customer absent");
    }
}
