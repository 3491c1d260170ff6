use crate::consensus::{clamp_unit, Verdict, VerdictOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// What the tracker needs to know about one completed call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeSnapshot {
    pub outcome: VerdictOutcome,
    pub latency: Duration,
    /// Reported confidence; only meaningful for successful calls
    pub confidence: Option<f64>,
    pub cost: f64,
}

impl From<&Verdict> for OutcomeSnapshot {
    fn from(verdict: &Verdict) -> Self {
        Self {
            outcome: verdict.outcome,
            latency: verdict.latency,
            confidence: verdict.confidence,
            cost: verdict.cost,
        }
    }
}

/// Rolling statistics of one backend.
///
/// Averages are exponentially weighted; the first sample of each average
/// seeds it directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PerformanceRecord {
    pub total_calls: u64,
    pub success_count: u64,
    /// Failed calls, timeouts included
    pub failure_count: u64,
    pub timeout_count: u64,
    /// EWMA of 1.0 per success and 0.0 per failure
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    /// EWMA over successful calls only
    pub avg_confidence: f64,
    pub total_cost: f64,
    pub last_call_at: Option<DateTime<Utc>>,
}

impl PerformanceRecord {
    /// Fold one completed call into the record.
    pub(crate) fn apply(&mut self, backend_id: &str, snapshot: &OutcomeSnapshot, alpha: f64) {
        let first_call = self.total_calls == 0;
        self.total_calls += 1;
        self.last_call_at = Some(Utc::now());

        if snapshot.cost.is_finite() && snapshot.cost >= 0.0 {
            self.total_cost += snapshot.cost;
        } else {
            tracing::warn!(backend_id = %backend_id, cost = snapshot.cost, "Ignoring invalid call cost");
        }

        let latency_ms = snapshot.latency.as_secs_f64() * 1000.0;
        self.avg_latency_ms = ewma(self.avg_latency_ms, latency_ms, alpha, first_call);

        let succeeded = snapshot.outcome == VerdictOutcome::Success;
        let sample = if succeeded { 1.0 } else { 0.0 };
        self.success_rate = ewma(self.success_rate, sample, alpha, first_call);

        if succeeded {
            self.success_count += 1;
            let confidence = clamp_unit(snapshot.confidence.unwrap_or(0.0), "confidence", backend_id);
            self.avg_confidence = ewma(
                self.avg_confidence,
                confidence,
                alpha,
                self.success_count == 1,
            );
        } else {
            self.failure_count += 1;
            if snapshot.outcome == VerdictOutcome::Timeout {
                self.timeout_count += 1;
            }
        }
    }

    /// `base_weight * success_rate * avg_confidence`, never below `floor`.
    ///
    /// A backend that has never been called sits exactly at the floor.
    pub fn effective_weight(&self, base_weight: f64, floor: f64) -> f64 {
        if self.total_calls == 0 {
            return floor;
        }
        let weight = base_weight * self.success_rate * self.avg_confidence;
        if weight.is_finite() {
            weight.max(floor)
        } else {
            floor
        }
    }
}

fn ewma(current: f64, sample: f64, alpha: f64, seed: bool) -> f64 {
    if seed {
        sample
    } else {
        alpha * sample + (1.0 - alpha) * current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(confidence: f64, latency_ms: u64) -> OutcomeSnapshot {
        OutcomeSnapshot {
            outcome: VerdictOutcome::Success,
            latency: Duration::from_millis(latency_ms),
            confidence: Some(confidence),
            cost: 0.1,
        }
    }

    fn failure(outcome: VerdictOutcome) -> OutcomeSnapshot {
        OutcomeSnapshot {
            outcome,
            latency: Duration::from_millis(50),
            confidence: None,
            cost: 0.1,
        }
    }

    #[test]
    fn first_sample_seeds_averages() {
        let mut record = PerformanceRecord::default();
        record.apply("a", &success(0.9, 100), 0.2);

        assert_eq!(record.total_calls, 1);
        assert_eq!(record.success_rate, 1.0);
        assert_eq!(record.avg_confidence, 0.9);
        assert_eq!(record.avg_latency_ms, 100.0);
        assert!(record.last_call_at.is_some());
    }

    #[test]
    fn ewma_weights_recent_samples() {
        let mut record = PerformanceRecord::default();
        record.apply("a", &success(0.9, 100), 0.2);
        record.apply("a", &success(0.9, 200), 0.2);

        // 0.2 * 200 + 0.8 * 100
        assert!((record.avg_latency_ms - 120.0).abs() < 1e-9);
    }

    #[test]
    fn timeouts_count_as_failures() {
        let mut record = PerformanceRecord::default();
        record.apply("a", &failure(VerdictOutcome::Timeout), 0.2);
        record.apply("a", &failure(VerdictOutcome::Failure), 0.2);

        assert_eq!(record.failure_count, 2);
        assert_eq!(record.timeout_count, 1);
        assert_eq!(record.success_count, 0);
        assert_eq!(record.success_rate, 0.0);
        assert!((record.total_cost - 0.2).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_confidence_is_clamped() {
        let mut record = PerformanceRecord::default();
        record.apply("a", &success(7.0, 10), 0.2);
        assert_eq!(record.avg_confidence, 1.0);
    }

    #[test]
    fn zero_calls_sit_at_floor() {
        let record = PerformanceRecord::default();
        assert_eq!(record.effective_weight(5.0, 0.001), 0.001);
    }

    #[test]
    fn failures_only_sit_at_floor() {
        let mut record = PerformanceRecord::default();
        record.apply("a", &failure(VerdictOutcome::Failure), 0.2);
        assert_eq!(record.effective_weight(1.0, 0.001), 0.001);
    }
}
