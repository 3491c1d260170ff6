//! Performance Tracker module.
//!
//! Keeps rolling per-backend statistics and derives the effective weight the
//! dispatcher snapshots into each request's voting profiles.

mod config;
mod record;

pub use config::PerformanceConfig;
pub use record::{OutcomeSnapshot, PerformanceRecord};

use crate::registry::BackendDescriptor;
use dashmap::DashMap;

/// Per-backend rolling statistics.
///
/// Records are keyed by backend id. Updates to one record hold that entry's
/// shard lock for the duration of the fold, so concurrent completions for the
/// same backend never lose an update. Disabling a backend leaves its record
/// in place.
///
/// # Examples
///
/// ```
/// use verdict::consensus::VerdictOutcome;
/// use verdict::performance::{OutcomeSnapshot, PerformanceConfig, PerformanceTracker};
/// use verdict::registry::BackendDescriptor;
/// use std::time::Duration;
///
/// let tracker = PerformanceTracker::new(PerformanceConfig::default());
/// let descriptor = BackendDescriptor::new("judge-a", "local");
/// assert_eq!(tracker.effective_weight(&descriptor), 0.001);
///
/// tracker.record(
///     "judge-a",
///     OutcomeSnapshot {
///         outcome: VerdictOutcome::Success,
///         latency: Duration::from_millis(40),
///         confidence: Some(0.8),
///         cost: 0.0,
///     },
/// );
/// assert!((tracker.effective_weight(&descriptor) - 0.8).abs() < 1e-12);
/// ```
pub struct PerformanceTracker {
    records: DashMap<String, PerformanceRecord>,
    config: PerformanceConfig,
}

impl PerformanceTracker {
    /// Invalid config fields fall back to defaults (see [`PerformanceConfig::sanitized`]).
    pub fn new(config: PerformanceConfig) -> Self {
        Self {
            records: DashMap::new(),
            config: config.sanitized(),
        }
    }

    pub fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    /// Fold one completed call into the backend's record.
    ///
    /// Never fails: out-of-range values are clamped and logged.
    pub fn record(&self, backend_id: &str, snapshot: OutcomeSnapshot) {
        let mut record = self.records.entry(backend_id.to_string()).or_default();
        record.apply(backend_id, &snapshot, self.config.alpha);

        tracing::trace!(
            backend_id = %backend_id,
            outcome = %snapshot.outcome,
            total_calls = record.total_calls,
            success_rate = record.success_rate,
            "Performance record updated"
        );
    }

    /// Copy of the backend's record, if it has ever been called.
    pub fn get(&self, backend_id: &str) -> Option<PerformanceRecord> {
        self.records.get(backend_id).map(|r| r.value().clone())
    }

    /// Current effective weight of a backend.
    pub fn effective_weight(&self, descriptor: &BackendDescriptor) -> f64 {
        match self.records.get(&descriptor.id) {
            Some(record) => record.effective_weight(descriptor.base_weight, self.config.weight_floor),
            None => self.config.weight_floor,
        }
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new(PerformanceConfig::default())
    }
}
