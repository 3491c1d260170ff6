//! # Metrics
//!
//! Emits engine metrics through the `metrics` facade. The library installs no
//! recorder; a host that wants the figures installs its own exporter.
//!
//! ## Metrics Emitted
//!
//! **Counters:**
//! - `verdict_backend_calls_total{backend, outcome}` - Backend call attempts
//! - `verdict_consensus_total{strategy, result}` - Consensus evaluations
//!
//! **Histograms:**
//! - `verdict_backend_latency_seconds{backend}` - Backend call latency
//!
//! **Gauges:**
//! - `verdict_backend_effective_weight{backend}` - Weight after the latest call

use crate::consensus::{ConsensusError, ConsensusResult, ConsensusStrategy, Decision, VerdictOutcome};
use std::time::Duration;

/// Sanitize a backend id for use as a Prometheus label value.
///
/// Characters outside `[a-zA-Z0-9_]` become underscores and a leading digit
/// is prefixed with one.
pub fn sanitize_label(label: &str) -> String {
    let mut sanitized = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Label of an evaluation outcome: the decision, or the error kind.
pub fn consensus_result_label(result: &Result<ConsensusResult, ConsensusError>) -> &'static str {
    match result {
        Ok(result) => match result.decision() {
            Decision::Flagged => "flagged",
            Decision::Clear => "clear",
            Decision::Undecided => "undecided",
        },
        Err(e) => e.kind(),
    }
}

pub fn record_backend_call(backend_id: &str, outcome: VerdictOutcome, latency: Duration) {
    let backend = sanitize_label(backend_id);
    metrics::counter!(
        "verdict_backend_calls_total",
        "backend" => backend.clone(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    metrics::histogram!("verdict_backend_latency_seconds", "backend" => backend)
        .record(latency.as_secs_f64());
}

pub fn record_effective_weight(backend_id: &str, weight: f64) {
    metrics::gauge!(
        "verdict_backend_effective_weight",
        "backend" => sanitize_label(backend_id)
    )
    .set(weight);
}

pub fn record_consensus(
    strategy: ConsensusStrategy,
    result: &Result<ConsensusResult, ConsensusError>,
) {
    metrics::counter!(
        "verdict_consensus_total",
        "strategy" => strategy.as_str(),
        "result" => consensus_result_label(result)
    )
    .increment(1);
}
