//! Request, verdict, and result types of the consensus engine.

use super::ConsensusStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Confidence required by Threshold and Cascading when the caller sets none.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Aggregate risk at or above which Weighted and Cascading flag content.
pub const DEFAULT_RISK_THRESHOLD: f64 = 0.5;

/// Outcome of one backend call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictOutcome {
    Success,
    Failure,
    Timeout,
}

impl VerdictOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictOutcome::Success => "success",
            VerdictOutcome::Failure => "failure",
            VerdictOutcome::Timeout => "timeout",
        }
    }
}

impl fmt::Display for VerdictOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one backend call.
///
/// Only `Success` verdicts carry a risk score and confidence. Failed and
/// timed-out verdicts still report latency and cost for performance tracking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub backend_id: String,
    pub risk_score: Option<f64>,
    pub confidence: Option<f64>,
    pub latency: Duration,
    pub cost: f64,
    pub outcome: VerdictOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// Successful verdict. Scores are clamped into [0, 1].
    pub fn success(
        backend_id: impl Into<String>,
        risk_score: f64,
        confidence: f64,
        latency: Duration,
        cost: f64,
    ) -> Self {
        let backend_id = backend_id.into();
        let risk_score = clamp_unit(risk_score, "risk_score", &backend_id);
        let confidence = clamp_unit(confidence, "confidence", &backend_id);
        Self {
            backend_id,
            risk_score: Some(risk_score),
            confidence: Some(confidence),
            latency,
            cost,
            outcome: VerdictOutcome::Success,
            error: None,
        }
    }

    pub fn failure(
        backend_id: impl Into<String>,
        error: impl Into<String>,
        latency: Duration,
        cost: f64,
    ) -> Self {
        Self {
            backend_id: backend_id.into(),
            risk_score: None,
            confidence: None,
            latency,
            cost,
            outcome: VerdictOutcome::Failure,
            error: Some(error.into()),
        }
    }

    pub fn timeout(backend_id: impl Into<String>, latency: Duration, cost: f64) -> Self {
        Self {
            backend_id: backend_id.into(),
            risk_score: None,
            confidence: None,
            latency,
            cost,
            outcome: VerdictOutcome::Timeout,
            error: Some(format!("timed out after {}ms", latency.as_millis())),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == VerdictOutcome::Success
    }

    /// `(risk_score, confidence)` of a successful verdict.
    pub fn scores(&self) -> Option<(f64, f64)> {
        match (self.outcome, self.risk_score, self.confidence) {
            (VerdictOutcome::Success, Some(risk), Some(confidence)) => Some((risk, confidence)),
            _ => None,
        }
    }
}

/// A request to evaluate one piece of content.
#[derive(Clone)]
pub struct ConsensusRequest {
    /// Content under evaluation, shared with every dispatched call
    pub content: Arc<str>,
    pub strategy: ConsensusStrategy,
    /// Explicit backend subset; `None` means every enabled backend
    pub backend_ids: Option<Vec<String>>,
    /// Confidence needed by Threshold and Cascading to stop
    pub confidence_threshold: f64,
    /// Aggregate risk at or above which Weighted and Cascading flag
    pub risk_threshold: f64,
    /// Minimum number of successful verdicts
    pub min_quorum: usize,
    /// Caller-facing deadline; caps every per-call timeout
    pub deadline: Option<Duration>,
}

impl ConsensusRequest {
    pub fn new(content: impl Into<Arc<str>>, strategy: ConsensusStrategy) -> Self {
        Self {
            content: content.into(),
            strategy,
            backend_ids: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            min_quorum: 1,
            deadline: None,
        }
    }

    pub fn with_backends<I, S>(mut self, backend_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backend_ids = Some(backend_ids.into_iter().map(Into::into).collect());
        self
    }

    /// Out-of-range values are clamped to [0, 1]; NaN becomes 0.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = clamp_unit(threshold, "confidence_threshold", "request");
        self
    }

    /// Out-of-range values are clamped to [0, 1]; NaN becomes 0.
    pub fn with_risk_threshold(mut self, threshold: f64) -> Self {
        self.risk_threshold = clamp_unit(threshold, "risk_threshold", "request");
        self
    }

    pub fn with_min_quorum(mut self, min_quorum: usize) -> Self {
        self.min_quorum = min_quorum;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Quorum actually enforced; a result always needs at least one verdict.
    pub fn required_quorum(&self) -> usize {
        self.min_quorum.max(1)
    }
}

// Content is never printed: it may hold user data.
impl fmt::Debug for ConsensusRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsensusRequest")
            .field("content_len", &self.content.len())
            .field("strategy", &self.strategy)
            .field("backend_ids", &self.backend_ids)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("risk_threshold", &self.risk_threshold)
            .field("min_quorum", &self.min_quorum)
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Three-way reading of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Flagged,
    Clear,
    /// The strategy could not reach the agreement it requires
    Undecided,
}

/// Combined verdict of one consensus request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusResult {
    /// Never `true` while `disagreement` is set
    pub is_flagged: bool,
    pub aggregate_risk_score: f64,
    pub aggregate_confidence: f64,
    pub strategy_used: ConsensusStrategy,
    /// Successful verdicts used by the combination rule, in canonical order
    pub contributing_verdicts: Vec<Verdict>,
    /// Failed and timed-out verdicts of the same request, in canonical order
    pub excluded_verdicts: Vec<Verdict>,
    pub total_cost: f64,
    pub total_latency: Duration,
    pub disagreement: bool,
    /// The strategy decided before every candidate answered
    pub early_stopped: bool,
}

impl ConsensusResult {
    pub fn decision(&self) -> Decision {
        if self.disagreement {
            Decision::Undecided
        } else if self.is_flagged {
            Decision::Flagged
        } else {
            Decision::Clear
        }
    }

    pub(crate) fn with_early_stop(mut self, early_stopped: bool) -> Self {
        self.early_stopped = early_stopped;
        self
    }
}

/// Clamp a score into [0, 1], mapping non-finite values to 0.
///
/// Out-of-range input is logged, never rejected.
pub fn clamp_unit(value: f64, field: &'static str, backend_id: &str) -> f64 {
    if !value.is_finite() {
        tracing::warn!(backend_id = %backend_id, field, "Non-finite score replaced with 0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&value) {
        tracing::warn!(
            backend_id = %backend_id,
            field,
            value,
            "Score outside [0, 1] clamped"
        );
        return value.clamp(0.0, 1.0);
    }
    value
}
