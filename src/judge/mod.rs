//! Judge abstraction layer.
//!
//! A judge is the uniform capability through which the engine reaches one
//! external risk-assessment backend. Adapters for individual providers live
//! behind the [`Judge`] trait; the engine never sees provider formats.

use async_trait::async_trait;
use std::time::Duration;

pub mod error;
pub mod factory;
pub mod http;

pub use error::JudgeError;
pub use factory::build_judge;
pub use http::HttpJudge;

/// Raw answer of a judge, before the engine turns it into a `Verdict`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Judgment {
    /// Likelihood the content is unsafe or hallucinated, expected in [0, 1]
    pub risk_score: f64,
    /// Judge's confidence in its own score, expected in [0, 1]
    pub confidence: f64,
    /// Actual cost of the call, when the backend reports it
    pub cost: Option<f64>,
}

impl Judgment {
    pub fn new(risk_score: f64, confidence: f64) -> Self {
        Self {
            risk_score,
            confidence,
            cost: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}

/// Unified interface for all judgment backends.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn Judge>`.
///
/// # Cancellation Safety
///
/// Implementations must be cancellation-safe: the dispatcher drops the future
/// when a call times out or an early-stopping strategy has already decided.
#[async_trait]
pub trait Judge: Send + Sync + 'static {
    /// Evaluate `content` and return a judgment within `timeout`.
    ///
    /// The dispatcher enforces `timeout` independently; implementations should
    /// pass it on to their transport so the backend can give up early too.
    async fn judge(&self, content: &str, timeout: Duration) -> Result<Judgment, JudgeError>;
}

/// Judge that always answers with the same judgment.
///
/// Used for dry runs and configuration smoke tests where no external backend
/// is reachable.
#[derive(Debug, Clone)]
pub struct StaticJudge {
    judgment: Judgment,
}

impl StaticJudge {
    pub fn new(risk_score: f64, confidence: f64) -> Self {
        Self {
            judgment: Judgment::new(risk_score, confidence),
        }
    }

    pub fn from_judgment(judgment: Judgment) -> Self {
        Self { judgment }
    }
}

#[async_trait]
impl Judge for StaticJudge {
    async fn judge(&self, _content: &str, _timeout: Duration) -> Result<Judgment, JudgeError> {
        Ok(self.judgment)
    }
}
