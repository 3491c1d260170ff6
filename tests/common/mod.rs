//! Shared test utilities for Verdict integration tests.
//!
//! Provides a scriptable judge that counts its calls and tracks its own
//! concurrency, plus helpers for wiring judges into an engine.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use verdict::config::EngineConfig;
use verdict::consensus::ConsensusEngine;
use verdict::judge::{Judge, JudgeError, Judgment};
use verdict::performance::PerformanceConfig;
use verdict::registry::BackendDescriptor;

// =============================================================================
// Scripted Judge
// =============================================================================

/// What a scripted judge answers.
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer with a fixed judgment
    Score(Judgment),
    /// Fail with an upstream error
    Fail,
    /// Never answer
    Hang,
    /// Succeed for the first `n` calls, then fail
    SucceedThenFail(usize, Judgment),
}

/// Judge driven by a fixed script.
pub struct ScriptedJudge {
    script: Script,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedJudge {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn scoring(risk_score: f64, confidence: f64) -> Self {
        Self::new(Script::Score(Judgment::new(risk_score, confidence)))
    }

    pub fn failing() -> Self {
        Self::new(Script::Fail)
    }

    pub fn hanging() -> Self {
        Self::new(Script::Hang)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn judge(&self, _content: &str, _timeout: Duration) -> Result<Judgment, JudgeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.script {
            Script::Score(judgment) => Ok(*judgment),
            Script::Fail => Err(JudgeError::Upstream {
                status: 500,
                message: "scripted failure".to_string(),
            }),
            Script::Hang => std::future::pending().await,
            Script::SucceedThenFail(n, judgment) => {
                if call < *n {
                    Ok(*judgment)
                } else {
                    Err(JudgeError::Network("scripted outage".to_string()))
                }
            }
        }
    }
}

// =============================================================================
// Engine Helpers
// =============================================================================

pub fn engine() -> ConsensusEngine {
    ConsensusEngine::default()
}

pub fn engine_with_in_flight(max_in_flight: usize) -> ConsensusEngine {
    let config = EngineConfig {
        max_in_flight,
        ..Default::default()
    };
    ConsensusEngine::new(config, PerformanceConfig::default())
}

/// Register `judge` under `id` with the given cost and return it for inspection.
pub fn add_backend(
    engine: &ConsensusEngine,
    id: &str,
    cost_per_call: f64,
    judge: ScriptedJudge,
) -> Arc<ScriptedJudge> {
    add_backend_with(
        engine,
        BackendDescriptor::new(id, "scripted").with_cost_per_call(cost_per_call),
        judge,
    )
}

pub fn add_backend_with(
    engine: &ConsensusEngine,
    descriptor: BackendDescriptor,
    judge: ScriptedJudge,
) -> Arc<ScriptedJudge> {
    let judge = Arc::new(judge);
    engine
        .register_backend(descriptor, judge.clone())
        .expect("backend registration");
    judge
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
