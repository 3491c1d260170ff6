//! Request dispatch: candidate selection, concurrent or cascading calls,
//! early stopping, and hand-off to the aggregator.

use super::aggregator::{self, ProfileTable, VotingProfile};
use super::cost::{CascadeController, CostMeter};
use super::{ConsensusError, ConsensusRequest, ConsensusResult, Verdict};
use crate::config::EngineConfig;
use crate::judge::Judge;
use crate::logging::generate_request_id;
use crate::metrics;
use crate::performance::{OutcomeSnapshot, PerformanceConfig, PerformanceRecord, PerformanceTracker};
use crate::registry::{
    BackendDescriptor, DescriptorPatch, RegisteredBackend, Registry, RegistryError,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Lifecycle of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Pending,
    Dispatching,
    Aggregating,
    Resolved,
    Failed,
}

impl DispatchPhase {
    pub fn can_advance_to(self, next: DispatchPhase) -> bool {
        matches!(
            (self, next),
            (DispatchPhase::Pending, DispatchPhase::Dispatching)
                | (DispatchPhase::Pending, DispatchPhase::Failed)
                | (DispatchPhase::Dispatching, DispatchPhase::Aggregating)
                | (DispatchPhase::Aggregating, DispatchPhase::Resolved)
                | (DispatchPhase::Aggregating, DispatchPhase::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DispatchPhase::Resolved | DispatchPhase::Failed)
    }
}

fn advance(phase: &mut DispatchPhase, next: DispatchPhase) {
    debug_assert!(
        phase.can_advance_to(next),
        "invalid dispatch transition {:?} -> {:?}",
        phase,
        next
    );
    tracing::debug!(from = ?phase, to = ?next, "Dispatch phase changed");
    *phase = next;
}

/// The consensus engine: registry, performance state, and dispatcher.
///
/// Cheap to share behind an `Arc`; every method takes `&self`. Performance
/// records are the only state shared across requests.
///
/// # Examples
///
/// ```
/// use verdict::consensus::{ConsensusEngine, ConsensusRequest, ConsensusStrategy};
/// use verdict::judge::StaticJudge;
/// use verdict::registry::BackendDescriptor;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = ConsensusEngine::default();
/// engine
///     .register_backend(
///         BackendDescriptor::new("judge-a", "local"),
///         Arc::new(StaticJudge::new(0.9, 0.95)),
///     )
///     .unwrap();
///
/// let request = ConsensusRequest::new("some text", ConsensusStrategy::Majority);
/// let result = engine.evaluate(request).await.unwrap();
/// assert!(result.is_flagged);
/// # }
/// ```
pub struct ConsensusEngine {
    registry: Arc<Registry>,
    tracker: Arc<PerformanceTracker>,
    /// Engine-wide cap on concurrent backend calls
    in_flight: Arc<Semaphore>,
    config: EngineConfig,
}

impl ConsensusEngine {
    pub fn new(config: EngineConfig, performance: PerformanceConfig) -> Self {
        Self::with_parts(
            Arc::new(Registry::new()),
            Arc::new(PerformanceTracker::new(performance)),
            config,
        )
    }

    /// Engine over an existing registry and tracker.
    pub fn with_parts(
        registry: Arc<Registry>,
        tracker: Arc<PerformanceTracker>,
        config: EngineConfig,
    ) -> Self {
        let in_flight = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self {
            registry,
            tracker,
            in_flight,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn tracker(&self) -> &Arc<PerformanceTracker> {
        &self.tracker
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn register_backend(
        &self,
        descriptor: BackendDescriptor,
        judge: Arc<dyn Judge>,
    ) -> Result<(), RegistryError> {
        self.registry.register(descriptor, judge)
    }

    pub fn set_backend_enabled(&self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        self.registry.set_enabled(id, enabled)
    }

    pub fn configure_backend(&self, id: &str, patch: &DescriptorPatch) -> Result<(), RegistryError> {
        self.registry.configure(id, patch)
    }

    pub fn list_backends(&self, enabled_only: bool) -> Vec<BackendDescriptor> {
        self.registry.list(enabled_only)
    }

    /// Performance record of a registered backend.
    ///
    /// A backend that has never been called reports an empty record.
    pub fn get_performance(&self, id: &str) -> Result<PerformanceRecord, RegistryError> {
        if !self.registry.contains(id) {
            return Err(RegistryError::BackendNotFound(id.to_string()));
        }
        Ok(self.tracker.get(id).unwrap_or_default())
    }

    pub fn effective_weight(&self, id: &str) -> Result<f64, RegistryError> {
        let descriptor = self
            .registry
            .get(id)
            .ok_or_else(|| RegistryError::BackendNotFound(id.to_string()))?;
        Ok(self.tracker.effective_weight(&descriptor))
    }

    /// Evaluate `request` against its candidate backends.
    pub async fn evaluate(
        &self,
        request: ConsensusRequest,
    ) -> Result<ConsensusResult, ConsensusError> {
        self.evaluate_metered(request, &CostMeter::new()).await
    }

    /// Evaluate `request`, charging every issued call to `meter`.
    ///
    /// The meter stays readable if the returned future is dropped, which
    /// makes the cost of an externally cancelled cascade observable.
    pub async fn evaluate_metered(
        &self,
        request: ConsensusRequest,
        meter: &CostMeter,
    ) -> Result<ConsensusResult, ConsensusError> {
        let span = tracing::info_span!(
            "evaluate",
            request_id = %generate_request_id(),
            strategy = %request.strategy,
            content_len = request.content.len(),
        );
        let strategy = request.strategy;

        let result = self.run(request, meter).instrument(span).await;
        metrics::record_consensus(strategy, &result);
        result
    }

    async fn run(
        &self,
        request: ConsensusRequest,
        meter: &CostMeter,
    ) -> Result<ConsensusResult, ConsensusError> {
        let mut phase = DispatchPhase::Pending;

        let candidates = self.select_candidates(&request);
        if candidates.is_empty() {
            advance(&mut phase, DispatchPhase::Failed);
            tracing::warn!("No enabled backend matches the request");
            return Err(ConsensusError::AllBackendsDisabled);
        }

        let required = request.required_quorum();
        if candidates.len() < required {
            advance(&mut phase, DispatchPhase::Failed);
            tracing::warn!(
                candidates = candidates.len(),
                required,
                "Fewer candidates than quorum; nothing dispatched"
            );
            return Err(ConsensusError::InsufficientQuorum {
                required,
                received: 0,
            });
        }

        let profiles = self.snapshot_profiles(&candidates);
        let deadline = request.deadline.map(|d| Instant::now() + d);

        advance(&mut phase, DispatchPhase::Dispatching);
        let (verdicts, early_stopped) = if request.strategy.is_parallel() {
            self.dispatch_parallel(&candidates, &request, &profiles, meter, deadline)
                .await
        } else {
            self.dispatch_cascade(candidates, &request, &profiles, meter, deadline)
                .await
        };

        advance(&mut phase, DispatchPhase::Aggregating);
        match aggregator::aggregate(request.strategy, &verdicts, &request, &profiles) {
            Ok(result) => {
                advance(&mut phase, DispatchPhase::Resolved);
                let result = result.with_early_stop(early_stopped);
                tracing::info!(
                    is_flagged = result.is_flagged,
                    aggregate_risk = result.aggregate_risk_score,
                    aggregate_confidence = result.aggregate_confidence,
                    disagreement = result.disagreement,
                    contributing = result.contributing_verdicts.len(),
                    excluded = result.excluded_verdicts.len(),
                    early_stopped,
                    total_cost = result.total_cost,
                    "Consensus resolved"
                );
                Ok(result)
            }
            Err(e) => {
                advance(&mut phase, DispatchPhase::Failed);
                tracing::warn!(error = %e, "Consensus failed");
                Err(e)
            }
        }
    }

    /// Enabled backends, restricted to the request subset, in id order.
    fn select_candidates(&self, request: &ConsensusRequest) -> Vec<RegisteredBackend> {
        let enabled = self.registry.entries(true);

        let Some(subset) = &request.backend_ids else {
            return enabled;
        };

        let wanted: BTreeSet<&str> = subset.iter().map(String::as_str).collect();
        for id in &wanted {
            match self.registry.get(id) {
                None => tracing::warn!(backend_id = %id, "Unknown backend in request skipped"),
                Some(d) if !d.enabled => {
                    tracing::warn!(backend_id = %id, "Disabled backend in request skipped")
                }
                Some(_) => {}
            }
        }

        enabled
            .into_iter()
            .filter(|b| wanted.contains(b.descriptor.id.as_str()))
            .collect()
    }

    fn snapshot_profiles(&self, candidates: &[RegisteredBackend]) -> ProfileTable {
        candidates
            .iter()
            .map(|b| {
                let profile = VotingProfile {
                    weight: self.tracker.effective_weight(&b.descriptor),
                    flag_threshold: b.descriptor.flag_threshold,
                };
                (b.descriptor.id.clone(), profile)
            })
            .collect()
    }

    async fn dispatch_parallel(
        &self,
        candidates: &[RegisteredBackend],
        request: &ConsensusRequest,
        profiles: &ProfileTable,
        meter: &CostMeter,
        deadline: Option<Instant>,
    ) -> (Vec<Verdict>, bool) {
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();

        for (index, backend) in candidates.iter().cloned().enumerate() {
            let cancel = cancel.clone();
            let permits = Arc::clone(&self.in_flight);
            let tracker = Arc::clone(&self.tracker);
            let meter = meter.clone();
            let content = Arc::clone(&request.content);

            tasks.spawn(
                async move {
                    let _permit = tokio::select! {
                        _ = cancel.cancelled() => return None,
                        permit = permits.acquire_owned() => permit.ok()?,
                    };
                    if deadline_passed(deadline) {
                        tracing::warn!(
                            backend_id = %backend.descriptor.id,
                            "Deadline passed before call was issued"
                        );
                        return None;
                    }

                    meter.charge(backend.descriptor.cost_per_call);
                    tokio::select! {
                        _ = cancel.cancelled() => None,
                        verdict = invoke(&backend, &content, deadline, &tracker, &meter) => {
                            Some((index, verdict))
                        }
                    }
                }
                .in_current_span(),
            );
        }

        // Kept in candidate order as arrivals come in.
        let mut indices: Vec<usize> = Vec::with_capacity(candidates.len());
        let mut verdicts: Vec<Verdict> = Vec::with_capacity(candidates.len());
        let mut early_stopped = false;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some((index, verdict))) => {
                    let at = indices.partition_point(|&i| i < index);
                    indices.insert(at, index);
                    verdicts.insert(at, verdict);
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Backend call task failed");
                    continue;
                }
            }

            if request.strategy.stops_early()
                && !tasks.is_empty()
                && aggregator::threshold_reached(&verdicts, request, profiles)
            {
                tracing::debug!(
                    settled = verdicts.len(),
                    outstanding = tasks.len(),
                    "Threshold reached; cancelling outstanding calls"
                );
                cancel.cancel();
                tasks.abort_all();
                early_stopped = true;
                break;
            }
        }

        (verdicts, early_stopped)
    }

    async fn dispatch_cascade(
        &self,
        candidates: Vec<RegisteredBackend>,
        request: &ConsensusRequest,
        profiles: &ProfileTable,
        meter: &CostMeter,
        deadline: Option<Instant>,
    ) -> (Vec<Verdict>, bool) {
        let mut cascade = CascadeController::new(candidates, meter.clone());
        let mut verdicts = Vec::new();

        loop {
            if deadline_passed(deadline) {
                tracing::warn!(
                    remaining = cascade.remaining(),
                    "Deadline passed; cascade stopped"
                );
                break;
            }
            let Ok(_permit) = self.in_flight.acquire().await else {
                break;
            };
            let Some(backend) = cascade.issue_next() else {
                break;
            };

            let verdict = invoke(&backend, &request.content, deadline, &self.tracker, meter).await;
            verdicts.push(verdict);

            if aggregator::cascade_satisfied(&verdicts, request, profiles) {
                let early_stopped = cascade.remaining() > 0;
                tracing::debug!(
                    issued = cascade.issued(),
                    skipped = cascade.remaining(),
                    "Cascade confidence reached"
                );
                return (verdicts, early_stopped);
            }
        }

        (verdicts, false)
    }
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), PerformanceConfig::default())
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Per-call timeout: the backend's own, capped by what is left of the deadline.
fn call_timeout(declared: Duration, deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(d) => declared.min(d.saturating_duration_since(Instant::now())),
        None => declared,
    }
}

/// Issue one call and turn its outcome into a verdict.
///
/// Never fails: errors and timeouts become excluded verdicts. Every verdict
/// is fed to the tracker and settled on the meter before it is returned.
async fn invoke(
    backend: &RegisteredBackend,
    content: &str,
    deadline: Option<Instant>,
    tracker: &PerformanceTracker,
    meter: &CostMeter,
) -> Verdict {
    let descriptor = &backend.descriptor;
    let id = descriptor.id.as_str();
    let declared = descriptor.cost_per_call;
    let timeout = call_timeout(descriptor.timeout, deadline);

    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, backend.judge.judge(content, timeout)).await;
    let latency = started.elapsed();

    let verdict = match outcome {
        Ok(Ok(judgment)) => {
            let cost = judgment
                .cost
                .filter(|c| c.is_finite() && *c >= 0.0)
                .unwrap_or(declared);
            Verdict::success(
                id,
                judgment.risk_score,
                judgment.confidence,
                latency,
                cost,
            )
        }
        Ok(Err(e)) if e.is_timeout() => {
            tracing::warn!(backend_id = %id, error = %e, "Backend timed out");
            Verdict::timeout(id, latency, declared)
        }
        Ok(Err(e)) => {
            tracing::warn!(backend_id = %id, error = %e, "Backend call failed");
            Verdict::failure(id, e.to_string(), latency, declared)
        }
        Err(_) => {
            tracing::warn!(
                backend_id = %id,
                timeout_ms = timeout.as_millis() as u64,
                "Backend timed out"
            );
            Verdict::timeout(id, latency, declared)
        }
    };

    meter.settle(declared, verdict.cost);
    tracker.record(id, OutcomeSnapshot::from(&verdict));
    metrics::record_backend_call(id, verdict.outcome, latency);
    metrics::record_effective_weight(id, tracker.effective_weight(descriptor));

    verdict
}
