//! Combination rules for every consensus strategy.
//!
//! Everything here is a pure function of the ordered verdicts, the request
//! thresholds, and the weight profile snapshot taken when dispatch started.
//! Sums are accumulated in verdict order so that equal inputs give
//! bit-identical outputs.

use super::{ConsensusError, ConsensusRequest, ConsensusResult, ConsensusStrategy, Verdict};
use crate::registry::DEFAULT_FLAG_THRESHOLD;
use std::collections::BTreeMap;
use std::time::Duration;

/// Voting parameters of one candidate, frozen for the life of a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VotingProfile {
    /// Effective weight at dispatch time
    pub weight: f64,
    /// Risk at or above which this backend's verdict counts as a flagged vote
    pub flag_threshold: f64,
}

impl Default for VotingProfile {
    fn default() -> Self {
        Self {
            weight: 1.0,
            flag_threshold: DEFAULT_FLAG_THRESHOLD,
        }
    }
}

/// Profiles of every candidate of a request, keyed by backend id.
pub type ProfileTable = BTreeMap<String, VotingProfile>;

struct Combined {
    is_flagged: bool,
    risk: f64,
    confidence: f64,
    disagreement: bool,
}

/// Combine `verdicts` under `strategy`.
///
/// Failed and timed-out verdicts are carried into `excluded_verdicts` and
/// count toward cost and latency, never toward the decision. Fewer successful
/// verdicts than the request quorum yields `InsufficientQuorum`.
pub fn aggregate(
    strategy: ConsensusStrategy,
    verdicts: &[Verdict],
    request: &ConsensusRequest,
    profiles: &ProfileTable,
) -> Result<ConsensusResult, ConsensusError> {
    let (successes, excluded): (Vec<&Verdict>, Vec<&Verdict>) =
        verdicts.iter().partition(|v| v.is_success());

    let required = request.required_quorum();
    if successes.len() < required {
        return Err(ConsensusError::InsufficientQuorum {
            required,
            received: successes.len(),
        });
    }

    let combined = match strategy {
        ConsensusStrategy::Majority => majority(&successes, profiles),
        ConsensusStrategy::Weighted | ConsensusStrategy::Cascading => {
            weighted(&successes, request, profiles)
        }
        ConsensusStrategy::Unanimous => unanimous(&successes, profiles),
        ConsensusStrategy::Threshold => threshold(&successes, request, profiles),
    };

    let total_cost = verdicts.iter().map(|v| v.cost).sum();
    let total_latency = if strategy.is_parallel() {
        verdicts
            .iter()
            .map(|v| v.latency)
            .max()
            .unwrap_or(Duration::ZERO)
    } else {
        verdicts.iter().map(|v| v.latency).sum()
    };

    tracing::debug!(
        strategy = %strategy,
        successes = successes.len(),
        excluded = excluded.len(),
        aggregate_risk = combined.risk,
        aggregate_confidence = combined.confidence,
        disagreement = combined.disagreement,
        "Verdicts aggregated"
    );

    Ok(ConsensusResult {
        is_flagged: combined.is_flagged && !combined.disagreement,
        aggregate_risk_score: combined.risk,
        aggregate_confidence: combined.confidence,
        strategy_used: strategy,
        contributing_verdicts: successes.into_iter().cloned().collect(),
        excluded_verdicts: excluded.into_iter().cloned().collect(),
        total_cost,
        total_latency,
        disagreement: combined.disagreement,
        early_stopped: false,
    })
}

/// Whether the Threshold strategy has reached its terminal decision.
///
/// Checked by the dispatcher after every arrival. The flagged mass only grows
/// as verdicts arrive, so once this holds it holds for every superset.
pub fn threshold_reached(
    verdicts: &[Verdict],
    request: &ConsensusRequest,
    profiles: &ProfileTable,
) -> bool {
    let successes: Vec<&Verdict> = verdicts.iter().filter(|v| v.is_success()).collect();
    successes.len() >= request.required_quorum()
        && mass_reaches(flagged_mass(&successes, profiles), request.confidence_threshold)
}

/// Whether a cascade may stop after the verdicts gathered so far.
pub fn cascade_satisfied(
    verdicts: &[Verdict],
    request: &ConsensusRequest,
    profiles: &ProfileTable,
) -> bool {
    let successes: Vec<&Verdict> = verdicts.iter().filter(|v| v.is_success()).collect();
    if successes.len() < request.required_quorum() {
        return false;
    }
    let (_, confidence) = weighted_means(&successes, profiles);
    confidence >= request.confidence_threshold
}

fn profile(profiles: &ProfileTable, backend_id: &str) -> VotingProfile {
    profiles.get(backend_id).copied().unwrap_or_default()
}

fn votes_flagged(verdict: &Verdict, profiles: &ProfileTable) -> bool {
    let threshold = profile(profiles, &verdict.backend_id).flag_threshold;
    verdict
        .scores()
        .map(|(risk, _)| risk >= threshold)
        .unwrap_or(false)
}

fn usable_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Weighted means of risk and confidence over successful verdicts.
///
/// Falls back to equal weights when no verdict carries positive weight. The
/// risk mean is pinned into the input range to absorb rounding.
fn weighted_means(successes: &[&Verdict], profiles: &ProfileTable) -> (f64, f64) {
    let weights: Vec<f64> = successes
        .iter()
        .map(|v| usable_weight(profile(profiles, &v.backend_id).weight))
        .collect();
    let total: f64 = weights.iter().sum();

    let (weights, total) = if total > 0.0 {
        (weights, total)
    } else {
        (vec![1.0; successes.len()], successes.len() as f64)
    };

    let mut risk_sum = 0.0;
    let mut confidence_sum = 0.0;
    let mut min_risk = f64::INFINITY;
    let mut max_risk = f64::NEG_INFINITY;
    for (verdict, weight) in successes.iter().zip(&weights) {
        if let Some((risk, confidence)) = verdict.scores() {
            risk_sum += weight * risk;
            confidence_sum += weight * confidence;
            min_risk = min_risk.min(risk);
            max_risk = max_risk.max(risk);
        }
    }

    if total <= 0.0 || min_risk > max_risk {
        return (0.0, 0.0);
    }
    ((risk_sum / total).clamp(min_risk, max_risk), confidence_sum / total)
}

fn plain_means(successes: &[&Verdict]) -> (f64, f64) {
    if successes.is_empty() {
        return (0.0, 0.0);
    }
    let n = successes.len() as f64;
    let (risk, confidence) = successes
        .iter()
        .filter_map(|v| v.scores())
        .fold((0.0, 0.0), |(r, c), (risk, confidence)| {
            (r + risk, c + confidence)
        });
    (risk / n, confidence / n)
}

/// Confidence mass of flagged votes relative to the weight of every candidate.
fn flagged_mass(successes: &[&Verdict], profiles: &ProfileTable) -> f64 {
    let candidate_weight: f64 = profiles.values().map(|p| usable_weight(p.weight)).sum();
    let equal_weights = candidate_weight <= 0.0;
    let denominator = if equal_weights {
        profiles.len().max(successes.len()) as f64
    } else {
        candidate_weight
    };
    if denominator <= 0.0 {
        return 0.0;
    }

    let mass: f64 = successes
        .iter()
        .filter(|v| votes_flagged(v, profiles))
        .filter_map(|v| {
            let (_, confidence) = v.scores()?;
            let weight = if equal_weights {
                1.0
            } else {
                usable_weight(profile(profiles, &v.backend_id).weight)
            };
            Some(weight * confidence)
        })
        .sum();
    mass / denominator
}

/// No flagged vote means no flag, even at a zero threshold.
fn mass_reaches(mass: f64, threshold: f64) -> bool {
    mass > 0.0 && mass >= threshold
}

fn majority(successes: &[&Verdict], profiles: &ProfileTable) -> Combined {
    let flagged = successes
        .iter()
        .filter(|v| votes_flagged(v, profiles))
        .count();
    let (risk, confidence) = plain_means(successes);
    let n = successes.len();
    Combined {
        is_flagged: flagged * 2 > n,
        risk,
        confidence,
        disagreement: flagged * 2 == n,
    }
}

fn weighted(successes: &[&Verdict], request: &ConsensusRequest, profiles: &ProfileTable) -> Combined {
    let (risk, confidence) = weighted_means(successes, profiles);
    Combined {
        is_flagged: risk >= request.risk_threshold,
        risk,
        confidence,
        disagreement: false,
    }
}

fn unanimous(successes: &[&Verdict], profiles: &ProfileTable) -> Combined {
    let flagged = successes
        .iter()
        .filter(|v| votes_flagged(v, profiles))
        .count();
    let (risk, confidence) = weighted_means(successes, profiles);
    Combined {
        is_flagged: flagged == successes.len(),
        risk,
        confidence,
        disagreement: flagged != 0 && flagged != successes.len(),
    }
}

fn threshold(
    successes: &[&Verdict],
    request: &ConsensusRequest,
    profiles: &ProfileTable,
) -> Combined {
    let (risk, confidence) = weighted_means(successes, profiles);
    Combined {
        is_flagged: mass_reaches(flagged_mass(successes, profiles), request.confidence_threshold),
        risk,
        confidence,
        disagreement: false,
    }
}
