//! Consensus strategies for combining verdicts

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Consensus strategy determines how backends are dispatched and how their
/// verdicts are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStrategy {
    /// Flag when more than half of the successful verdicts vote flagged
    Majority,

    /// Reliability-weighted mean of risk scores against the request threshold
    #[default]
    Weighted,

    /// Flag only when every successful verdict votes flagged
    Unanimous,

    /// Flag as soon as the weighted confidence of flagged votes reaches the threshold
    Threshold,

    /// Query backends cheapest-first until confidence is sufficient
    Cascading,
}

impl ConsensusStrategy {
    /// All strategies, in declaration order.
    pub const ALL: [ConsensusStrategy; 5] = [
        ConsensusStrategy::Majority,
        ConsensusStrategy::Weighted,
        ConsensusStrategy::Unanimous,
        ConsensusStrategy::Threshold,
        ConsensusStrategy::Cascading,
    ];

    /// Whether candidate backends are invoked concurrently.
    pub fn is_parallel(self) -> bool {
        !matches!(self, ConsensusStrategy::Cascading)
    }

    /// Whether the strategy may stop before every candidate has answered.
    pub fn stops_early(self) -> bool {
        matches!(
            self,
            ConsensusStrategy::Threshold | ConsensusStrategy::Cascading
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConsensusStrategy::Majority => "majority",
            ConsensusStrategy::Weighted => "weighted",
            ConsensusStrategy::Unanimous => "unanimous",
            ConsensusStrategy::Threshold => "threshold",
            ConsensusStrategy::Cascading => "cascading",
        }
    }
}

impl FromStr for ConsensusStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "majority" => Ok(ConsensusStrategy::Majority),
            "weighted" => Ok(ConsensusStrategy::Weighted),
            "unanimous" => Ok(ConsensusStrategy::Unanimous),
            "threshold" => Ok(ConsensusStrategy::Threshold),
            "cascading" | "cascade" => Ok(ConsensusStrategy::Cascading),
            _ => Err(format!("Unknown consensus strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for ConsensusStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
