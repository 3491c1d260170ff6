//! Engine configuration

use crate::consensus::{
    ConsensusRequest, ConsensusStrategy, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_RISK_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Dispatch limits and per-request defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine-wide cap on concurrent backend calls
    pub max_in_flight: usize,
    pub default_timeout_ms: u64,
    pub default_strategy: ConsensusStrategy,
    pub default_confidence_threshold: f64,
    pub default_risk_threshold: f64,
    pub default_min_quorum: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 16,
            default_timeout_ms: 10_000,
            default_strategy: ConsensusStrategy::default(),
            default_confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            default_risk_threshold: DEFAULT_RISK_THRESHOLD,
            default_min_quorum: 1,
        }
    }
}

impl EngineConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Request for `content` carrying the configured defaults.
    pub fn request(&self, content: impl Into<Arc<str>>) -> ConsensusRequest {
        ConsensusRequest::new(content, self.default_strategy)
            .with_confidence_threshold(self.default_confidence_threshold)
            .with_risk_threshold(self.default_risk_threshold)
            .with_min_quorum(self.default_min_quorum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_in_flight, 16);
        assert_eq!(config.default_timeout(), Duration::from_secs(10));
        assert_eq!(config.default_strategy, ConsensusStrategy::Weighted);
    }

    #[test]
    fn test_engine_request_uses_defaults() {
        let config = EngineConfig {
            default_strategy: ConsensusStrategy::Threshold,
            default_confidence_threshold: 0.6,
            default_min_quorum: 2,
            ..Default::default()
        };

        let request = config.request("text");
        assert_eq!(request.strategy, ConsensusStrategy::Threshold);
        assert_eq!(request.confidence_threshold, 0.6);
        assert_eq!(request.min_quorum, 2);
        assert!(request.backend_ids.is_none());
    }

    #[test]
    fn test_engine_strategy_from_toml() {
        let config: EngineConfig = toml::from_str(r#"default_strategy = "cascading""#).unwrap();
        assert_eq!(config.default_strategy, ConsensusStrategy::Cascading);
        assert_eq!(config.max_in_flight, 16);
    }
}
