//! Performance tracking configuration

use serde::{Deserialize, Serialize};

/// Decay and floor of the rolling performance statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// EWMA weight of the newest sample, in (0, 1]
    pub alpha: f64,
    /// Lower bound of every effective weight
    pub weight_floor: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            weight_floor: 0.001,
        }
    }
}

impl PerformanceConfig {
    /// Replace invalid fields with their defaults, logging each one.
    ///
    /// `alpha` must lie in (0, 1] and `weight_floor` must be finite and
    /// positive.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let mut config = self;
        if !(config.alpha > 0.0 && config.alpha <= 1.0) {
            tracing::warn!(alpha = config.alpha, "Invalid EWMA alpha replaced with default");
            config.alpha = defaults.alpha;
        }
        if !(config.weight_floor.is_finite() && config.weight_floor > 0.0) {
            tracing::warn!(
                weight_floor = config.weight_floor,
                "Invalid weight floor replaced with default"
            );
            config.weight_floor = defaults.weight_floor;
        }
        config
    }
}
