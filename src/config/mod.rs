//! Configuration module for Verdict
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`VERDICT_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use verdict::config::VerdictConfig;
//!
//! let toml = r#"
//! [engine]
//! max_in_flight = 4
//!
//! [[backends]]
//! id = "dry-run"
//! type = "static"
//! fixed = { risk_score = 0.1, confidence = 0.9 }
//! "#;
//! let config: VerdictConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.engine.max_in_flight, 4);
//! assert!(config.validate().is_ok());
//! ```

pub mod backend;
pub mod engine;
pub mod error;
pub mod logging;

pub use crate::performance::PerformanceConfig;
pub use backend::{BackendConfig, FixedJudgmentConfig, JudgeType};
pub use engine::EngineConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Unified configuration of the consensus engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VerdictConfig {
    /// Dispatch limits and request defaults
    pub engine: EngineConfig,
    /// Rolling statistics settings
    pub performance: PerformanceConfig,
    /// Judge backends registered at startup
    pub backends: Vec<BackendConfig>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl VerdictConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are ignored and the current value is kept.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("VERDICT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("VERDICT_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }
        if let Ok(max) = std::env::var("VERDICT_MAX_IN_FLIGHT") {
            if let Ok(n) = max.parse() {
                self.engine.max_in_flight = n;
            }
        }
        if let Ok(strategy) = std::env::var("VERDICT_STRATEGY") {
            if let Ok(s) = strategy.parse() {
                self.engine.default_strategy = s;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if engine.max_in_flight == 0 {
            return Err(ConfigError::invalid(
                "engine.max_in_flight",
                "must be at least 1",
            ));
        }
        if engine.default_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "engine.default_timeout_ms",
                "must be non-zero",
            ));
        }
        check_unit(
            "engine.default_confidence_threshold",
            engine.default_confidence_threshold,
        )?;
        check_unit(
            "engine.default_risk_threshold",
            engine.default_risk_threshold,
        )?;

        let alpha = self.performance.alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::invalid(
                "performance.alpha",
                format!("must be in (0, 1], got {}", alpha),
            ));
        }
        let floor = self.performance.weight_floor;
        if !(floor.is_finite() && floor > 0.0) {
            return Err(ConfigError::invalid(
                "performance.weight_floor",
                format!("must be positive, got {}", floor),
            ));
        }

        let mut seen = HashSet::new();
        for (i, backend) in self.backends.iter().enumerate() {
            if backend.id.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("backends[{}].id", i),
                    "id cannot be empty",
                ));
            }
            if !seen.insert(backend.id.as_str()) {
                return Err(ConfigError::invalid(
                    format!("backends[{}].id", i),
                    format!("duplicate backend id '{}'", backend.id),
                ));
            }
            if !(backend.base_weight.is_finite() && backend.base_weight > 0.0) {
                return Err(ConfigError::invalid(
                    format!("backends[{}].base_weight", i),
                    "must be positive",
                ));
            }
            if !(backend.cost_per_call.is_finite() && backend.cost_per_call >= 0.0) {
                return Err(ConfigError::invalid(
                    format!("backends[{}].cost_per_call", i),
                    "must be a non-negative number",
                ));
            }
            if backend.timeout_ms == Some(0) {
                return Err(ConfigError::invalid(
                    format!("backends[{}].timeout_ms", i),
                    "must be non-zero",
                ));
            }
            check_unit(
                &format!("backends[{}].flag_threshold", i),
                backend.flag_threshold,
            )?;
            match backend.judge_type {
                JudgeType::Http if backend.url.as_deref().is_none_or(str::is_empty) => {
                    return Err(ConfigError::invalid(
                        format!("backends[{}].url", i),
                        "http backends require a URL",
                    ));
                }
                JudgeType::Static if backend.fixed.is_none() => {
                    return Err(ConfigError::invalid(
                        format!("backends[{}].fixed", i),
                        "static backends require a fixed judgment",
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn check_unit(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be in [0, 1], got {}", value),
        ))
    }
}
