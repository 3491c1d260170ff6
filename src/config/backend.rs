//! Backend configuration

use crate::registry::{BackendDescriptor, DEFAULT_FLAG_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a configured backend is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeType {
    /// JSON over HTTP
    #[default]
    Http,
    /// Fixed judgment, no network
    Static,
}

/// Judgment returned by a `static` backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedJudgmentConfig {
    pub risk_score: f64,
    pub confidence: f64,
}

/// Backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(rename = "type", default)]
    pub judge_type: JudgeType,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_base_weight")]
    pub base_weight: f64,
    #[serde(default)]
    pub cost_per_call: f64,
    /// Per-call timeout; falls back to `engine.default_timeout_ms`
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_flag_threshold")]
    pub flag_threshold: f64,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub fixed: Option<FixedJudgmentConfig>,
}

fn default_provider() -> String {
    "http".to_string()
}

fn default_base_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

fn default_flag_threshold() -> f64 {
    DEFAULT_FLAG_THRESHOLD
}

impl BackendConfig {
    /// HTTP backend with every optional field at its default.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: default_provider(),
            judge_type: JudgeType::default(),
            url: None,
            base_weight: default_base_weight(),
            cost_per_call: 0.0,
            timeout_ms: None,
            enabled: default_enabled(),
            flag_threshold: default_flag_threshold(),
            api_key_env: None,
            fixed: None,
        }
    }

    /// Registry descriptor for this backend.
    pub fn to_descriptor(&self, default_timeout: Duration) -> BackendDescriptor {
        let timeout = self
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);

        BackendDescriptor::new(self.id.clone(), self.provider.clone())
            .with_base_weight(self.base_weight)
            .with_cost_per_call(self.cost_per_call)
            .with_timeout(timeout)
            .with_flag_threshold(self.flag_threshold)
            .with_enabled(self.enabled)
    }
}
