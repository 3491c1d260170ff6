//! Judge factory for creating Judge trait objects from configuration.

use super::{HttpJudge, Judge, JudgeError, StaticJudge};
use crate::config::{BackendConfig, JudgeType};
use reqwest::Client;
use std::sync::Arc;

/// Create a judge from backend configuration.
///
/// HTTP judges share `client` for connection pooling. When `api_key_env` is
/// set the key is read from that environment variable at build time.
///
/// # Examples
///
/// ```
/// use verdict::config::{BackendConfig, FixedJudgmentConfig, JudgeType};
/// use verdict::judge::build_judge;
/// use reqwest::Client;
///
/// let mut config = BackendConfig::new("dry-run");
/// config.judge_type = JudgeType::Static;
/// config.fixed = Some(FixedJudgmentConfig { risk_score: 0.1, confidence: 0.9 });
///
/// assert!(build_judge(&config, &Client::new()).is_ok());
/// ```
pub fn build_judge(config: &BackendConfig, client: &Client) -> Result<Arc<dyn Judge>, JudgeError> {
    match config.judge_type {
        JudgeType::Http => {
            let url = config.url.as_deref().ok_or_else(|| {
                JudgeError::Configuration(format!("backend '{}' requires a url", config.id))
            })?;

            let mut judge = HttpJudge::new(config.id.clone(), url, client.clone());
            if let Some(env_var) = &config.api_key_env {
                let api_key = std::env::var(env_var).map_err(|e| {
                    JudgeError::Configuration(format!(
                        "Failed to read API key from env var '{}': {}",
                        env_var, e
                    ))
                })?;
                judge = judge.with_api_key(api_key);
            }
            Ok(Arc::new(judge))
        }
        JudgeType::Static => {
            let fixed = config.fixed.as_ref().ok_or_else(|| {
                JudgeError::Configuration(format!(
                    "static backend '{}' requires a [backends.fixed] table",
                    config.id
                ))
            })?;
            Ok(Arc::new(StaticJudge::new(fixed.risk_score, fixed.confidence)))
        }
    }
}
