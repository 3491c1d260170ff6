//! Evaluate command implementation

use crate::cli::output::{format_result_json, format_result_table, ResultView};
use crate::cli::EvaluateArgs;
use crate::config::VerdictConfig;
use crate::consensus::{ConsensusEngine, ConsensusRequest};
use crate::judge::build_judge;
use std::sync::Arc;
use std::time::Duration;

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &EvaluateArgs,
) -> Result<VerdictConfig, Box<dyn std::error::Error>> {
    // Load from file if it exists, otherwise use defaults
    let mut config = if args.config.exists() {
        VerdictConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        VerdictConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if let Some(strategy) = args.strategy {
        config.engine.default_strategy = strategy;
    }

    Ok(config)
}

/// Build an engine with every configured backend registered.
///
/// A disabled backend whose judge cannot be built (typically a missing API
/// key) is skipped with a warning; an enabled one is an error.
pub fn build_engine(config: &VerdictConfig) -> Result<ConsensusEngine, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .build()?;
    let engine = ConsensusEngine::new(config.engine.clone(), config.performance);
    let default_timeout = config.engine.default_timeout();

    for backend in &config.backends {
        let judge = match build_judge(backend, &client) {
            Ok(judge) => judge,
            Err(e) if !backend.enabled => {
                tracing::warn!(
                    backend_id = %backend.id,
                    error = %e,
                    "Skipping disabled backend that could not be built"
                );
                continue;
            }
            Err(e) => return Err(format!("backend '{}': {}", backend.id, e).into()),
        };
        engine.register_backend(backend.to_descriptor(default_timeout), judge)?;
    }

    tracing::debug!(
        backends = engine.list_backends(false).len(),
        enabled = engine.list_backends(true).len(),
        "Engine built"
    );
    Ok(engine)
}

/// Build the request from arguments on top of configured defaults
pub fn build_request(
    args: &EvaluateArgs,
    config: &VerdictConfig,
) -> Result<ConsensusRequest, Box<dyn std::error::Error>> {
    let content: Arc<str> = match (&args.content, &args.file) {
        (Some(content), _) => content.as_str().into(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?
            .into(),
        (None, None) => return Err("Provide content to evaluate or --file".into()),
    };
    if content.trim().is_empty() {
        return Err("Content to evaluate is empty".into());
    }

    let mut request = config.engine.request(content);
    if !args.backends.is_empty() {
        request = request.with_backends(args.backends.iter().cloned());
    }
    if let Some(threshold) = args.confidence_threshold {
        request = request.with_confidence_threshold(threshold);
    }
    if let Some(threshold) = args.risk_threshold {
        request = request.with_risk_threshold(threshold);
    }
    if let Some(min_quorum) = args.min_quorum {
        request = request.with_min_quorum(min_quorum);
    }
    if let Some(deadline_ms) = args.deadline_ms {
        request = request.with_deadline(Duration::from_millis(deadline_ms));
    }

    Ok(request)
}

/// Evaluate with an already loaded configuration and render the result
pub async fn evaluate_with_config(
    args: &EvaluateArgs,
    config: &VerdictConfig,
) -> Result<String, Box<dyn std::error::Error>> {
    let engine = build_engine(config)?;
    let request = build_request(args, config)?;

    let result = engine.evaluate(request).await?;
    let view = ResultView::from(&result);

    if args.json {
        Ok(format_result_json(&view)?)
    } else {
        Ok(format_result_table(&view))
    }
}

/// Main evaluate command handler
pub async fn run_evaluate(args: EvaluateArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    crate::logging::init_tracing(&config.logging)?;

    evaluate_with_config(&args, &config).await
}
