//! Output formatting helpers for CLI commands

use crate::config::BackendConfig;
use crate::consensus::{ConsensusResult, Decision, Verdict, VerdictOutcome};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// View model for backend display
#[derive(Debug, Clone, Serialize)]
pub struct BackendView {
    pub id: String,
    pub provider: String,
    pub judge_type: String,
    pub url: Option<String>,
    pub enabled: bool,
    pub base_weight: f64,
    pub cost_per_call: f64,
    pub timeout_ms: u64,
    pub flag_threshold: f64,
}

impl BackendView {
    pub fn from_config(config: &BackendConfig, default_timeout: Duration) -> Self {
        let descriptor = config.to_descriptor(default_timeout);
        Self {
            id: descriptor.id,
            provider: descriptor.provider_name,
            judge_type: format!("{:?}", config.judge_type).to_lowercase(),
            url: config.url.clone(),
            enabled: descriptor.enabled,
            base_weight: descriptor.base_weight,
            cost_per_call: descriptor.cost_per_call,
            timeout_ms: descriptor.timeout.as_millis() as u64,
            flag_threshold: descriptor.flag_threshold,
        }
    }
}

/// Format backends as a table
pub fn format_backends_table(backends: &[BackendView]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "ID", "Provider", "Type", "Enabled", "Weight", "Cost", "Timeout", "Flag at",
    ]);

    for b in backends {
        let enabled = if b.enabled {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        };

        table.add_row(vec![
            Cell::new(&b.id),
            Cell::new(&b.provider),
            Cell::new(&b.judge_type),
            Cell::new(enabled),
            Cell::new(format!("{:.2}", b.base_weight)),
            Cell::new(format!("{:.4}", b.cost_per_call)),
            Cell::new(format!("{}ms", b.timeout_ms)),
            Cell::new(format!("{:.2}", b.flag_threshold)),
        ]);
    }

    table.to_string()
}

/// Format backends as JSON
pub fn format_backends_json(backends: &[BackendView]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "backends": backends
    }))
}

/// View model for one verdict
#[derive(Debug, Clone, Serialize)]
pub struct VerdictView {
    pub backend_id: String,
    pub outcome: VerdictOutcome,
    pub risk_score: Option<f64>,
    pub confidence: Option<f64>,
    pub latency_ms: u64,
    pub cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Verdict> for VerdictView {
    fn from(verdict: &Verdict) -> Self {
        Self {
            backend_id: verdict.backend_id.clone(),
            outcome: verdict.outcome,
            risk_score: verdict.risk_score,
            confidence: verdict.confidence,
            latency_ms: verdict.latency.as_millis() as u64,
            cost: verdict.cost,
            error: verdict.error.clone(),
        }
    }
}

/// View model for a consensus result
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub decision: Decision,
    pub is_flagged: bool,
    pub aggregate_risk_score: f64,
    pub aggregate_confidence: f64,
    pub strategy: String,
    pub disagreement: bool,
    pub early_stopped: bool,
    pub total_cost: f64,
    pub total_latency_ms: u64,
    /// Contributing verdicts first, then excluded ones
    pub verdicts: Vec<VerdictView>,
}

impl From<&ConsensusResult> for ResultView {
    fn from(result: &ConsensusResult) -> Self {
        Self {
            decision: result.decision(),
            is_flagged: result.is_flagged,
            aggregate_risk_score: result.aggregate_risk_score,
            aggregate_confidence: result.aggregate_confidence,
            strategy: result.strategy_used.to_string(),
            disagreement: result.disagreement,
            early_stopped: result.early_stopped,
            total_cost: result.total_cost,
            total_latency_ms: result.total_latency.as_millis() as u64,
            verdicts: result
                .contributing_verdicts
                .iter()
                .chain(&result.excluded_verdicts)
                .map(VerdictView::from)
                .collect(),
        }
    }
}

fn decision_label(decision: Decision) -> String {
    match decision {
        Decision::Flagged => "FLAGGED".red().bold().to_string(),
        Decision::Clear => "CLEAR".green().bold().to_string(),
        Decision::Undecided => "UNDECIDED".yellow().bold().to_string(),
    }
}

fn score(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| "-".to_string())
}

/// Format a consensus result as a summary line plus a verdict table
pub fn format_result_table(view: &ResultView) -> String {
    let mut summary = format!(
        "{}  risk {:.3}  confidence {:.3}  strategy {}  cost {:.4}  latency {}ms",
        decision_label(view.decision),
        view.aggregate_risk_score,
        view.aggregate_confidence,
        view.strategy,
        view.total_cost,
        view.total_latency_ms,
    );
    if view.early_stopped {
        summary.push_str("  (stopped early)");
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Backend",
        "Outcome",
        "Risk",
        "Confidence",
        "Latency",
        "Cost",
        "Error",
    ]);

    for v in &view.verdicts {
        let outcome = match v.outcome {
            VerdictOutcome::Success => "success".green().to_string(),
            VerdictOutcome::Failure => "failure".red().to_string(),
            VerdictOutcome::Timeout => "timeout".yellow().to_string(),
        };
        table.add_row(vec![
            Cell::new(&v.backend_id),
            Cell::new(outcome),
            Cell::new(score(v.risk_score)),
            Cell::new(score(v.confidence)),
            Cell::new(format!("{}ms", v.latency_ms)),
            Cell::new(format!("{:.4}", v.cost)),
            Cell::new(v.error.as_deref().unwrap_or("")),
        ]);
    }

    format!("{}\n{}", summary, table)
}

/// Format a consensus result as JSON
pub fn format_result_json(view: &ResultView) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(view)
}
