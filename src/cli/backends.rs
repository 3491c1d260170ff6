//! Backends command implementation

use crate::cli::output::{format_backends_json, format_backends_table, BackendView};
use crate::cli::BackendsListArgs;
use crate::config::VerdictConfig;

/// Handle backends list command
///
/// Lists backends as configured, sorted by id. No backend is contacted and
/// no API key is read.
pub fn handle_backends_list(
    args: &BackendsListArgs,
    config: &VerdictConfig,
) -> Result<String, Box<dyn std::error::Error>> {
    let default_timeout = config.engine.default_timeout();

    let mut views: Vec<BackendView> = config
        .backends
        .iter()
        .filter(|b| !args.enabled_only || b.enabled)
        .map(|b| BackendView::from_config(b, default_timeout))
        .collect();
    views.sort_by(|a, b| a.id.cmp(&b.id));

    if args.json {
        Ok(format_backends_json(&views)?)
    } else {
        Ok(format_backends_table(&views))
    }
}
