//! Command handler modules for infraseal.
//!
//! Shared utilities (config + state file loading) live here. Rendering
//! lives in [`report`].

pub mod report;

use anyhow::{bail, Context, Result};
use seal_config::{load_layered_yaml, report_unused_keys, SealConfig, UnusedKeyPolicy};
use seal_reconcile::{StateAdapter, StateNode};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load layered config files, or the built-in defaults when none are given.
///
/// Unknown keys are logged, not fatal.
pub fn load_config(paths: &[String]) -> Result<SealConfig> {
    if paths.is_empty() {
        debug!("no --config given; using built-in rules and thresholds");
        return Ok(SealConfig::default());
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    let cfg = SealConfig::from_loaded(&loaded)
        .with_context(|| format!("invalid config (hash {})", loaded.config_hash))?;
    debug!(config_hash = %loaded.config_hash, "config loaded");
    Ok(cfg)
}

/// Read a state file and convert it through `adapter`. The format is
/// picked by extension: `.json`, `.yaml` or `.yml`.
pub fn load_state(path: &str, adapter: &StateAdapter) -> Result<StateNode> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let bytes = fs::read(path).with_context(|| format!("read state file failed: {path}"))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let raw = std::str::from_utf8(bytes)
        .with_context(|| format!("state file must be UTF-8 text: {path}"))?;

    let node = match ext.as_str() {
        "json" => {
            let v: serde_json::Value = serde_json::from_str(raw)
                .with_context(|| format!("state file is not valid JSON: {path}"))?;
            adapter.from_json(&v)
        }
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)
                .with_context(|| format!("state file is not valid YAML: {path}"))?;
            adapter.from_yaml(&v)
        }
        other => bail!(
            "unsupported state file extension '{other}' for {path}; expected .json, .yaml or .yml"
        ),
    };
    node.with_context(|| format!("state file rejected: {path}"))
}
