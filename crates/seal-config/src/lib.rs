//! seal-config
//!
//! Layered YAML configuration for the drift reconciler.
//!
//! - Documents merge in order: earlier layers are the base, later layers
//!   override. Mappings merge key by key; sequences (e.g. `rules`) are
//!   replaced wholesale.
//! - The merged document is hashed (sha256 of canonical JSON) so a report
//!   can be tied to the exact configuration that produced it.
//! - Keys the engine never reads are reported by [`report_unused_keys`].
//! - [`SealConfig`] is the typed view: rule table, thresholds, adapter
//!   settings and the gate tier, validated eagerly.

mod settings;

pub use settings::SealConfig;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use tracing::{debug, warn};

/// JSON-pointer prefixes the engine consumes. A leaf under any of these is
/// "used"; everything else is reported as unused.
///
/// Keep this in step with `settings.rs`: only list what is actually read.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/rules",
    "/thresholds",
    "/limits/max_depth",
    "/state/unordered_fields",
    "/gate/block_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Consumed JSON-pointer prefixes used for this analysis (sorted, unique)
    pub consumed_prefixes: Vec<String>,
    /// Unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// List every leaf of `config_json` that no reconciler setting reads.
///
/// `Warn` logs the list and returns it; `Fail` turns a non-empty list into a
/// `CONFIG_UNUSED_KEYS` error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed_prefixes: Vec<String> = CONSUMED_POINTERS
        .iter()
        .map(|p| p.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let unused: Vec<String> = leaf_pointers(config_json)
        .into_iter()
        .filter(|leaf| !consumed_prefixes.iter().any(|cp| pointer_covers(cp, leaf)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if !report.is_clean() {
        match policy {
            UnusedKeyPolicy::Fail => bail!(
                "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
                 Remove them or fix the spelling. First few: {}",
                report.unused_leaf_pointers.len(),
                first_few(&report.unused_leaf_pointers, 12)
            ),
            UnusedKeyPolicy::Warn => warn!(
                unused = report.unused_leaf_pointers.len(),
                first = %first_few(&report.unused_leaf_pointers, 12),
                "config contains keys the reconciler does not read"
            ),
        }
    }

    Ok(report)
}

/// `setting` covers `leaf` when they are equal or `leaf` lies underneath it.
/// `/rules` covers `/rules/0/category`; it does not cover `/rulesets`.
fn pointer_covers(setting: &str, leaf: &str) -> bool {
    match leaf.strip_prefix(setting) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// RFC 6901 pointers to every scalar under `v`, in key order. Empty
/// mappings and lists contribute nothing; a bare scalar document yields `/`.
fn leaf_pointers(v: &Value) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack: Vec<(String, &Value)> = vec![(String::new(), v)];
    while let Some((at, node)) = stack.pop() {
        let children: Vec<(String, &Value)> = match node {
            Value::Object(map) => map
                .iter()
                .map(|(k, child)| (format!("{at}/{}", k.replace('~', "~0").replace('/', "~1")), child))
                .collect(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, child)| (format!("{at}/{i}"), child))
                .collect(),
            _ => Vec::new(),
        };
        if children.is_empty() {
            if !matches!(node, Value::Object(_) | Value::Array(_)) {
                out.push(if at.is_empty() { "/".to_string() } else { at });
            }
            continue;
        }
        stack.extend(children.into_iter().rev());
    }
    out
}

fn first_few(items: &[String], n: usize) -> String {
    let shown = items.iter().take(n).map(String::as_str).collect::<Vec<_>>().join(", ");
    if items.len() > n {
        format!("{shown}, ...")
    } else {
        shown
    }
}

// ---------------------------------------------------------------------------
// Layered loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        debug!(path = %p, bytes = raw.len(), "config layer read");
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for (i, raw) in yaml_docs.iter().enumerate() {
        let v_yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty document is an empty layer, not a reset.
        if v_json.is_null() {
            continue;
        }
        overlay(&mut merged, v_json);
    }

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    debug!(layers = yaml_docs.len(), config_hash = %config_hash, "config merged");
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Apply one config layer on top of `base`. Mappings merge key by key;
/// anything else in `layer` (scalars, `rules`, `thresholds`) replaces what
/// was there.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (k, v) in layer_map {
                match base_map.get_mut(&k) {
                    Some(existing) => overlay(existing, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, other) => *slot = other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json::Map is a BTreeMap here (no preserve_order feature), so
    // keys serialize sorted and the output is canonical.
    serde_json::to_string(v).context("canonical json serialize failed")
}
