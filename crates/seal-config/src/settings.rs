//! Typed view of a merged config document.
//!
//! The raw structs mirror the YAML layout; [`SealConfig::from_json`]
//! normalizes them into engine types. Rule and threshold tables are
//! validated here, so a bad table fails at load time, before any state is
//! compared.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use seal_reconcile::{
    ClassificationRule, DivergenceKind, Matcher, RecommendationTier, ReconcilerConfig, RuleSet,
    StateAdapter, Threshold, ThresholdTable, DEFAULT_MAX_DEPTH,
};

use crate::LoadedConfig;

// ---------------------------------------------------------------------------
// Raw (YAML-level) structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    rules: Option<Vec<RawRule>>,
    thresholds: Option<Vec<RawThreshold>>,
    #[serde(default)]
    limits: RawLimits,
    #[serde(default)]
    state: RawState,
    #[serde(default)]
    gate: RawGate,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(rename = "match")]
    matcher: RawMatch,
    kinds: Option<Vec<String>>,
    category: String,
    severity: f64,
}

/// Exactly one of the fields must be set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMatch {
    exact: Option<String>,
    prefix: Option<String>,
    contains: Option<String>,
    #[serde(default)]
    any: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThreshold {
    above: f64,
    tier: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawLimits {
    max_depth: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RawState {
    #[serde(default)]
    unordered_fields: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGate {
    block_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn normalize_matcher(index: usize, raw: RawMatch) -> Result<Matcher> {
    let mut set: Vec<Matcher> = Vec::new();
    if let Some(p) = raw.exact {
        set.push(Matcher::Exact(p));
    }
    if let Some(p) = raw.prefix {
        set.push(Matcher::Prefix(p));
    }
    if let Some(p) = raw.contains {
        set.push(Matcher::Contains(p));
    }
    if raw.any {
        set.push(Matcher::Any);
    }
    match set.len() {
        1 => Ok(set.remove(0)),
        0 => bail!("rules[{index}].match: set one of exact | prefix | contains | any"),
        _ => bail!("rules[{index}].match: only one of exact | prefix | contains | any may be set"),
    }
}

fn normalize_rule(index: usize, raw: RawRule) -> Result<ClassificationRule> {
    let matcher = normalize_matcher(index, raw.matcher)?;
    let mut rule = ClassificationRule::new(matcher, raw.category, raw.severity);
    if let Some(kinds) = raw.kinds {
        let parsed = kinds
            .iter()
            .map(|k| k.parse::<DivergenceKind>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("rules[{index}].kinds"))?;
        rule = rule.only_for(parsed);
    }
    Ok(rule)
}

fn normalize_thresholds(raw: Vec<RawThreshold>) -> Result<ThresholdTable> {
    let mut bands = Vec::with_capacity(raw.len());
    for (i, t) in raw.into_iter().enumerate() {
        let tier: RecommendationTier = t
            .tier
            .parse()
            .with_context(|| format!("thresholds[{i}].tier"))?;
        bands.push(Threshold::new(t.above, tier));
    }
    ThresholdTable::new(bands).context("thresholds")
}

// ---------------------------------------------------------------------------
// SealConfig
// ---------------------------------------------------------------------------

/// Everything a caller needs to run and gate a drift analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct SealConfig {
    pub reconciler: ReconcilerConfig,
    pub adapter: StateAdapter,
    pub block_at: RecommendationTier,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            reconciler: ReconcilerConfig::default(),
            adapter: StateAdapter::new(),
            block_at: RecommendationTier::SevereDrift,
        }
    }
}

impl SealConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        Self::from_json(&loaded.config_json)
    }

    /// Build from a merged config document. Absent sections keep the
    /// built-in defaults; a present `rules` or `thresholds` list replaces
    /// the built-in table entirely.
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let raw: RawConfig = serde_json::from_value(config_json.clone())
            .context("config does not match the expected layout")?;

        let rules = match raw.rules {
            Some(raw_rules) => {
                let rules = raw_rules
                    .into_iter()
                    .enumerate()
                    .map(|(i, r)| normalize_rule(i, r))
                    .collect::<Result<Vec<_>>>()?;
                RuleSet::new(rules).context("rules")?
            }
            None => RuleSet::builtin(),
        };

        let thresholds = match raw.thresholds {
            Some(t) => normalize_thresholds(t)?,
            None => ThresholdTable::builtin(),
        };

        let max_depth = raw.limits.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        if max_depth == 0 {
            bail!("limits.max_depth must be at least 1");
        }

        let block_at = match raw.gate.block_at {
            Some(s) => s
                .parse::<RecommendationTier>()
                .context("gate.block_at")?,
            None => RecommendationTier::SevereDrift,
        };

        Ok(Self {
            reconciler: ReconcilerConfig {
                rules,
                thresholds,
                max_depth,
            },
            adapter: StateAdapter::new()
                .with_unordered_fields(raw.state.unordered_fields)
                .with_max_depth(max_depth),
            block_at,
        })
    }
}
