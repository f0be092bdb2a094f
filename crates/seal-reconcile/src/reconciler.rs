use tracing::debug;

use crate::aggregate::{aggregate, ThresholdTable};
use crate::engine::compare;
use crate::error::DriftResult;
use crate::state_adapter::validate;
use crate::{DriftReport, RuleSet, StateNode};

/// Deepest nesting the engine is designed for. Deeper input is rejected as
/// malformed rather than recursed into.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Immutable configuration bound to a [`Reconciler`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcilerConfig {
    pub rules: RuleSet,
    pub thresholds: ThresholdTable,
    pub max_depth: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            rules: RuleSet::builtin(),
            thresholds: ThresholdTable::builtin(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Binds a declared state to a configuration.
///
/// Stateless beyond that binding: [`analyze_drift`](Self::analyze_drift)
/// takes `&self`, so one reconciler can be shared across threads and called
/// with any number of live states.
#[derive(Clone, Debug)]
pub struct Reconciler {
    declared: StateNode,
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Reconciler with the built-in rules and thresholds.
    pub fn new(declared: StateNode) -> DriftResult<Self> {
        Self::with_config(declared, ReconcilerConfig::default())
    }

    /// Validates `declared` against `config.max_depth` up front so a bad
    /// declared tree fails here, not on the first comparison.
    pub fn with_config(declared: StateNode, config: ReconcilerConfig) -> DriftResult<Self> {
        validate(&declared, config.max_depth)?;
        Ok(Self { declared, config })
    }

    pub fn declared(&self) -> &StateNode {
        &self.declared
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Compare `live` against the declared state and score the result.
    ///
    /// Pure: no IO, no printing, no state carried between calls.
    pub fn analyze_drift(&self, live: &StateNode) -> DriftResult<DriftReport> {
        validate(live, self.config.max_depth)?;

        let findings = compare(
            &self.declared,
            live,
            &self.config.rules,
            self.config.max_depth,
        )?;
        let (total_severity, recommendation) = aggregate(&findings, &self.config.thresholds);

        debug!(
            findings = findings.len(),
            total_severity,
            recommendation = recommendation.as_str(),
            "drift analysis complete"
        );

        Ok(DriftReport {
            findings,
            total_severity,
            recommendation,
        })
    }
}
