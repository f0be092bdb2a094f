//! seal-reconcile
//!
//! Drift Reconciliation Engine
//!
//! Architectural decisions:
//! - Declared and live state are compared by full structural recursion
//! - Mapping keys are visited in lexicographic order, never insertion order
//! - Ordered sequences compare element-wise; unordered collections as sets
//! - Every divergence is classified by an ordered rule table whose last rule
//!   always matches
//! - Severity bands are configuration, evaluated strictly-greater-than
//!
//! Deterministic, pure logic. No IO. No printing. The caller decides how to
//! render, gate on, or store a [`DriftReport`].

mod aggregate;
mod differ;
mod engine;
mod error;
mod gate;
mod reconciler;
mod rules;
mod state_adapter;
mod types;

pub use aggregate::{aggregate, Threshold, ThresholdTable};
pub use differ::{diff, Divergence};
pub use engine::compare;
pub use error::{DriftError, DriftResult, UnknownKind, UnknownTier};
pub use gate::{check_deploy_gate, gate_live_state, DeployGate};
pub use reconciler::{Reconciler, ReconcilerConfig, DEFAULT_MAX_DEPTH};
pub use rules::{
    Classification, ClassificationRule, Matcher, RuleSet, DATABASE_VERSION_CHANGE,
    GENERIC_CHANGE, SECURITY_GROUP_CHANGE, TAG_CHANGE,
};
pub use state_adapter::{validate, StateAdapter};
pub use types::*;
