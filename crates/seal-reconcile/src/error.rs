use thiserror::Error;

use crate::Path;

/// Errors raised by the reconciliation engine.
///
/// Well-formed input never produces an error at comparison time. Rule and
/// threshold problems are raised when the tables are built, before any
/// comparison runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriftError {
    /// A node outside the supported variant set, or a collection member that
    /// is not atomic.
    #[error("invalid state at {path}: {reason}")]
    InvalidState { path: Path, reason: String },

    /// Nesting exceeded `max_depth`. Owned trees cannot hold reference
    /// cycles, so runaway depth is how a cyclic source shows up here.
    #[error("state tree exceeds max depth {max_depth} at {path} (cyclic or runaway nesting)")]
    CyclicState { path: Path, max_depth: usize },

    #[error("invalid rule set: {reason}")]
    InvalidRuleSet { reason: String },

    #[error("invalid threshold table: {reason}")]
    InvalidThresholds { reason: String },
}

pub type DriftResult<T> = Result<T, DriftError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown recommendation tier '{0}' (expected stable | minor_drift | severe_drift)")]
pub struct UnknownTier(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown divergence kind '{0}' (expected added | removed | changed | type_mismatch)")]
pub struct UnknownKind(pub String);
