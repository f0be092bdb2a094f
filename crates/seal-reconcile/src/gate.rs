//! Deploy gate.
//!
//! Turns a [`DriftReport`] into a go / no-go decision for automated
//! pipelines. A deploy may not proceed unless [`DeployGate::Permitted`] is
//! returned. Pure and deterministic; mapping the decision to an exit code
//! or a pipeline status is the caller's job.

use crate::error::DriftResult;
use crate::{DriftReport, Reconciler, RecommendationTier, StateNode};

/// Result of a gate check.
#[derive(Clone, Debug, PartialEq)]
pub enum DeployGate {
    /// Recommendation is below the blocking tier.
    Permitted,
    /// Recommendation reached the blocking tier.
    ///
    /// The embedded `report` carries the full drift evidence for logging and
    /// audit. Callers must treat this as a hard stop.
    Blocked { report: DriftReport },
}

impl DeployGate {
    pub fn is_permitted(&self) -> bool {
        matches!(self, DeployGate::Permitted)
    }

    pub fn is_blocked(&self) -> bool {
        !self.is_permitted()
    }
}

/// Block when `report.recommendation >= block_at`.
///
/// `block_at = Stable` blocks on every report, clean or not; callers that
/// want "any drift blocks" should use `MinorDrift` with thresholds tuned
/// accordingly.
pub fn check_deploy_gate(report: &DriftReport, block_at: RecommendationTier) -> DeployGate {
    if report.recommendation >= block_at {
        DeployGate::Blocked {
            report: report.clone(),
        }
    } else {
        DeployGate::Permitted
    }
}

/// Analyze `live` and gate on the result in one step.
pub fn gate_live_state(
    reconciler: &Reconciler,
    live: &StateNode,
    block_at: RecommendationTier,
) -> DriftResult<DeployGate> {
    let report = reconciler.analyze_drift(live)?;
    Ok(check_deploy_gate(&report, block_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(tier: RecommendationTier) -> DriftReport {
        DriftReport {
            findings: Vec::new(),
            total_severity: 0.0,
            recommendation: tier,
        }
    }

    #[test]
    fn severe_blocks_by_default_tier() {
        let g = check_deploy_gate(
            &report(RecommendationTier::SevereDrift),
            RecommendationTier::SevereDrift,
        );
        assert!(g.is_blocked());
    }

    #[test]
    fn minor_is_permitted_when_blocking_on_severe() {
        let g = check_deploy_gate(
            &report(RecommendationTier::MinorDrift),
            RecommendationTier::SevereDrift,
        );
        assert!(g.is_permitted());
    }

    #[test]
    fn minor_blocks_when_blocking_on_minor() {
        let r = report(RecommendationTier::MinorDrift);
        match check_deploy_gate(&r, RecommendationTier::MinorDrift) {
            DeployGate::Blocked { report } => assert_eq!(report, r),
            DeployGate::Permitted => panic!("expected Blocked"),
        }
    }
}
