//! Severity Aggregator & Recommender.
//!
//! Sums finding severities and maps the total to a [`RecommendationTier`]
//! through an ordered threshold table. Bounds are exclusive: a score must be
//! strictly greater than a band's `above` to land in it.

use crate::error::{DriftError, DriftResult};
use crate::{DriftFinding, RecommendationTier};

/// One band: scores strictly above `above` map to `tier`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Threshold {
    pub above: f64,
    pub tier: RecommendationTier,
}

impl Threshold {
    pub fn new(above: f64, tier: RecommendationTier) -> Self {
        Self { above, tier }
    }
}

/// Bands sorted from highest bound to lowest, plus the tier used when no
/// band matches.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdTable {
    bands: Vec<Threshold>,
    floor: RecommendationTier,
}

impl ThresholdTable {
    /// Validate and sort `bands`. Scores matching no band are `Stable`.
    ///
    /// Rejects non-finite bounds and duplicate bounds.
    pub fn new(mut bands: Vec<Threshold>) -> DriftResult<Self> {
        for b in &bands {
            if !b.above.is_finite() {
                return Err(DriftError::InvalidThresholds {
                    reason: format!("bound {} for {} is not finite", b.above, b.tier),
                });
            }
        }
        bands.sort_by(|a, b| b.above.total_cmp(&a.above));
        if let Some(w) = bands.windows(2).find(|w| w[0].above == w[1].above) {
            return Err(DriftError::InvalidThresholds {
                reason: format!(
                    "bound {} is used twice ({} and {})",
                    w[0].above, w[0].tier, w[1].tier
                ),
            });
        }
        Ok(Self {
            bands,
            floor: RecommendationTier::Stable,
        })
    }

    /// `> 5 → SevereDrift`, `> 1 → MinorDrift`, otherwise `Stable`.
    pub fn builtin() -> Self {
        Self {
            bands: vec![
                Threshold::new(5.0, RecommendationTier::SevereDrift),
                Threshold::new(1.0, RecommendationTier::MinorDrift),
            ],
            floor: RecommendationTier::Stable,
        }
    }

    pub fn bands(&self) -> &[Threshold] {
        &self.bands
    }

    pub fn tier_for(&self, total_severity: f64) -> RecommendationTier {
        self.bands
            .iter()
            .find(|b| total_severity > b.above)
            .map(|b| b.tier)
            .unwrap_or(self.floor)
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Total severity (0 for no findings) and the tier it maps to.
pub fn aggregate(
    findings: &[DriftFinding],
    thresholds: &ThresholdTable,
) -> (f64, RecommendationTier) {
    let total: f64 = findings.iter().map(|f| f.severity).sum();
    (total, thresholds.tier_for(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DivergenceKind, Path, StateNode};

    fn finding(key: &str, severity: f64) -> DriftFinding {
        DriftFinding {
            path: Path::root().child_key(key),
            kind: DivergenceKind::Changed,
            category: "TEST".to_string(),
            severity,
            declared_value: Some(StateNode::from("a")),
            live_value: Some(StateNode::from("b")),
        }
    }

    #[test]
    fn empty_findings_are_stable_with_zero_severity() {
        let (total, tier) = aggregate(&[], &ThresholdTable::builtin());
        assert_eq!(total, 0.0);
        assert_eq!(tier, RecommendationTier::Stable);
    }

    #[test]
    fn boundaries_are_strictly_greater_than() {
        let t = ThresholdTable::builtin();
        assert_eq!(t.tier_for(1.0), RecommendationTier::Stable);
        assert_eq!(t.tier_for(1.5), RecommendationTier::MinorDrift);
        assert_eq!(t.tier_for(5.0), RecommendationTier::MinorDrift);
        assert_eq!(t.tier_for(5.01), RecommendationTier::SevereDrift);
    }

    #[test]
    fn adding_a_finding_never_lowers_the_total() {
        let t = ThresholdTable::builtin();
        let mut findings = Vec::new();
        let mut last = 0.0;
        for (i, sev) in [0.5, 0.0, 4.0, 1.0, 5.0].iter().enumerate() {
            findings.push(finding(&format!("k{i}"), *sev));
            let (total, _) = aggregate(&findings, &t);
            assert!(total >= last);
            last = total;
        }
        assert_eq!(last, 10.5);
    }

    #[test]
    fn custom_bands_are_sorted_highest_first() {
        let t = ThresholdTable::new(vec![
            Threshold::new(0.0, RecommendationTier::MinorDrift),
            Threshold::new(3.0, RecommendationTier::SevereDrift),
        ])
        .unwrap();
        assert_eq!(t.bands()[0].above, 3.0);
        assert_eq!(t.tier_for(0.0), RecommendationTier::Stable);
        assert_eq!(t.tier_for(0.5), RecommendationTier::MinorDrift);
        assert_eq!(t.tier_for(3.5), RecommendationTier::SevereDrift);
    }

    #[test]
    fn bad_bands_are_rejected() {
        assert!(ThresholdTable::new(vec![Threshold::new(
            f64::INFINITY,
            RecommendationTier::SevereDrift
        )])
        .is_err());
        assert!(ThresholdTable::new(vec![
            Threshold::new(2.0, RecommendationTier::SevereDrift),
            Threshold::new(2.0, RecommendationTier::MinorDrift),
        ])
        .is_err());
    }
}
