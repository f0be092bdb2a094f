use crate::differ::diff;
use crate::error::DriftResult;
use crate::{DriftFinding, Path, RuleSet, StateNode};

/// Drift comparator: diff `declared` against `live` from the root, classify
/// every divergence with `rules`, and return the findings sorted by path
/// (then kind).
///
/// Fails fast. A divergence is never dropped; if it cannot be classified or
/// the trees are deeper than `max_depth`, the whole comparison errors.
pub fn compare(
    declared: &StateNode,
    live: &StateNode,
    rules: &RuleSet,
    max_depth: usize,
) -> DriftResult<Vec<DriftFinding>> {
    let divergences = diff(&Path::root(), declared, live, max_depth)?;

    let mut findings: Vec<DriftFinding> = Vec::with_capacity(divergences.len());
    for d in divergences {
        let c = rules.classify(&d.path, d.kind)?;
        findings.push(DriftFinding {
            path: d.path,
            kind: d.kind,
            category: c.category,
            severity: c.severity,
            declared_value: d.declared,
            live_value: d.live,
        });
    }

    // Stable ordering for findings (deterministic output).
    findings.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DivergenceKind, GENERIC_CHANGE, TAG_CHANGE};

    #[test]
    fn identical_trees_have_no_findings() {
        let s = StateNode::mapping([
            ("env", StateNode::from("production")),
            (
                "tags",
                StateNode::mapping([("owner", StateNode::from("akshaya"))]),
            ),
        ]);
        assert!(compare(&s, &s, &RuleSet::builtin(), 64).unwrap().is_empty());
    }

    #[test]
    fn findings_come_back_sorted_by_path() {
        let declared = StateNode::mapping([
            ("zone", StateNode::from("a")),
            ("tags", StateNode::mapping([("b", StateNode::from("1"))])),
            (
                "rules",
                StateNode::sequence((0..12_i64).map(StateNode::from)),
            ),
        ]);
        let live = StateNode::mapping([
            ("zone", StateNode::from("b")),
            ("tags", StateNode::mapping([("a", StateNode::from("1"))])),
            (
                "rules",
                StateNode::sequence((0..12_i64).map(|i| StateNode::from(i * 10))),
            ),
        ]);

        let findings = compare(&declared, &live, &RuleSet::builtin(), 64).unwrap();
        let paths: Vec<String> = findings.iter().map(|f| f.path.to_string()).collect();

        let mut expected: Vec<String> = (1..12).map(|i| format!("rules[{i}]")).collect();
        expected.push("tags.a".to_string());
        expected.push("tags.b".to_string());
        expected.push("zone".to_string());
        assert_eq!(paths, expected);

        let tag_added = &findings[11];
        assert_eq!(tag_added.kind, DivergenceKind::Added);
        assert_eq!(tag_added.category, TAG_CHANGE);
        assert_eq!(findings[13].category, GENERIC_CHANGE);
    }
}
