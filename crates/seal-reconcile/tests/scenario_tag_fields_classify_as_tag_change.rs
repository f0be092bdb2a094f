//! Tag-like fields are low-weight TAG_CHANGE drift wherever the key name
//! mentions "tag", not only under a `tags` mapping.

use seal_reconcile::*;

#[test]
fn tag_policy_change_is_tag_change() {
    let declared = StateNode::mapping([("tagPolicy", StateNode::from("strict"))]);
    let live = StateNode::mapping([("tagPolicy", StateNode::from("lax"))]);

    let report = Reconciler::new(declared)
        .unwrap()
        .analyze_drift(&live)
        .unwrap();

    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].category, TAG_CHANGE);
    assert_eq!(report.total_severity, 0.5);
    assert_eq!(report.recommendation, RecommendationTier::Stable);
}

#[test]
fn tag_fields_group_under_one_category() {
    let declared = StateNode::mapping([
        ("cost_tag", StateNode::from("voryx")),
        ("tags", StateNode::mapping([("owner", StateNode::from("a"))])),
        ("env", StateNode::from("production")),
    ]);
    let live = StateNode::mapping([
        ("cost_tag", StateNode::from("other")),
        ("tags", StateNode::mapping([("owner", StateNode::from("b"))])),
        ("env", StateNode::from("staging")),
    ]);

    let report = Reconciler::new(declared)
        .unwrap()
        .analyze_drift(&live)
        .unwrap();

    let counts = report.count_by_category();
    assert_eq!(counts.get(TAG_CHANGE), Some(&2));
    assert_eq!(counts.get(GENERIC_CHANGE), Some(&1));
    assert_eq!(report.total_severity, 2.0);

    let owner = Path::root().child_key("tags").child_key("owner");
    let at_owner: Vec<&DriftFinding> = report.findings_at(&owner).collect();
    assert_eq!(at_owner.len(), 1);
    assert_eq!(at_owner[0].kind, DivergenceKind::Changed);
    assert_eq!(at_owner[0].live_value, Some(StateNode::from("b")));
}
