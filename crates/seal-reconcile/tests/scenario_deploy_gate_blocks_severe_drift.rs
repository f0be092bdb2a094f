use seal_reconcile::*;

fn declared() -> StateNode {
    StateNode::mapping([
        ("dbVersion", StateNode::from("postgres-14.5")),
        (
            "securityGroup",
            StateNode::sequence([StateNode::from("allow_ssh"), StateNode::from("allow_web")]),
        ),
    ])
}

#[test]
fn scenario_severe_drift_blocks_deploy() {
    let r = Reconciler::new(declared()).unwrap();
    let live = StateNode::mapping([
        ("dbVersion", StateNode::from("postgres-15.0")),
        ("securityGroup", StateNode::sequence([StateNode::from("allow_ssh")])),
    ]);

    let gate = gate_live_state(&r, &live, RecommendationTier::SevereDrift).unwrap();
    match gate {
        DeployGate::Blocked { report } => {
            assert_eq!(report.total_severity, 9.0);
            assert_eq!(report.findings.len(), 2);
        }
        DeployGate::Permitted => panic!("severe drift must block"),
    }
}

#[test]
fn scenario_matching_state_permits_deploy() {
    let r = Reconciler::new(declared()).unwrap();
    let gate = gate_live_state(&r, &declared(), RecommendationTier::SevereDrift).unwrap();
    assert!(gate.is_permitted());
}

#[test]
fn scenario_malformed_live_state_is_an_error_not_a_pass() {
    let r = Reconciler::new(declared()).unwrap();
    let live = StateNode::mapping([(
        "labels",
        StateNode::collection([StateNode::mapping([("k", StateNode::from("v"))])]),
    )]);
    let err = gate_live_state(&r, &live, RecommendationTier::SevereDrift).unwrap_err();
    match err {
        DriftError::InvalidState { path, .. } => assert_eq!(path.to_string(), "labels"),
        other => panic!("unexpected error: {other}"),
    }
}
