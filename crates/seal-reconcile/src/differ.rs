//! Value Differ: structural comparison of two state trees.
//!
//! Walks declared and live side by side and emits one [`Divergence`] per
//! point of difference. Classification happens later; this module only
//! answers "where" and "what kind".
//!
//! Traversal order:
//! - Mapping keys: lexicographic (union of both sides).
//! - Sequences: by index; the longer tail is Added / Removed.
//! - Collections: symmetric difference, members sorted by rendering.

use std::collections::BTreeMap;

use crate::error::{DriftError, DriftResult};
use crate::{DivergenceKind, Path, StateNode};

/// One raw point of difference, before classification.
#[derive(Clone, Debug, PartialEq)]
pub struct Divergence {
    pub path: Path,
    pub kind: DivergenceKind,
    pub declared: Option<StateNode>,
    pub live: Option<StateNode>,
}

impl Divergence {
    fn added(path: Path, live: &StateNode) -> Self {
        Self {
            path,
            kind: DivergenceKind::Added,
            declared: None,
            live: Some(live.clone()),
        }
    }

    fn removed(path: Path, declared: &StateNode) -> Self {
        Self {
            path,
            kind: DivergenceKind::Removed,
            declared: Some(declared.clone()),
            live: None,
        }
    }

    fn both(path: Path, kind: DivergenceKind, declared: &StateNode, live: &StateNode) -> Self {
        Self {
            path,
            kind,
            declared: Some(declared.clone()),
            live: Some(live.clone()),
        }
    }
}

/// Diff `declared` against `live`, starting at `path`.
///
/// Returns an empty vector when the trees are equal. Fails only if the
/// recursion goes deeper than `max_depth`.
pub fn diff(
    path: &Path,
    declared: &StateNode,
    live: &StateNode,
    max_depth: usize,
) -> DriftResult<Vec<Divergence>> {
    let mut out = Vec::new();
    diff_into(path, declared, live, max_depth, &mut out)?;
    Ok(out)
}

fn diff_into(
    path: &Path,
    declared: &StateNode,
    live: &StateNode,
    max_depth: usize,
    out: &mut Vec<Divergence>,
) -> DriftResult<()> {
    if path.depth() > max_depth {
        return Err(DriftError::CyclicState {
            path: path.clone(),
            max_depth,
        });
    }

    match (declared, live) {
        (StateNode::Mapping(d), StateNode::Mapping(l)) => diff_mappings(path, d, l, max_depth, out),
        (StateNode::Sequence(d), StateNode::Sequence(l)) => {
            diff_sequences(path, d, l, max_depth, out)
        }
        (StateNode::Collection(d), StateNode::Collection(l)) => {
            diff_collections(path, d, l, out);
            Ok(())
        }
        (d, l) if d.is_atomic() && l.is_atomic() => {
            if !d.same_type(l) {
                out.push(Divergence::both(
                    path.clone(),
                    DivergenceKind::TypeMismatch,
                    d,
                    l,
                ));
            } else if d != l {
                out.push(Divergence::both(path.clone(), DivergenceKind::Changed, d, l));
            }
            Ok(())
        }
        // Container vs primitive, or two different container shapes.
        (d, l) => {
            out.push(Divergence::both(
                path.clone(),
                DivergenceKind::TypeMismatch,
                d,
                l,
            ));
            Ok(())
        }
    }
}

fn diff_mappings(
    path: &Path,
    declared: &BTreeMap<String, StateNode>,
    live: &BTreeMap<String, StateNode>,
    max_depth: usize,
    out: &mut Vec<Divergence>,
) -> DriftResult<()> {
    // Both maps iterate in key order, so a merge walk visits the union
    // lexicographically without building a key set.
    let mut d_iter = declared.iter().peekable();
    let mut l_iter = live.iter().peekable();

    loop {
        match (d_iter.peek().copied(), l_iter.peek().copied()) {
            (None, None) => break,
            (Some((dk, dv)), None) => {
                out.push(Divergence::removed(path.child_key(dk), dv));
                d_iter.next();
            }
            (None, Some((lk, lv))) => {
                out.push(Divergence::added(path.child_key(lk), lv));
                l_iter.next();
            }
            (Some((dk, dv)), Some((lk, lv))) => match dk.cmp(lk) {
                std::cmp::Ordering::Less => {
                    out.push(Divergence::removed(path.child_key(dk), dv));
                    d_iter.next();
                }
                std::cmp::Ordering::Greater => {
                    out.push(Divergence::added(path.child_key(lk), lv));
                    l_iter.next();
                }
                std::cmp::Ordering::Equal => {
                    diff_into(&path.child_key(dk), dv, lv, max_depth, out)?;
                    d_iter.next();
                    l_iter.next();
                }
            },
        }
    }
    Ok(())
}

fn diff_sequences(
    path: &Path,
    declared: &[StateNode],
    live: &[StateNode],
    max_depth: usize,
    out: &mut Vec<Divergence>,
) -> DriftResult<()> {
    let common = declared.len().min(live.len());
    for i in 0..common {
        diff_into(&path.child_index(i), &declared[i], &live[i], max_depth, out)?;
    }
    for (i, extra) in declared.iter().enumerate().skip(common) {
        out.push(Divergence::removed(path.child_index(i), extra));
    }
    for (i, extra) in live.iter().enumerate().skip(common) {
        out.push(Divergence::added(path.child_index(i), extra));
    }
    Ok(())
}

fn diff_collections(
    path: &Path,
    declared: &[StateNode],
    live: &[StateNode],
    out: &mut Vec<Divergence>,
) {
    let mut found: Vec<Divergence> = Vec::new();

    for (i, member) in declared.iter().enumerate() {
        let duplicate = declared[..i].contains(member);
        if !duplicate && !live.contains(member) {
            found.push(Divergence::removed(path.child_member(member), member));
        }
    }
    for (i, member) in live.iter().enumerate() {
        let duplicate = live[..i].contains(member);
        if !duplicate && !declared.contains(member) {
            found.push(Divergence::added(path.child_member(member), member));
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
    out.extend(found);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathSegment;

    fn s(v: &str) -> StateNode {
        StateNode::from(v)
    }

    fn run(declared: &StateNode, live: &StateNode) -> Vec<Divergence> {
        diff(&Path::root(), declared, live, 64).unwrap()
    }

    #[test]
    fn equal_primitives_produce_nothing() {
        assert!(run(&s("x"), &s("x")).is_empty());
        assert!(run(&StateNode::from(3_i64), &StateNode::from(3.0)).is_empty());
        assert!(run(&StateNode::Null, &StateNode::Null).is_empty());
    }

    #[test]
    fn integer_beyond_f64_precision_is_not_masked_by_a_float() {
        let declared = StateNode::mapping([("quota", StateNode::from(9_007_199_254_740_993_i64))]);
        let live = StateNode::mapping([("quota", StateNode::from(9_007_199_254_740_992.0))]);
        let out = run(&declared, &live);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "quota");
        assert_eq!(out[0].kind, DivergenceKind::Changed);
    }

    #[test]
    fn different_primitive_values_are_changed() {
        let out = run(&s("postgres-14.5"), &s("postgres-15.0"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, DivergenceKind::Changed);
        assert!(out[0].path.is_root());
    }

    #[test]
    fn primitive_type_mismatch_is_reported_once() {
        let out = run(&StateNode::from(8080_i64), &s("8080"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, DivergenceKind::TypeMismatch);
    }

    #[test]
    fn mapping_vs_sequence_is_type_mismatch_without_recursion() {
        let declared = StateNode::mapping([("a", s("1"))]);
        let live = StateNode::sequence([s("1"), s("2")]);
        let out = run(&declared, &live);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, DivergenceKind::TypeMismatch);
        assert_eq!(out[0].declared.as_ref(), Some(&declared));
        assert_eq!(out[0].live.as_ref(), Some(&live));
    }

    #[test]
    fn mapping_keys_are_visited_lexicographically() {
        let declared = StateNode::mapping([("b", s("1")), ("d", s("1"))]);
        let live = StateNode::mapping([("a", s("1")), ("b", s("2")), ("c", s("1"))]);
        let out = run(&declared, &live);

        let rendered: Vec<(String, DivergenceKind)> =
            out.iter().map(|d| (d.path.to_string(), d.kind)).collect();
        assert_eq!(
            rendered,
            vec![
                ("a".to_string(), DivergenceKind::Added),
                ("b".to_string(), DivergenceKind::Changed),
                ("c".to_string(), DivergenceKind::Added),
                ("d".to_string(), DivergenceKind::Removed),
            ]
        );
    }

    #[test]
    fn nested_mappings_recurse() {
        let declared = StateNode::mapping([(
            "network",
            StateNode::mapping([("vpc", StateNode::mapping([("cidr", s("10.0.0.0/16"))]))]),
        )]);
        let live = StateNode::mapping([(
            "network",
            StateNode::mapping([("vpc", StateNode::mapping([("cidr", s("10.1.0.0/16"))]))]),
        )]);
        let out = run(&declared, &live);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "network.vpc.cidr");
        assert_eq!(out[0].kind, DivergenceKind::Changed);
    }

    #[test]
    fn sequence_reorder_is_two_changes() {
        let out = run(
            &StateNode::sequence([s("a"), s("b")]),
            &StateNode::sequence([s("b"), s("a")]),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].path.segments(), &[PathSegment::Index(0)]);
        assert_eq!(out[1].path.segments(), &[PathSegment::Index(1)]);
        assert!(out.iter().all(|d| d.kind == DivergenceKind::Changed));
    }

    #[test]
    fn sequence_tails_are_added_or_removed() {
        let shorter = StateNode::sequence([s("allow_ssh")]);
        let longer = StateNode::sequence([s("allow_ssh"), s("allow_web"), s("allow_db")]);

        let removed = run(&longer, &shorter);
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|d| d.kind == DivergenceKind::Removed));
        assert_eq!(removed[0].path.to_string(), "[1]");
        assert_eq!(removed[1].path.to_string(), "[2]");

        let added = run(&shorter, &longer);
        assert!(added.iter().all(|d| d.kind == DivergenceKind::Added));
        assert_eq!(added[0].live, Some(s("allow_web")));
    }

    #[test]
    fn collection_order_does_not_matter() {
        let out = run(
            &StateNode::collection([s("a"), s("b"), s("c")]),
            &StateNode::collection([s("c"), s("a"), s("b")]),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn collection_reports_symmetric_difference() {
        let out = run(
            &StateNode::collection([s("blue"), s("green"), s("green")]),
            &StateNode::collection([s("green"), s("red")]),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].path.to_string(), "{\"blue\"}");
        assert_eq!(out[0].kind, DivergenceKind::Removed);
        assert_eq!(out[1].path.to_string(), "{\"red\"}");
        assert_eq!(out[1].kind, DivergenceKind::Added);
    }

    #[test]
    fn sequence_vs_collection_is_type_mismatch() {
        let out = run(
            &StateNode::sequence([s("a")]),
            &StateNode::collection([s("a")]),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, DivergenceKind::TypeMismatch);
    }

    #[test]
    fn depth_guard_trips_past_limit() {
        let mut declared = s("leaf");
        let mut live = s("leaf");
        for _ in 0..10 {
            declared = StateNode::mapping([("n", declared)]);
            live = StateNode::mapping([("n", live)]);
        }
        assert!(diff(&Path::root(), &declared, &live, 10).is_ok());

        let err = diff(&Path::root(), &declared, &live, 9).unwrap_err();
        assert!(matches!(err, DriftError::CyclicState { max_depth: 9, .. }));
    }
}
