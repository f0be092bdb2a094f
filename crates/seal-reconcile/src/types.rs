use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{UnknownKind, UnknownTier};

// ---------------------------------------------------------------------------
// Number
// ---------------------------------------------------------------------------

/// Numeric leaf value.
///
/// Integers are kept exact; only values that arrive as floats are floats.
/// Equality is by exact numeric value (`1 == 1.0`, but `2^53 + 1` is not
/// equal to the float `2^53`), and NaN equals NaN so a tree is always equal
/// to itself.
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(n) => n as f64,
            Number::UInt(n) => n as f64,
            Number::Float(n) => n,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match *self {
            Number::Int(n) => Some(i128::from(n)),
            Number::UInt(n) => Some(i128::from(n)),
            Number::Float(_) => None,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_i128(), other.as_i128()) {
            (Some(a), Some(b)) => a == b,
            (Some(n), None) => float_equals_int(other.as_f64(), n),
            (None, Some(n)) => float_equals_int(self.as_f64(), n),
            (None, None) => {
                let (a, b) = (self.as_f64(), other.as_f64());
                a == b || (a.is_nan() && b.is_nan())
            }
        }
    }
}

/// Exact comparison: `f` must be integral, inside the i64/u64 range and
/// equal to `n` without rounding.
fn float_equals_int(f: f64, n: i128) -> bool {
    // -2^63 ..= 2^64 (exclusive); both bounds are exact in f64.
    const LOWER: f64 = -9_223_372_036_854_775_808.0;
    const UPPER: f64 = 18_446_744_073_709_551_616.0;
    f.is_finite() && f.trunc() == f && (LOWER..UPPER).contains(&f) && f as i128 == n
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::UInt(n) => write!(f, "{n}"),
            Number::Float(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Number::Int(n) => serializer.serialize_i64(n),
            Number::UInt(n) => serializer.serialize_u64(n),
            Number::Float(n) => serializer.serialize_f64(n),
        }
    }
}

// ---------------------------------------------------------------------------
// StateNode
// ---------------------------------------------------------------------------

/// One node of a declared or live state tree.
///
/// `Sequence` is order-sensitive (firewall rule precedence, listener order).
/// `Collection` is a set of atomic members (tag sets, CIDR allow-lists).
/// Mapping keys live in a `BTreeMap`, so iteration is always lexicographic.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum StateNode {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<StateNode>),
    Collection(Vec<StateNode>),
    Mapping(BTreeMap<String, StateNode>),
}

impl StateNode {
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, StateNode)>,
    {
        StateNode::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn sequence<I: IntoIterator<Item = StateNode>>(items: I) -> Self {
        StateNode::Sequence(items.into_iter().collect())
    }

    pub fn collection<I: IntoIterator<Item = StateNode>>(items: I) -> Self {
        StateNode::Collection(items.into_iter().collect())
    }

    pub fn empty_mapping() -> Self {
        StateNode::Mapping(BTreeMap::new())
    }

    /// Stable name of the variant, used in error messages and rendering.
    pub fn type_name(&self) -> &'static str {
        match self {
            StateNode::Null => "null",
            StateNode::Bool(_) => "boolean",
            StateNode::Number(_) => "number",
            StateNode::String(_) => "string",
            StateNode::Sequence(_) => "sequence",
            StateNode::Collection(_) => "collection",
            StateNode::Mapping(_) => "mapping",
        }
    }

    /// Null, Boolean, Number or String.
    pub fn is_atomic(&self) -> bool {
        matches!(
            self,
            StateNode::Null | StateNode::Bool(_) | StateNode::Number(_) | StateNode::String(_)
        )
    }

    pub fn same_type(&self, other: &StateNode) -> bool {
        self.type_name() == other.type_name()
    }

    pub fn get(&self, key: &str) -> Option<&StateNode> {
        match self {
            StateNode::Mapping(m) => m.get(key),
            _ => None,
        }
    }
}

impl PartialEq for StateNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StateNode::Null, StateNode::Null) => true,
            (StateNode::Bool(a), StateNode::Bool(b)) => a == b,
            (StateNode::Number(a), StateNode::Number(b)) => a == b,
            (StateNode::String(a), StateNode::String(b)) => a == b,
            (StateNode::Sequence(a), StateNode::Sequence(b)) => a == b,
            (StateNode::Collection(a), StateNode::Collection(b)) => {
                a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x))
            }
            (StateNode::Mapping(a), StateNode::Mapping(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateNode::Null => f.write_str("null"),
            StateNode::Bool(b) => write!(f, "{b}"),
            StateNode::Number(n) => write!(f, "{n}"),
            StateNode::String(s) => write!(f, "{s:?}"),
            StateNode::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            StateNode::Collection(items) => {
                // Members have no order of their own; render them sorted.
                let mut rendered: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                rendered.sort();
                rendered.dedup();
                write!(f, "{{{}}}", rendered.join(","))
            }
            StateNode::Mapping(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k:?}:{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for StateNode {
    fn from(v: bool) -> Self {
        StateNode::Bool(v)
    }
}

impl From<i64> for StateNode {
    fn from(v: i64) -> Self {
        StateNode::Number(Number::Int(v))
    }
}

impl From<u64> for StateNode {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(n) => StateNode::Number(Number::Int(n)),
            Err(_) => StateNode::Number(Number::UInt(v)),
        }
    }
}

impl From<f64> for StateNode {
    fn from(v: f64) -> Self {
        StateNode::Number(Number::Float(v))
    }
}

impl From<&str> for StateNode {
    fn from(v: &str) -> Self {
        StateNode::String(v.to_string())
    }
}

impl From<String> for StateNode {
    fn from(v: String) -> Self {
        StateNode::String(v)
    }
}

// ---------------------------------------------------------------------------
// Path
// ---------------------------------------------------------------------------

/// One step from a node to a child.
///
/// Derived ordering gives the fixed total order used for findings: keys sort
/// lexicographically, indices numerically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    /// A member of an unordered collection, identified by its rendering.
    Member(String),
}

/// Location of a node inside a state tree. The empty path is the root.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child_key(&self, key: impl Into<String>) -> Self {
        self.child(PathSegment::Key(key.into()))
    }

    pub fn child_index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    pub fn child_member(&self, member: &StateNode) -> Self {
        self.child(PathSegment::Member(member.to_string()))
    }

    fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(segment);
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Mapping-key names along the path, root first. Indices and collection
    /// members are skipped; classification rules only look at names.
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|s| match s {
            PathSegment::Key(k) => Some(k.as_str()),
            _ => None,
        })
    }

    /// The key this path ends in, if its last segment is a mapping key.
    pub fn last_key(&self) -> Option<&str> {
        match self.0.last() {
            Some(PathSegment::Key(k)) => Some(k.as_str()),
            _ => None,
        }
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => f.write_str(k)?,
                PathSegment::Key(k) => write!(f, ".{k}")?,
                PathSegment::Index(n) => write!(f, "[{n}]")?,
                PathSegment::Member(m) => write!(f, "{{{m}}}")?,
            }
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Divergence kind
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceKind {
    /// Present only in live state.
    Added,
    /// Present only in declared state.
    Removed,
    /// Present on both sides with different values of the same type.
    Changed,
    /// Present on both sides with structurally incompatible types.
    TypeMismatch,
}

impl DivergenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DivergenceKind::Added => "ADDED",
            DivergenceKind::Removed => "REMOVED",
            DivergenceKind::Changed => "CHANGED",
            DivergenceKind::TypeMismatch => "TYPE_MISMATCH",
        }
    }
}

impl fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DivergenceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "added" => Ok(DivergenceKind::Added),
            "removed" => Ok(DivergenceKind::Removed),
            "changed" => Ok(DivergenceKind::Changed),
            "type_mismatch" => Ok(DivergenceKind::TypeMismatch),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendation tier
// ---------------------------------------------------------------------------

/// Outcome of a drift analysis. Ordered by escalation:
/// `Stable < MinorDrift < SevereDrift`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
    Stable,
    MinorDrift,
    SevereDrift,
}

impl RecommendationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationTier::Stable => "stable",
            RecommendationTier::MinorDrift => "minor_drift",
            RecommendationTier::SevereDrift => "severe_drift",
        }
    }

    /// Operator-facing action text.
    pub fn description(&self) -> &'static str {
        match self {
            RecommendationTier::Stable => "No significant drift. Stable.",
            RecommendationTier::MinorDrift => {
                "Minor drift detected. Forward-apply is safe and recommended."
            }
            RecommendationTier::SevereDrift => {
                "Severe drift detected. Requires manual investigation (rollback recommended)."
            }
        }
    }
}

impl fmt::Display for RecommendationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "stable" => Ok(RecommendationTier::Stable),
            "minor_drift" | "minor" => Ok(RecommendationTier::MinorDrift),
            "severe_drift" | "severe" => Ok(RecommendationTier::SevereDrift),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Findings + report
// ---------------------------------------------------------------------------

/// A classified, severity-scored divergence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DriftFinding {
    pub path: Path,
    pub kind: DivergenceKind,
    pub category: String,
    pub severity: f64,
    /// `None` when the node exists only in live state.
    pub declared_value: Option<StateNode>,
    /// `None` when the node exists only in declared state.
    pub live_value: Option<StateNode>,
}

/// Full report returned by [`Reconciler::analyze_drift`](crate::Reconciler::analyze_drift).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DriftReport {
    /// Sorted by path, then kind.
    pub findings: Vec<DriftFinding>,
    pub total_severity: f64,
    pub recommendation: RecommendationTier,
}

impl DriftReport {
    /// `true` when declared and live state are structurally identical.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn is_stable(&self) -> bool {
        self.recommendation == RecommendationTier::Stable
    }

    /// Findings grouped by category, categories in lexicographic order.
    pub fn count_by_category(&self) -> BTreeMap<&str, usize> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for f in &self.findings {
            *counts.entry(f.category.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn findings_at(&self, path: &Path) -> impl Iterator<Item = &DriftFinding> {
        let path = path.clone();
        self.findings.iter().filter(move |f| f.path == path)
    }
}
