//! State Adapter: turn parsed JSON / YAML documents into [`StateNode`] trees.
//!
//! # Purpose
//! IaC templates and cloud API responses arrive as generic JSON or YAML.
//! This module converts them into the closed [`StateNode`] variant set the
//! engine compares, and rejects anything that cannot be represented.
//!
//! # Design constraints
//! - Pure conversion. No IO.
//! - Sequences stay ordered unless their key is listed in
//!   `unordered_fields`; those become [`StateNode::Collection`] and must
//!   hold only atomic members.
//! - Every error names the offending path.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{DriftError, DriftResult};
use crate::reconciler::DEFAULT_MAX_DEPTH;
use crate::{Number, Path, StateNode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateAdapter {
    unordered_fields: BTreeSet<String>,
    max_depth: usize,
}

impl Default for StateAdapter {
    fn default() -> Self {
        Self {
            unordered_fields: BTreeSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl StateAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence values stored under any of these keys are treated as sets.
    pub fn with_unordered_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unordered_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn unordered_fields(&self) -> &BTreeSet<String> {
        &self.unordered_fields
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn is_unordered(&self, path: &Path) -> bool {
        path.last_key()
            .map(|k| self.unordered_fields.contains(k))
            .unwrap_or(false)
    }

    fn check_depth(&self, path: &Path) -> DriftResult<()> {
        if path.depth() > self.max_depth {
            return Err(DriftError::CyclicState {
                path: path.clone(),
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    pub fn from_json(&self, value: &serde_json::Value) -> DriftResult<StateNode> {
        self.json_at(&Path::root(), value)
    }

    fn json_at(&self, path: &Path, value: &serde_json::Value) -> DriftResult<StateNode> {
        use serde_json::Value;

        self.check_depth(path)?;
        match value {
            Value::Null => Ok(StateNode::Null),
            Value::Bool(b) => Ok(StateNode::Bool(*b)),
            Value::Number(n) => json_number(path, n),
            Value::String(s) => Ok(StateNode::String(s.clone())),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.json_at(&path.child_index(i), item)?);
                }
                self.sequence_or_collection(path, out)
            }
            Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.json_at(&path.child_key(k), v)?);
                }
                Ok(StateNode::Mapping(out))
            }
        }
    }

    // -----------------------------------------------------------------------
    // YAML
    // -----------------------------------------------------------------------

    pub fn from_yaml(&self, value: &serde_yaml::Value) -> DriftResult<StateNode> {
        self.yaml_at(&Path::root(), value)
    }

    fn yaml_at(&self, path: &Path, value: &serde_yaml::Value) -> DriftResult<StateNode> {
        use serde_yaml::Value;

        self.check_depth(path)?;
        match value {
            Value::Null => Ok(StateNode::Null),
            Value::Bool(b) => Ok(StateNode::Bool(*b)),
            Value::Number(n) => yaml_number(path, n),
            Value::String(s) => Ok(StateNode::String(s.clone())),
            Value::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.yaml_at(&path.child_index(i), item)?);
                }
                self.sequence_or_collection(path, out)
            }
            Value::Mapping(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    let Some(key) = k.as_str() else {
                        return Err(DriftError::InvalidState {
                            path: path.clone(),
                            reason: format!("mapping key {k:?} is not a string"),
                        });
                    };
                    out.insert(key.to_string(), self.yaml_at(&path.child_key(key), v)?);
                }
                Ok(StateNode::Mapping(out))
            }
            Value::Tagged(tagged) => Err(DriftError::InvalidState {
                path: path.clone(),
                reason: format!("tagged value {} is not supported", tagged.tag),
            }),
        }
    }

    fn sequence_or_collection(&self, path: &Path, items: Vec<StateNode>) -> DriftResult<StateNode> {
        if !self.is_unordered(path) {
            return Ok(StateNode::Sequence(items));
        }
        if let Some((i, bad)) = items.iter().enumerate().find(|(_, n)| !n.is_atomic()) {
            return Err(DriftError::InvalidState {
                path: path.child_index(i),
                reason: format!(
                    "unordered field holds a non-atomic {} member",
                    bad.type_name()
                ),
            });
        }
        Ok(StateNode::Collection(items))
    }
}

fn json_number(path: &Path, n: &serde_json::Number) -> DriftResult<StateNode> {
    if let Some(i) = n.as_i64() {
        return Ok(StateNode::Number(Number::Int(i)));
    }
    if let Some(u) = n.as_u64() {
        return Ok(StateNode::Number(Number::UInt(u)));
    }
    match n.as_f64() {
        Some(f) => Ok(StateNode::Number(Number::Float(f))),
        None => Err(DriftError::InvalidState {
            path: path.clone(),
            reason: format!("number {n} is not representable"),
        }),
    }
}

fn yaml_number(path: &Path, n: &serde_yaml::Number) -> DriftResult<StateNode> {
    if let Some(i) = n.as_i64() {
        return Ok(StateNode::Number(Number::Int(i)));
    }
    if let Some(u) = n.as_u64() {
        return Ok(StateNode::Number(Number::UInt(u)));
    }
    match n.as_f64() {
        Some(f) => Ok(StateNode::Number(Number::Float(f))),
        None => Err(DriftError::InvalidState {
            path: path.clone(),
            reason: format!("number {n} is not representable"),
        }),
    }
}

/// Check a tree built by hand (not through the adapter): depth within
/// `max_depth`, collection members atomic.
pub fn validate(node: &StateNode, max_depth: usize) -> DriftResult<()> {
    validate_at(&Path::root(), node, max_depth)
}

fn validate_at(path: &Path, node: &StateNode, max_depth: usize) -> DriftResult<()> {
    if path.depth() > max_depth {
        return Err(DriftError::CyclicState {
            path: path.clone(),
            max_depth,
        });
    }
    match node {
        StateNode::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                validate_at(&path.child_index(i), item, max_depth)?;
            }
            Ok(())
        }
        StateNode::Collection(items) => {
            for item in items {
                if !item.is_atomic() {
                    return Err(DriftError::InvalidState {
                        path: path.clone(),
                        reason: format!("collection holds a non-atomic {} member", item.type_name()),
                    });
                }
            }
            Ok(())
        }
        StateNode::Mapping(map) => {
            for (k, v) in map {
                validate_at(&path.child_key(k), v, max_depth)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
