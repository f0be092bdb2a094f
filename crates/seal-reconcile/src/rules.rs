//! Classification Rules Engine.
//!
//! Maps a divergence (path + kind) to a category label and a severity
//! weight. Rules are evaluated top to bottom and the first match wins. A
//! [`RuleSet`] can only be built with an unconditional fallback as its last
//! rule, so `classify` resolves every divergence.
//!
//! Matchers test every mapping-key segment of the path, not only the leaf:
//! `securityGroup[1]` and `network.securityGroup.ingress[0]` both match
//! `Contains("securityGroup")`.

use crate::error::{DriftError, DriftResult};
use crate::{DivergenceKind, Path};

pub const SECURITY_GROUP_CHANGE: &str = "SECURITY_GROUP_CHANGE";
pub const DATABASE_VERSION_CHANGE: &str = "DATABASE_VERSION_CHANGE";
pub const TAG_CHANGE: &str = "TAG_CHANGE";
pub const GENERIC_CHANGE: &str = "GENERIC_CHANGE";

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Test applied to the key names of a path. Case-sensitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Matcher {
    /// Some key segment equals the pattern.
    Exact(String),
    /// Some key segment starts with the pattern.
    Prefix(String),
    /// Some key segment contains the pattern.
    Contains(String),
    /// Always matches, including the root path.
    Any,
}

impl Matcher {
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Exact(p) => path.key_names().any(|k| k == p.as_str()),
            Matcher::Prefix(p) => path.key_names().any(|k| k.starts_with(p.as_str())),
            Matcher::Contains(p) => path.key_names().any(|k| k.contains(p.as_str())),
        }
    }

    fn pattern(&self) -> Option<&str> {
        match self {
            Matcher::Exact(p) | Matcher::Prefix(p) | Matcher::Contains(p) => Some(p.as_str()),
            Matcher::Any => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationRule {
    pub matcher: Matcher,
    /// When set, the rule only applies to these divergence kinds.
    pub kinds: Option<Vec<DivergenceKind>>,
    pub category: String,
    pub severity: f64,
}

impl ClassificationRule {
    pub fn new(matcher: Matcher, category: impl Into<String>, severity: f64) -> Self {
        Self {
            matcher,
            kinds: None,
            category: category.into(),
            severity,
        }
    }

    /// Unconditional rule; the required last entry of every rule set.
    pub fn fallback(category: impl Into<String>, severity: f64) -> Self {
        Self::new(Matcher::Any, category, severity)
    }

    /// Restrict the rule to the given divergence kinds.
    pub fn only_for(mut self, kinds: impl IntoIterator<Item = DivergenceKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn applies(&self, path: &Path, kind: DivergenceKind) -> bool {
        let kind_ok = match &self.kinds {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        };
        kind_ok && self.matcher.matches(path)
    }

    pub fn is_unconditional(&self) -> bool {
        self.matcher == Matcher::Any && self.kinds.is_none()
    }

    fn check(&self, position: usize) -> DriftResult<()> {
        if self.category.trim().is_empty() {
            return Err(DriftError::InvalidRuleSet {
                reason: format!("rule #{position} has an empty category"),
            });
        }
        if !self.severity.is_finite() || self.severity < 0.0 {
            return Err(DriftError::InvalidRuleSet {
                reason: format!(
                    "rule #{position} ({}) has severity {}; must be finite and >= 0",
                    self.category, self.severity
                ),
            });
        }
        if let Some(p) = self.matcher.pattern() {
            if p.is_empty() {
                return Err(DriftError::InvalidRuleSet {
                    reason: format!(
                        "rule #{position} ({}) has an empty match pattern",
                        self.category
                    ),
                });
            }
        }
        if let Some(kinds) = &self.kinds {
            if kinds.is_empty() {
                return Err(DriftError::InvalidRuleSet {
                    reason: format!(
                        "rule #{position} ({}) has an empty kinds filter and can never match",
                        self.category
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Result of classifying one divergence.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub category: String,
    pub severity: f64,
}

// ---------------------------------------------------------------------------
// Rule set
// ---------------------------------------------------------------------------

/// Ordered, validated list of classification rules.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
}

impl RuleSet {
    /// Validate and wrap `rules`.
    ///
    /// The last rule must be unconditional (`Matcher::Any`, no kinds filter),
    /// and every severity must be finite and non-negative.
    pub fn new(rules: Vec<ClassificationRule>) -> DriftResult<Self> {
        let Some(last) = rules.last() else {
            return Err(DriftError::InvalidRuleSet {
                reason: "rule set is empty; a default rule is required".to_string(),
            });
        };
        if !last.is_unconditional() {
            return Err(DriftError::InvalidRuleSet {
                reason: format!(
                    "last rule ({}) is not an unconditional default; \
                     append a rule with `any: true` and no kinds filter",
                    last.category
                ),
            });
        }
        for (i, rule) in rules.iter().enumerate() {
            rule.check(i)?;
        }
        Ok(Self { rules })
    }

    /// Built-in table:
    ///
    /// | match (any key segment) | category | severity |
    /// |---|---|---|
    /// | contains `securityGroup` | SECURITY_GROUP_CHANGE | 5 |
    /// | contains `dbVersion` | DATABASE_VERSION_CHANGE | 4 |
    /// | contains `tag` (so also `tags`) | TAG_CHANGE | 0.5 |
    /// | any | GENERIC_CHANGE | 1 |
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                ClassificationRule::new(
                    Matcher::Contains("securityGroup".to_string()),
                    SECURITY_GROUP_CHANGE,
                    5.0,
                ),
                ClassificationRule::new(
                    Matcher::Contains("dbVersion".to_string()),
                    DATABASE_VERSION_CHANGE,
                    4.0,
                ),
                ClassificationRule::new(Matcher::Contains("tag".to_string()), TAG_CHANGE, 0.5),
                ClassificationRule::fallback(GENERIC_CHANGE, 1.0),
            ],
        }
    }

    /// Insert `rule` after any earlier caller rules but ahead of the
    /// fallback. Built-in rules above it keep their precedence.
    pub fn with_rule(mut self, rule: ClassificationRule) -> DriftResult<Self> {
        rule.check(self.rules.len() - 1)?;
        let at = self.rules.len() - 1;
        self.rules.insert(at, rule);
        Ok(self)
    }

    /// Insert `rule` at the top so it is evaluated before every other rule.
    pub fn with_priority_rule(mut self, rule: ClassificationRule) -> DriftResult<Self> {
        rule.check(0)?;
        self.rules.insert(0, rule);
        Ok(self)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First matching rule wins.
    pub fn classify(&self, path: &Path, kind: DivergenceKind) -> DriftResult<Classification> {
        self.rules
            .iter()
            .find(|r| r.applies(path, kind))
            .map(|r| Classification {
                category: r.category.clone(),
                severity: r.severity,
            })
            // Unreachable for a validated set; surfaced instead of dropped.
            .ok_or_else(|| DriftError::InvalidRuleSet {
                reason: format!("no rule matched {kind} at {path}"),
            })
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}
