//! Per-application disabled-path sets.
//!
//! A disabled path is a prefix rule: auditing is suppressed for every
//! path it covers. The set is kept in *maximal antichain* form — no rule
//! is ever a prefix of another — by collapsing superseded rules on every
//! mutation. [`DisabledPaths`] is an immutable value type: mutations
//! return a fresh set (or `None` when nothing changed), which the caller
//! swaps into the property store atomically. That keeps live internal
//! collections from leaking across the persistence boundary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::application::Application;
use crate::error::{AuditError, AuditResult};
use crate::path::PathRule;
use crate::registry::ModelRegistry;
use crate::store::PropertyStore;

/// The set of disabled path rules for one application.
///
/// # Examples
///
/// ```
/// use audit_core::{DisabledPaths, PathRule};
///
/// let set = DisabledPaths::new();
/// let set = set.disable(PathRule::new("/app/login")?).expect("changed");
///
/// assert!(!set.is_enabled("/app/login/user"));
/// assert!(set.is_enabled("/app/logout"));
///
/// // A broader rule collapses the narrower one.
/// let set = set.disable(PathRule::new("/app")?).expect("changed");
/// assert_eq!(set.len(), 1);
/// # Ok::<(), audit_core::AuditError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisabledPaths {
    rules: BTreeSet<PathRule>,
}

impl DisabledPaths {
    /// Creates an empty set: everything is enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether auditing is enabled for `path`: true unless some rule is
    /// a (raw string) prefix of `path`.
    pub fn is_enabled(&self, path: &str) -> bool {
        self.covering_rule(path).is_none()
    }

    /// The rule covering `path`, if any.
    pub fn covering_rule(&self, path: &str) -> Option<&PathRule> {
        self.rules.iter().find(|rule| rule.covers(path))
    }

    /// Whether `path` is itself a rule in the set (exact match).
    pub fn contains(&self, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.as_str() == path)
    }

    /// Iterates the rules in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &PathRule> {
        self.rules.iter()
    }

    /// Number of rules in the set.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Re-enables `path`: drops every rule that `path` is a prefix of.
    ///
    /// Rules more specific than the newly enabled path are redundant and
    /// removed. Returns the new set, or `None` when nothing changed (the
    /// caller then skips persisting).
    #[must_use]
    pub fn enable(&self, path: &str) -> Option<Self> {
        let rules: BTreeSet<PathRule> = self
            .rules
            .iter()
            .filter(|rule| !rule.as_str().starts_with(path))
            .cloned()
            .collect();
        if rules.len() == self.rules.len() {
            None
        } else {
            Some(Self { rules })
        }
    }

    /// Disables the path given by `rule`.
    ///
    /// - Exact duplicate: no-op (`None`).
    /// - Existing rules that the new rule is a prefix of are superseded
    ///   and dropped.
    /// - If an existing broader rule already covers the new one, that
    ///   rule governs and the set is left unchanged (`None`).
    ///
    /// Returns the new set to persist, or `None` for a no-op.
    #[must_use]
    pub fn disable(&self, rule: PathRule) -> Option<Self> {
        if self.rules.contains(&rule) {
            return None;
        }
        let mut rules = BTreeSet::new();
        for existing in &self.rules {
            if existing.as_str().starts_with(rule.as_str()) {
                // Superseded by the broader new rule.
                continue;
            }
            if rule.as_str().starts_with(existing.as_str()) {
                // An existing broader rule already governs.
                return None;
            }
            rules.insert(existing.clone());
        }
        rules.insert(rule);
        Some(Self { rules })
    }
}

impl FromIterator<PathRule> for DisabledPaths {
    fn from_iter<I: IntoIterator<Item = PathRule>>(iter: I) -> Self {
        // Build through disable() so the antichain invariant holds even
        // for overlapping inputs.
        iter.into_iter().fold(Self::new(), |set, rule| {
            set.disable(rule).unwrap_or(set)
        })
    }
}

/// Fetches an application's disabled-path set from the property store.
///
/// A blob that cannot be read or deserialized is treated as a
/// configuration error: the registry is told to reload its models and
/// the call fails with [`AuditError::DisabledPathsCorrupt`].
pub(crate) fn fetch_disabled_paths(
    properties: &dyn PropertyStore,
    registry: &dyn ModelRegistry,
    application: &Application,
) -> AuditResult<DisabledPaths> {
    let loaded = properties
        .get(application.disabled_paths_id())
        .and_then(|value| serde_json::from_value(value).map_err(Into::into));
    match loaded {
        Ok(paths) => Ok(paths),
        Err(source) => {
            registry.reload();
            Err(AuditError::DisabledPathsCorrupt {
                application: application.name().to_string(),
                source,
            })
        }
    }
}

/// Persists an application's disabled-path set as one serialized value.
pub(crate) fn persist_disabled_paths(
    properties: &dyn PropertyStore,
    application: &Application,
    paths: &DisabledPaths,
) -> AuditResult<()> {
    let value = serde_json::to_value(paths).map_err(|e| AuditError::Store { source: e.into() })?;
    properties
        .update(application.disabled_paths_id(), value)
        .map_err(|source| AuditError::Store { source })?;
    tracing::debug!(
        application = application.name(),
        disabled = ?paths.iter().map(PathRule::as_str).collect::<Vec<_>>(),
        "audit disabled paths updated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(path: &str) -> PathRule {
        PathRule::new(path).unwrap()
    }

    fn set(paths: &[&str]) -> DisabledPaths {
        paths.iter().map(|p| rule(p)).collect()
    }

    #[test]
    fn empty_set_enables_everything() {
        let set = DisabledPaths::new();
        assert!(set.is_enabled("/anything/at/all"));
        assert!(set.is_empty());
    }

    #[test]
    fn disabled_prefix_covers_descendants() {
        let set = set(&["/app/login"]);
        assert!(!set.is_enabled("/app/login"));
        assert!(!set.is_enabled("/app/login/user"));
        assert!(set.is_enabled("/app/logout"));
        // Raw prefix semantics: segment boundaries are not respected.
        assert!(!set.is_enabled("/app/login-attempt"));
    }

    #[test]
    fn disable_is_idempotent() {
        let once = DisabledPaths::new().disable(rule("/app/x")).unwrap();
        assert!(once.disable(rule("/app/x")).is_none());
    }

    #[test]
    fn disable_collapses_narrower_rules() {
        let set = set(&["/app/a/b", "/app/a/c", "/app/z"]);
        let next = set.disable(rule("/app/a")).unwrap();
        assert_eq!(next.len(), 2);
        assert!(next.contains("/app/a"));
        assert!(next.contains("/app/z"));
        assert!(!next.contains("/app/a/b"));
    }

    #[test]
    fn disable_under_broader_rule_is_a_no_op() {
        let set = set(&["/app"]);
        assert!(set.disable(rule("/app/narrow")).is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn enable_drops_more_specific_rules() {
        let set = set(&["/app/a/b", "/app/a/c", "/app/z"]);
        let next = set.enable("/app/a").unwrap();
        assert_eq!(next.len(), 1);
        assert!(next.is_enabled("/app/a/b"));
        assert!(!next.is_enabled("/app/z"));
    }

    #[test]
    fn enable_without_matches_is_a_no_op() {
        let set = set(&["/app/a"]);
        assert!(set.enable("/app/other").is_none());
    }

    #[test]
    fn disable_then_enable_round_trips_to_empty() {
        let disabled = DisabledPaths::new().disable(rule("/app/p")).unwrap();
        let enabled = disabled.enable("/app/p").unwrap();
        assert!(enabled.is_empty());
    }

    #[test]
    fn set_stays_an_antichain() {
        let set = set(&["/app/a", "/app/a/b", "/app", "/app/c"]);
        assert_eq!(set.len(), 1);
        assert!(set.contains("/app"));
        for a in set.iter() {
            for b in set.iter() {
                if a != b {
                    assert!(!a.as_str().starts_with(b.as_str()), "{a} prefixed by {b}");
                }
            }
        }
    }

    #[test]
    fn serde_round_trip() {
        let set = set(&["/app/a", "/app/b"]);
        let json = serde_json::to_value(&set).unwrap();
        let back: DisabledPaths = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn corrupt_blob_fails_deserialization() {
        let err = serde_json::from_value::<DisabledPaths>(serde_json::json!(["no-slash"]));
        assert!(err.is_err());
        let err = serde_json::from_value::<DisabledPaths>(serde_json::json!({"k": 1}));
        assert!(err.is_err());
    }
}
