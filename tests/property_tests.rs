//! Property tests for the disabled-path rule set.
//!
//! These validate the prefix-covering and superseding invariants over
//! arbitrary paths and mutation sequences.

use audit_core::{DisabledPaths, PathRule};
use proptest::prelude::*;

// Strategy: short segments from a tiny alphabet so prefix relationships
// actually occur.
fn arb_path() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::string::string_regex("[abc]{1,2}").unwrap(), 1..4)
        .prop_map(|segments| format!("/{}", segments.join("/")))
}

fn arb_paths(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_path(), 1..max)
}

fn build(paths: &[String]) -> DisabledPaths {
    paths.iter().fold(DisabledPaths::new(), |set, path| {
        let rule = PathRule::new(path.as_str()).expect("strategy yields valid paths");
        set.disable(rule).unwrap_or(set)
    })
}

proptest! {
    /// Property: if Q is disabled and P starts with Q, then P is disabled.
    #[test]
    fn proptest_prefix_covering(paths in arb_paths(6), probe in arb_path()) {
        let set = build(&paths);
        for rule in set.iter() {
            if probe.starts_with(rule.as_str()) {
                prop_assert!(!set.is_enabled(&probe));
            }
        }
    }

    /// Property: after any disable sequence, no rule is a prefix of another.
    #[test]
    fn proptest_set_is_maximal_antichain(paths in arb_paths(8)) {
        let set = build(&paths);
        for a in set.iter() {
            for b in set.iter() {
                if a != b {
                    prop_assert!(!a.as_str().starts_with(b.as_str()));
                }
            }
        }
    }

    /// Property: disabling the same path twice changes nothing the
    /// second time.
    #[test]
    fn proptest_disable_is_idempotent(paths in arb_paths(6), path in arb_path()) {
        let rule = PathRule::new(path.as_str()).unwrap();
        let set = build(&paths);
        if let Some(once) = set.disable(rule.clone()) {
            prop_assert!(once.disable(rule).is_none());
        }
    }

    /// Property: a broader already-disabled prefix makes disabling a
    /// narrower path a no-op.
    #[test]
    fn proptest_broader_rule_governs(broad in arb_path(), suffix in arb_path()) {
        let narrow = format!("{broad}{suffix}");
        let set = DisabledPaths::new()
            .disable(PathRule::new(broad.as_str()).unwrap())
            .expect("first disable changes the empty set");
        prop_assert!(set.disable(PathRule::new(narrow.as_str()).unwrap()).is_none());
        prop_assert!(!set.is_enabled(&narrow));
    }

    /// Property: enable(P) re-enables P and everything below it.
    #[test]
    fn proptest_enable_supersedes(paths in arb_paths(8), path in arb_path()) {
        let set = build(&paths);
        let enabled = set.enable(&path).unwrap_or(set);
        prop_assert!(enabled.iter().all(|rule| !rule.as_str().starts_with(&path)));
        // Descendants of P are only disabled if some *other* surviving
        // rule covers P itself.
        if enabled.is_enabled(&path) {
            let below = format!("{path}/below");
            prop_assert!(enabled.is_enabled(&below));
        }
    }

    /// Property: disable then enable of the same path returns to the
    /// starting set whenever the disable took effect as a plain insert.
    #[test]
    fn proptest_disable_enable_round_trip(path in arb_path()) {
        let disabled = DisabledPaths::new()
            .disable(PathRule::new(path.as_str()).unwrap())
            .expect("disable on empty set always changes it");
        let restored = disabled.enable(&path).expect("enable drops the rule");
        prop_assert!(restored.is_empty());
    }

    /// Property: serde round-trips preserve the set exactly.
    #[test]
    fn proptest_serde_round_trip(paths in arb_paths(8)) {
        let set = build(&paths);
        let json = serde_json::to_value(&set).unwrap();
        let back: DisabledPaths = serde_json::from_value(json).unwrap();
        prop_assert_eq!(back, set);
    }
}
