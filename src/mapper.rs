//! Path translation applied to captured values before routing.

use std::collections::{BTreeMap, BTreeSet};

use crate::application::ValueMap;

/// Translates captured source paths into the audit paths recorded
/// against applications.
///
/// A mapper holds an ordered mapping from source path prefixes to target
/// path prefixes. Converting a value map rewrites each entry's path by
/// the longest applicable rule semantics below; a source path with no
/// applicable rule is dropped, and a source prefix mapped to several
/// targets duplicates the entry under each.
///
/// Lookup order for a value path:
///
/// 1. An exact-match rule wins and is used alone.
/// 2. Otherwise every rule whose source is a prefix of the path applies,
///    each producing `target + remainder`.
///
/// # Examples
///
/// ```
/// use audit_core::PathMapper;
/// use std::collections::BTreeMap;
///
/// let mut mapper = PathMapper::new();
/// mapper.add_map("/raw/login", "/access/login");
///
/// let mut values = BTreeMap::new();
/// values.insert("/raw/login/user".to_string(), "bob".into());
/// values.insert("/raw/logout/user".to_string(), "bob".into());
///
/// let mapped = mapper.convert_map(&values);
/// assert_eq!(mapped.len(), 1);
/// assert!(mapped.contains_key("/access/login/user"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathMapper {
    maps: BTreeMap<String, BTreeSet<String>>,
}

impl PathMapper {
    /// Creates an empty mapper. An empty mapper drops everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mapping from a source path prefix to a target path prefix.
    ///
    /// A source may be mapped to several targets; converted entries are
    /// then duplicated under each target.
    pub fn add_map(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.maps
            .entry(source.into())
            .or_default()
            .insert(target.into());
    }

    /// Whether no mapping rules are configured.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// All target paths the given source path translates to.
    pub fn mapped_paths(&self, path: &str) -> BTreeSet<String> {
        if let Some(targets) = self.maps.get(path) {
            return targets.clone();
        }
        let mut mapped = BTreeSet::new();
        for (source, targets) in &self.maps {
            if let Some(remainder) = path.strip_prefix(source.as_str()) {
                for target in targets {
                    mapped.insert(format!("{target}{remainder}"));
                }
            }
        }
        mapped
    }

    /// Translates a whole value map, dropping unmapped entries.
    pub fn convert_map(&self, values: &ValueMap) -> ValueMap {
        let mut converted = ValueMap::new();
        for (path, value) in values {
            let mapped = self.mapped_paths(path);
            if mapped.is_empty() {
                tracing::debug!(path = %path, "no path mapping; value dropped");
                continue;
            }
            for target in mapped {
                converted.insert(target, value.clone());
            }
        }
        converted
    }
}
