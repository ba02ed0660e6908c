//! Routes captured values to their owning applications.
//!
//! Routing happens in two stages that straddle the transaction boundary:
//! [`ValueRouter::translate`] is pure with respect to the stores and runs
//! before any transaction is opened; [`ValueRouter::resolve`] reads each
//! application's disabled-path set and must run inside the transaction
//! that the rest of the recording shares.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::{Application, ValueMap};
use crate::disabled::{fetch_disabled_paths, DisabledPaths};
use crate::error::AuditResult;
use crate::path::{build_path, check_path_format, root_key};
use crate::registry::ModelRegistry;
use crate::store::PropertyStore;

/// Values routed to one application, with the disabled-path snapshot
/// they were filtered against.
#[derive(Debug, Clone)]
pub struct RoutedGroup {
    /// The owning application.
    pub application: Arc<Application>,
    /// Snapshot of the application's disabled paths at resolution time.
    pub disabled: DisabledPaths,
    /// Surviving values keyed by full path.
    pub values: ValueMap,
}

/// Maps raw captured values to full audit paths and owning applications.
pub struct ValueRouter {
    registry: Arc<dyn ModelRegistry>,
    properties: Arc<dyn PropertyStore>,
}

impl ValueRouter {
    /// Creates a router over the given collaborators.
    pub fn new(registry: Arc<dyn ModelRegistry>, properties: Arc<dyn PropertyStore>) -> Self {
        Self {
            registry,
            properties,
        }
    }

    /// Builds full paths from `root_path` and runs the path-translation
    /// stage.
    ///
    /// Fast-path exits with an empty map when there is nothing to do:
    /// no values, auditing globally disabled, or no mapping rules
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed `root_path`.
    pub fn translate(&self, root_path: &str, values: &ValueMap) -> AuditResult<ValueMap> {
        check_path_format(root_path)?;

        let mapper = self.registry.path_mapper();
        if values.is_empty() || !self.registry.is_audit_enabled() || mapper.is_empty() {
            return Ok(ValueMap::new());
        }

        let pathed: ValueMap = values
            .iter()
            .map(|(element, value)| (build_path(root_path, element), value.clone()))
            .collect();
        Ok(mapper.convert_map(&pathed))
    }

    /// Groups translated values by owning application and filters them
    /// against each application's disabled paths.
    ///
    /// Values whose root key has no registered application are dropped
    /// with a debug log. A group whose application root path is itself
    /// disabled is dropped wholesale before per-value checks.
    ///
    /// # Errors
    ///
    /// Fails when a disabled-path blob cannot be read; see
    /// [`crate::AuditError::DisabledPathsCorrupt`].
    pub fn resolve(&self, mapped: &ValueMap) -> AuditResult<Vec<RoutedGroup>> {
        let mut by_root_key: BTreeMap<&str, ValueMap> = BTreeMap::new();
        for (path, value) in mapped {
            match root_key(path) {
                Some(key) => {
                    by_root_key
                        .entry(key)
                        .or_default()
                        .insert(path.clone(), value.clone());
                }
                None => {
                    tracing::debug!(path = %path, "translated path has no root key; dropped");
                }
            }
        }

        let mut groups = Vec::with_capacity(by_root_key.len());
        for (key, values) in by_root_key {
            let Some(application) = self.registry.application_by_key(key) else {
                tracing::debug!(root_key = key, "no application registered for root key");
                continue;
            };
            let disabled =
                fetch_disabled_paths(self.properties.as_ref(), self.registry.as_ref(), &application)?;

            // Root-level short-circuit before any per-value checks.
            if disabled.contains(&application.root_path()) {
                tracing::debug!(
                    application = application.name(),
                    "application root path is disabled; group dropped"
                );
                continue;
            }

            let values: ValueMap = values
                .into_iter()
                .filter(|(path, _)| {
                    let enabled = disabled.is_enabled(path);
                    if !enabled {
                        tracing::debug!(path = %path, "value covered by disabled path; dropped");
                    }
                    enabled
                })
                .collect();

            groups.push(RoutedGroup {
                application,
                disabled,
                values,
            });
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::PathMapper;
    use crate::memory::{MemoryPropertyStore, StaticRegistry};
    use crate::path::PathRule;
    use serde_json::json;

    fn identity_mapper(roots: &[&str]) -> PathMapper {
        let mut mapper = PathMapper::new();
        for root in roots {
            mapper.add_map(*root, *root);
        }
        mapper
    }

    fn fixture(disabled: &[&str]) -> (ValueRouter, Arc<MemoryPropertyStore>) {
        let app = Application::new(1, "access", "access", 10).unwrap();
        let properties = Arc::new(MemoryPropertyStore::new());
        let set: DisabledPaths = disabled
            .iter()
            .map(|p| PathRule::new(*p).unwrap())
            .collect();
        properties.seed(10, serde_json::to_value(&set).unwrap());

        let registry = Arc::new(
            StaticRegistry::new()
                .with_application(app)
                .with_mapper(identity_mapper(&["/access"])),
        );
        (
            ValueRouter::new(registry, Arc::clone(&properties) as Arc<dyn PropertyStore>),
            properties,
        )
    }

    fn raw(values: &[(&str, &str)]) -> ValueMap {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn translate_rejects_malformed_root_path() {
        let (router, _) = fixture(&[]);
        assert!(router.translate("access", &raw(&[("user", "bob")])).is_err());
        assert!(router.translate("", &ValueMap::new()).is_err());
    }

    #[test]
    fn translate_builds_full_paths() {
        let (router, _) = fixture(&[]);
        let mapped = router
            .translate("/access", &raw(&[("user", "bob"), ("action", "read")]))
            .unwrap();
        assert_eq!(mapped.len(), 2);
        assert!(mapped.contains_key("/access/user"));
        assert!(mapped.contains_key("/access/action"));
    }

    #[test]
    fn translate_fast_paths_to_empty() {
        let (router, _) = fixture(&[]);
        assert!(router.translate("/access", &ValueMap::new()).unwrap().is_empty());

        // Globally disabled.
        let app = Application::new(1, "access", "access", 10).unwrap();
        let registry = Arc::new(
            StaticRegistry::new()
                .with_application(app)
                .with_mapper(identity_mapper(&["/access"])),
        );
        registry.set_enabled(false);
        let properties = Arc::new(MemoryPropertyStore::new());
        let router = ValueRouter::new(registry, properties);
        assert!(router
            .translate("/access", &raw(&[("user", "bob")]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn translate_with_no_mapping_rules_is_empty() {
        let app = Application::new(1, "access", "access", 10).unwrap();
        let registry = Arc::new(StaticRegistry::new().with_application(app));
        let router = ValueRouter::new(registry, Arc::new(MemoryPropertyStore::new()));
        assert!(router
            .translate("/access", &raw(&[("user", "bob")]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn resolve_drops_unregistered_root_keys() {
        let (router, _) = fixture(&[]);
        let mapped = raw(&[("/unknown/user", "bob"), ("/access/user", "bob")]);
        let groups = router.resolve(&mapped).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].application.name(), "access");
    }

    #[test]
    fn resolve_short_circuits_disabled_root() {
        let (router, _) = fixture(&["/access"]);
        let groups = router.resolve(&raw(&[("/access/user", "bob")])).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn resolve_filters_covered_values() {
        let (router, _) = fixture(&["/access/user"]);
        let mapped = raw(&[("/access/user", "bob"), ("/access/action", "read")]);
        let groups = router.resolve(&mapped).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].values.len(), 1);
        assert!(groups[0].values.contains_key("/access/action"));
    }

    #[test]
    fn resolve_fails_on_corrupt_blob_and_reloads() {
        let app = Application::new(1, "access", "access", 10).unwrap();
        let properties = Arc::new(MemoryPropertyStore::new());
        properties.seed(10, json!({"not": "a set"}));
        let registry = Arc::new(
            StaticRegistry::new()
                .with_application(app)
                .with_mapper(identity_mapper(&["/access"])),
        );
        let router = ValueRouter::new(
            Arc::clone(&registry) as Arc<dyn ModelRegistry>,
            properties,
        );

        let err = router.resolve(&raw(&[("/access/user", "bob")])).unwrap_err();
        assert!(matches!(
            err,
            crate::AuditError::DisabledPathsCorrupt { .. }
        ));
        assert_eq!(registry.reload_count(), 1);
    }
}
