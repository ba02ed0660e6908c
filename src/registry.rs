//! Audit model registry collaborator contract.

use std::sync::Arc;

use crate::application::Application;
use crate::mapper::PathMapper;

/// Read-mostly access to the loaded audit models.
///
/// The registry owns application definitions parsed from configuration:
/// their root keys, generators, extractors, and path-mapping rules. The
/// core treats it as stable during a single recording operation and only
/// calls [`reload`](ModelRegistry::reload) when it detects a corrupted
/// disabled-path blob.
pub trait ModelRegistry: Send + Sync {
    /// Looks up an application by its registered name.
    fn application_by_name(&self, name: &str) -> Option<Arc<Application>>;

    /// Looks up an application by its root key.
    fn application_by_key(&self, root_key: &str) -> Option<Arc<Application>>;

    /// Whether auditing is globally enabled.
    fn is_audit_enabled(&self) -> bool;

    /// The configured path-translation rules.
    fn path_mapper(&self) -> Arc<PathMapper>;

    /// Asks the registry to reload its models from configuration.
    fn reload(&self);
}
