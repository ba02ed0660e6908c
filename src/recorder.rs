//! The audit recording facade.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::{Application, ValueMap};
use crate::disabled::{fetch_disabled_paths, persist_disabled_paths, DisabledPaths};
use crate::error::{AuditError, AuditResult};
use crate::identity::IdentityService;
use crate::path::PathRule;
use crate::pipeline::AuditPipeline;
use crate::registry::ModelRegistry;
use crate::router::ValueRouter;
use crate::store::{AuditEntry, EntryQuery, EntryStore, PropertyStore};
use crate::txn::{TransactionContext, TransactionGate};

/// Records audit values and administers per-application disabled paths.
///
/// This is the single entry point production code talks to. It owns the
/// collaborators and wires the router, pipeline, and transaction gate
/// together:
///
/// ```text
/// record_audit_values(root_path, values)
///   -> translate (validate, build paths, path-map)     | outside txn
///   -> TransactionGate                                 | txn boundary
///   -> resolve (group, disabled-path filter)           | inside txn
///   -> AuditPipeline per application group             | inside txn
/// ```
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use audit_core::memory::{
///     DirectTransaction, MemoryEntryStore, MemoryPropertyStore, StaticIdentity, StaticRegistry,
/// };
/// use audit_core::{
///     Application, AuditRecorder, DisabledPaths, PathMapper, SimpleValueExtractor, ValueMap,
/// };
///
/// let app = Application::new(1, "access", "access", 10)?
///     .with_extractor("/access/user", "/access/user", Arc::new(SimpleValueExtractor));
/// let mut mapper = PathMapper::new();
/// mapper.add_map("/access", "/access");
///
/// let registry = Arc::new(StaticRegistry::new().with_application(app).with_mapper(mapper));
/// let properties = Arc::new(MemoryPropertyStore::new());
/// properties.seed(10, serde_json::to_value(DisabledPaths::new()).unwrap());
/// let entries = Arc::new(MemoryEntryStore::new());
/// let identity = Arc::new(StaticIdentity::new(Some("alice")));
///
/// let recorder = AuditRecorder::new(registry, properties, entries.clone(), identity);
///
/// let mut values = ValueMap::new();
/// values.insert("user".to_string(), "bob".into());
/// let audited = recorder.record_audit_values(&DirectTransaction::writable(), "/access", &values)?;
///
/// assert_eq!(audited.len(), 1);
/// assert_eq!(entries.len(), 1);
/// # Ok::<(), audit_core::AuditError>(())
/// ```
pub struct AuditRecorder {
    registry: Arc<dyn ModelRegistry>,
    properties: Arc<dyn PropertyStore>,
    entries: Arc<dyn EntryStore>,
    router: ValueRouter,
    pipeline: AuditPipeline,
}

impl AuditRecorder {
    /// Creates a recorder over the given collaborators.
    pub fn new(
        registry: Arc<dyn ModelRegistry>,
        properties: Arc<dyn PropertyStore>,
        entries: Arc<dyn EntryStore>,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        let router = ValueRouter::new(Arc::clone(&registry), Arc::clone(&properties));
        let pipeline = AuditPipeline::new(Arc::clone(&entries), identity);
        Self {
            registry,
            properties,
            entries,
            router,
            pipeline,
        }
    }

    /// Whether auditing is globally enabled.
    pub fn is_audit_enabled(&self) -> bool {
        self.registry.is_audit_enabled()
    }

    /// Whether auditing is enabled for `path` within the named
    /// application.
    ///
    /// An unregistered application name answers `false` (debug-logged).
    ///
    /// # Errors
    ///
    /// Validation errors for empty arguments or a path outside the
    /// application; corruption errors from the disabled-path blob.
    pub fn is_audit_path_enabled(
        &self,
        application_name: &str,
        path: &str,
    ) -> AuditResult<bool> {
        mandatory(application_name, "application_name")?;
        mandatory(path, "path")?;

        let Some(application) = self.application(application_name) else {
            return Ok(false);
        };
        application.check_path(path)?;

        let disabled = self.disabled_paths(&application)?;
        let enabled = match disabled.covering_rule(path) {
            Some(rule) => {
                tracing::debug!(
                    application = application_name,
                    path,
                    disabling_rule = rule.as_str(),
                    "audit path disabled"
                );
                false
            }
            None => true,
        };
        Ok(enabled)
    }

    /// Re-enables auditing for `path` and everything under it, dropping
    /// any more specific disabled rules.
    ///
    /// Persists only when the set actually changed. An unregistered
    /// application name is a debug-logged no-op.
    ///
    /// # Errors
    ///
    /// [`AuditError::NotWritable`] without a writable transaction, plus
    /// validation and corruption errors.
    pub fn enable_audit(
        &self,
        txn: &dyn TransactionContext,
        application_name: &str,
        path: &str,
    ) -> AuditResult<()> {
        mandatory(application_name, "application_name")?;
        mandatory(path, "path")?;
        TransactionGate::require_writable(txn)?;

        let Some(application) = self.application(application_name) else {
            return Ok(());
        };
        application.check_path(path)?;

        let disabled = self.disabled_paths(&application)?;
        if let Some(next) = disabled.enable(path) {
            persist_disabled_paths(self.properties.as_ref(), &application, &next)?;
        }
        Ok(())
    }

    /// Disables auditing for `path` and everything under it.
    ///
    /// Narrower existing rules are collapsed into the new one; if a
    /// broader rule already covers `path` the set is left untouched.
    /// Persists only when the set actually changed. An unregistered
    /// application name is a debug-logged no-op.
    ///
    /// # Errors
    ///
    /// [`AuditError::NotWritable`] without a writable transaction, plus
    /// validation and corruption errors.
    pub fn disable_audit(
        &self,
        txn: &dyn TransactionContext,
        application_name: &str,
        path: &str,
    ) -> AuditResult<()> {
        mandatory(application_name, "application_name")?;
        mandatory(path, "path")?;
        TransactionGate::require_writable(txn)?;

        let Some(application) = self.application(application_name) else {
            return Ok(());
        };
        application.check_path(path)?;

        let disabled = self.disabled_paths(&application)?;
        if let Some(next) = disabled.disable(PathRule::new(path)?) {
            persist_disabled_paths(self.properties.as_ref(), &application, &next)?;
        } else {
            tracing::debug!(
                application = application_name,
                path,
                "disable was a no-op (duplicate or governed by a broader rule)"
            );
        }
        Ok(())
    }

    /// Replaces the application's disabled-path set with the empty set.
    ///
    /// Persists unconditionally. An unregistered application name is a
    /// debug-logged no-op.
    ///
    /// # Errors
    ///
    /// [`AuditError::NotWritable`] without a writable transaction, plus
    /// validation and store errors.
    pub fn reset_disabled_paths(
        &self,
        txn: &dyn TransactionContext,
        application_name: &str,
    ) -> AuditResult<()> {
        mandatory(application_name, "application_name")?;
        TransactionGate::require_writable(txn)?;

        let Some(application) = self.application(application_name) else {
            return Ok(());
        };
        persist_disabled_paths(self.properties.as_ref(), &application, &DisabledPaths::new())
    }

    /// Records audit values captured under `root_path`.
    ///
    /// Raw keys are joined onto `root_path`, translated by the path
    /// mapper, grouped by owning application, filtered against each
    /// application's disabled paths, and run through the audit pipeline.
    /// Returns the union of all values actually persisted.
    ///
    /// Runs in the caller's transaction when `txn` is writable;
    /// otherwise the routed work executes inside a new retrying writable
    /// transaction.
    ///
    /// # Errors
    ///
    /// Validation errors for a malformed `root_path`; corruption,
    /// generation, extraction, and store errors from within the
    /// transaction. Either the full merged map for each application is
    /// persisted or, on error, nothing is.
    pub fn record_audit_values(
        &self,
        txn: &dyn TransactionContext,
        root_path: &str,
        values: &ValueMap,
    ) -> AuditResult<ValueMap> {
        mandatory(root_path, "root_path")?;

        let mapped = self.router.translate(root_path, values)?;
        if mapped.is_empty() {
            return Ok(mapped);
        }

        TransactionGate::execute(txn, &mut || self.record_mapped(&mapped))
    }

    /// Routed recording; must run inside a writable transaction.
    fn record_mapped(&self, mapped: &ValueMap) -> AuditResult<ValueMap> {
        let mut all_audited = ValueMap::new();
        for group in self.router.resolve(mapped)? {
            let audited =
                self.pipeline
                    .audit(&group.application, &group.disabled, &group.values)?;
            all_audited.extend(audited);
        }
        Ok(all_audited)
    }

    /// Deletes the named application's entries within `[from, to)`.
    ///
    /// Returns the number of entries removed; an unregistered
    /// application name is a debug-logged no-op returning zero.
    ///
    /// # Errors
    ///
    /// [`AuditError::NotWritable`] without a writable transaction, plus
    /// validation and store errors.
    pub fn delete_audit_entries(
        &self,
        txn: &dyn TransactionContext,
        application_name: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AuditResult<u64> {
        mandatory(application_name, "application_name")?;
        TransactionGate::require_writable(txn)?;

        let Some(application) = self.application(application_name) else {
            return Ok(0);
        };
        let deleted = self
            .entries
            .delete_entries(application.id(), from, to)
            .map_err(|source| AuditError::Store { source })?;
        tracing::debug!(
            application = application_name,
            from = ?from,
            to = ?to,
            deleted,
            "audit entries deleted"
        );
        Ok(deleted)
    }

    /// Streams matching audit entries to `callback`, at most
    /// `max_results`; the callback returns `false` to stop early.
    ///
    /// Pure pass-through to the entry store apart from the zero-result
    /// shortcut.
    ///
    /// # Errors
    ///
    /// Store errors from the underlying query.
    pub fn audit_query(
        &self,
        callback: &mut dyn FnMut(&AuditEntry) -> bool,
        query: &EntryQuery,
        max_results: usize,
    ) -> AuditResult<()> {
        if query.is_zero_result() {
            return Ok(());
        }
        self.entries
            .find_entries(callback, query, max_results)
            .map_err(|source| AuditError::Store { source })
    }

    fn application(&self, name: &str) -> Option<Arc<Application>> {
        let found = self.registry.application_by_name(name);
        if found.is_none() {
            tracing::debug!(application = name, "no audit application registered");
        }
        found
    }

    fn disabled_paths(&self, application: &Application) -> AuditResult<DisabledPaths> {
        fetch_disabled_paths(self.properties.as_ref(), self.registry.as_ref(), application)
    }
}

fn mandatory(value: &str, name: &'static str) -> AuditResult<()> {
    if value.is_empty() {
        Err(AuditError::MissingArgument(name))
    } else {
        Ok(())
    }
}
