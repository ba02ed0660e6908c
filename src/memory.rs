//! In-memory collaborator implementations.
//!
//! These back the crate's tests and make small demonstrations possible
//! without a repository behind them. Production deployments wire the
//! collaborator traits to the real persistence, transaction, and
//! identity services instead.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::application::{Application, ApplicationId, PropertyId, ValueMap};
use crate::error::{AuditResult, BoxError};
use crate::identity::IdentityService;
use crate::mapper::PathMapper;
use crate::registry::ModelRegistry;
use crate::store::{AuditEntry, EntryId, EntryQuery, EntryStore, PropertyStore};
use crate::txn::TransactionContext;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Property store holding serialized values in a map.
#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    properties: Mutex<BTreeMap<PropertyId, Value>>,
    updates: AtomicUsize,
}

impl MemoryPropertyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a property without counting it as an update.
    pub fn seed(&self, id: PropertyId, value: Value) {
        lock(&self.properties).insert(id, value);
    }

    /// Number of [`PropertyStore::update`] calls performed.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn get(&self, id: PropertyId) -> Result<Value, BoxError> {
        lock(&self.properties)
            .get(&id)
            .cloned()
            .ok_or_else(|| format!("no property with id {id}").into())
    }

    fn update(&self, id: PropertyId, value: Value) -> Result<(), BoxError> {
        lock(&self.properties).insert(id, value);
        self.updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Entry store appending to a vector.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: Mutex<Vec<AuditEntry>>,
    next_id: AtomicI64,
}

impl MemoryEntryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored entries, in creation order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        lock(&self.entries).clone()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

fn matches(entry: &AuditEntry, query: &EntryQuery) -> bool {
    query
        .application_id
        .map_or(true, |id| entry.application_id == id)
        && query
            .principal
            .as_deref()
            .map_or(true, |p| entry.principal.as_deref() == Some(p))
        && query.from_time.map_or(true, |from| entry.time >= from)
        && query.to_time.map_or(true, |to| entry.time < to)
}

impl EntryStore for MemoryEntryStore {
    fn create_entry(
        &self,
        application_id: ApplicationId,
        time: DateTime<Utc>,
        principal: Option<&str>,
        values: &ValueMap,
    ) -> Result<EntryId, BoxError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        lock(&self.entries).push(AuditEntry {
            id,
            application_id,
            time,
            principal: principal.map(str::to_string),
            values: values.clone(),
        });
        Ok(id)
    }

    fn delete_entries(
        &self,
        application_id: ApplicationId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<u64, BoxError> {
        let query = EntryQuery {
            application_id: Some(application_id),
            from_time: from,
            to_time: to,
            ..EntryQuery::default()
        };
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|entry| !matches(entry, &query));
        Ok((before - entries.len()) as u64)
    }

    fn find_entries(
        &self,
        callback: &mut dyn FnMut(&AuditEntry) -> bool,
        query: &EntryQuery,
        max_results: usize,
    ) -> Result<(), BoxError> {
        let entries = self.entries();
        for entry in entries.iter().filter(|e| matches(e, query)).take(max_results) {
            if !callback(entry) {
                break;
            }
        }
        Ok(())
    }
}

/// Registry serving a fixed set of applications.
pub struct StaticRegistry {
    applications: Vec<Arc<Application>>,
    enabled: AtomicBool,
    mapper: Mutex<Arc<PathMapper>>,
    reloads: AtomicUsize,
}

impl StaticRegistry {
    /// Creates an enabled registry with no applications and an empty
    /// mapper.
    pub fn new() -> Self {
        Self {
            applications: Vec::new(),
            enabled: AtomicBool::new(true),
            mapper: Mutex::new(Arc::new(PathMapper::new())),
            reloads: AtomicUsize::new(0),
        }
    }

    /// Adds an application.
    pub fn with_application(mut self, application: Application) -> Self {
        self.applications.push(Arc::new(application));
        self
    }

    /// Replaces the path mapper.
    pub fn with_mapper(self, mapper: PathMapper) -> Self {
        *lock(&self.mapper) = Arc::new(mapper);
        self
    }

    /// Toggles the global audit switch.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Number of [`ModelRegistry::reload`] calls observed.
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::Relaxed)
    }
}

impl ModelRegistry for StaticRegistry {
    fn application_by_name(&self, name: &str) -> Option<Arc<Application>> {
        self.applications
            .iter()
            .find(|app| app.name() == name)
            .cloned()
    }

    fn application_by_key(&self, root_key: &str) -> Option<Arc<Application>> {
        self.applications
            .iter()
            .find(|app| app.root_key() == root_key)
            .cloned()
    }

    fn is_audit_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn path_mapper(&self) -> Arc<PathMapper> {
        Arc::clone(&lock(&self.mapper))
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }
}

/// Identity service with a fixed acting principal.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    principal: Option<String>,
    system_runs: AtomicUsize,
}

impl StaticIdentity {
    /// Creates an identity service answering with the given principal.
    pub fn new(principal: Option<&str>) -> Self {
        Self {
            principal: principal.map(str::to_string),
            system_runs: AtomicUsize::new(0),
        }
    }

    /// Number of [`IdentityService::run_as_system`] executions.
    pub fn system_runs(&self) -> usize {
        self.system_runs.load(Ordering::Relaxed)
    }
}

impl IdentityService for StaticIdentity {
    fn current_principal(&self) -> Option<String> {
        self.principal.clone()
    }

    fn run_as_system(
        &self,
        work: &mut dyn FnMut() -> AuditResult<ValueMap>,
    ) -> AuditResult<ValueMap> {
        self.system_runs.fetch_add(1, Ordering::Relaxed);
        work()
    }
}

/// Transaction context that executes work inline.
///
/// `run_in_new_transaction` performs no real retry; it counts the calls
/// so tests can assert where the transaction boundary fell.
#[derive(Debug)]
pub struct DirectTransaction {
    writable: bool,
    opened: AtomicUsize,
}

impl DirectTransaction {
    /// A context that reports an existing writable transaction.
    pub fn writable() -> Self {
        Self {
            writable: true,
            opened: AtomicUsize::new(0),
        }
    }

    /// A context with no writable transaction; recording work will be
    /// routed through `run_in_new_transaction`.
    pub fn read_only() -> Self {
        Self {
            writable: false,
            opened: AtomicUsize::new(0),
        }
    }

    /// Number of new transactions opened through this context.
    pub fn opened_count(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}

impl TransactionContext for DirectTransaction {
    fn is_writable(&self) -> bool {
        self.writable
    }

    fn run_in_new_transaction(
        &self,
        work: &mut dyn FnMut() -> AuditResult<ValueMap>,
    ) -> AuditResult<ValueMap> {
        self.opened.fetch_add(1, Ordering::Relaxed);
        work()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry_values() -> ValueMap {
        let mut values = ValueMap::new();
        values.insert("/app/user".to_string(), json!("bob"));
        values
    }

    #[test]
    fn property_store_round_trips() {
        let store = MemoryPropertyStore::new();
        assert!(store.get(1).is_err());

        store.update(1, json!(["a"])).unwrap();
        assert_eq!(store.get(1).unwrap(), json!(["a"]));
        assert_eq!(store.update_count(), 1);

        store.seed(2, json!(null));
        assert_eq!(store.update_count(), 1);
    }

    #[test]
    fn entry_store_assigns_increasing_ids() {
        let store = MemoryEntryStore::new();
        let t = Utc.timestamp_opt(1_000, 0).unwrap();
        let first = store.create_entry(1, t, Some("a"), &entry_values()).unwrap();
        let second = store.create_entry(1, t, None, &entry_values()).unwrap();
        assert!(second > first);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_respects_time_range() {
        let store = MemoryEntryStore::new();
        let early = Utc.timestamp_opt(1_000, 0).unwrap();
        let late = Utc.timestamp_opt(2_000, 0).unwrap();
        store.create_entry(1, early, None, &entry_values()).unwrap();
        store.create_entry(1, late, None, &entry_values()).unwrap();
        store.create_entry(2, early, None, &entry_values()).unwrap();

        let deleted = store.delete_entries(1, None, Some(late)).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn find_entries_stops_early() {
        let store = MemoryEntryStore::new();
        let t = Utc.timestamp_opt(1_000, 0).unwrap();
        for _ in 0..5 {
            store.create_entry(1, t, None, &entry_values()).unwrap();
        }

        let mut seen = 0;
        store
            .find_entries(
                &mut |_| {
                    seen += 1;
                    seen < 2
                },
                &EntryQuery::default(),
                10,
            )
            .unwrap();
        assert_eq!(seen, 2);

        let mut capped = 0;
        store
            .find_entries(
                &mut |_| {
                    capped += 1;
                    true
                },
                &EntryQuery::default(),
                3,
            )
            .unwrap();
        assert_eq!(capped, 3);
    }

    #[test]
    fn registry_lookups() {
        let registry = StaticRegistry::new()
            .with_application(Application::new(1, "one", "one", 1).unwrap())
            .with_application(Application::new(2, "two", "two", 2).unwrap());

        assert_eq!(registry.application_by_name("one").unwrap().id(), 1);
        assert_eq!(registry.application_by_key("two").unwrap().id(), 2);
        assert!(registry.application_by_name("three").is_none());

        assert!(registry.is_audit_enabled());
        registry.set_enabled(false);
        assert!(!registry.is_audit_enabled());

        registry.reload();
        assert_eq!(registry.reload_count(), 1);
    }
}
