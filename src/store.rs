//! Persistence collaborator contracts: property blobs and audit entries.
//!
//! The core never talks to a database directly. It records entries and
//! the disabled-path blob through these traits; production wires them to
//! the repository's persistence layer, tests use the [`crate::memory`]
//! implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{ApplicationId, PropertyId, ValueMap};
use crate::error::BoxError;

/// Identity of a persisted audit entry.
pub type EntryId = i64;

/// Stores arbitrary serializable property values by identity.
///
/// Used solely for the per-application disabled-path blob. The core
/// performs read-modify-write cycles against this store with no
/// optimistic concurrency control of its own; callers must hold a
/// writable transaction for mutations (see [`crate::TransactionContext`]).
pub trait PropertyStore: Send + Sync {
    /// Reads the property with the given identity.
    ///
    /// # Errors
    ///
    /// Fails if the property is missing or unreadable.
    fn get(&self, id: PropertyId) -> Result<Value, BoxError>;

    /// Replaces the property with the given identity.
    ///
    /// # Errors
    ///
    /// Fails if the property cannot be written.
    fn update(&self, id: PropertyId, value: Value) -> Result<(), BoxError>;
}

/// One persisted audit record.
///
/// Created once per successful audit call that yields a non-empty merged
/// value map; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Persisted identity of this entry.
    pub id: EntryId,
    /// The application the entry was recorded against.
    pub application_id: ApplicationId,
    /// Wall-clock time the entry was created.
    pub time: DateTime<Utc>,
    /// The acting principal, if one was authenticated.
    pub principal: Option<String>,
    /// Merged generated and extracted values, keyed by full path.
    pub values: ValueMap,
}

/// Query parameters passed through to [`EntryStore::find_entries`].
///
/// Filtering semantics belong to the store; the core only applies the
/// zero-result shortcut.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryQuery {
    /// Restrict to one application.
    pub application_id: Option<ApplicationId>,
    /// Restrict to entries recorded by this principal.
    pub principal: Option<String>,
    /// Inclusive lower bound on entry time.
    pub from_time: Option<DateTime<Utc>>,
    /// Exclusive upper bound on entry time.
    pub to_time: Option<DateTime<Utc>>,
}

impl EntryQuery {
    /// Whether the query can be answered without touching the store.
    pub fn is_zero_result(&self) -> bool {
        matches!((self.from_time, self.to_time), (Some(from), Some(to)) if from >= to)
    }
}

/// Stores and retrieves audit entries.
pub trait EntryStore: Send + Sync {
    /// Persists one entry atomically and returns its identity.
    ///
    /// # Errors
    ///
    /// Fails if the entry cannot be written; the caller's transaction is
    /// expected to roll back.
    fn create_entry(
        &self,
        application_id: ApplicationId,
        time: DateTime<Utc>,
        principal: Option<&str>,
        values: &ValueMap,
    ) -> Result<EntryId, BoxError>;

    /// Deletes entries for an application within `[from, to)`; an absent
    /// bound is open-ended. Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Fails if the deletion cannot be performed.
    fn delete_entries(
        &self,
        application_id: ApplicationId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<u64, BoxError>;

    /// Streams matching entries to `callback`, at most `max_results`.
    ///
    /// The callback returns `true` to continue and `false` to stop early.
    ///
    /// # Errors
    ///
    /// Fails if the underlying query fails.
    fn find_entries(
        &self,
        callback: &mut dyn FnMut(&AuditEntry) -> bool,
        query: &EntryQuery,
        max_results: usize,
    ) -> Result<(), BoxError>;
}
