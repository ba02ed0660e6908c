//! Transaction handling for value recording.
//!
//! The recording call must compose correctly whether or not the caller
//! already holds a writable transaction. Rather than querying ambient
//! thread-local state, the caller passes an explicit
//! [`TransactionContext`] handle, which keeps the dependency visible and
//! testable.

use crate::application::ValueMap;
use crate::error::{AuditError, AuditResult};

/// Handle onto the caller's transaction state.
///
/// Implementations wrap the repository's transaction service.
/// [`run_in_new_transaction`](TransactionContext::run_in_new_transaction)
/// opens a *retryable, writable* transaction; retries re-invoke the
/// whole closure, which is why generators and extractors must be free of
/// non-idempotent side effects.
pub trait TransactionContext: Send + Sync {
    /// Whether the ambient transaction, if any, is writable.
    fn is_writable(&self) -> bool;

    /// Runs `work` inside a new retrying writable transaction and
    /// returns its committed result.
    fn run_in_new_transaction(
        &self,
        work: &mut dyn FnMut() -> AuditResult<ValueMap>,
    ) -> AuditResult<ValueMap>;
}

/// Decides where audit work executes relative to the caller's
/// transaction.
pub struct TransactionGate;

impl TransactionGate {
    /// Runs `work` in the caller's transaction when it is writable,
    /// otherwise inside a new retrying writable transaction.
    ///
    /// In the writable case failures propagate to the caller's
    /// transaction for its own rollback handling.
    pub fn execute(
        txn: &dyn TransactionContext,
        work: &mut dyn FnMut() -> AuditResult<ValueMap>,
    ) -> AuditResult<ValueMap> {
        if txn.is_writable() {
            work()
        } else {
            txn.run_in_new_transaction(work)
        }
    }

    /// Fails with [`AuditError::NotWritable`] unless the caller already
    /// holds a writable transaction.
    ///
    /// Disabled-path mutations are read-modify-write against the
    /// property store and are only safe inside a serializing write
    /// transaction, so they refuse to run outside one.
    pub fn require_writable(txn: &dyn TransactionContext) -> AuditResult<()> {
        if txn.is_writable() {
            Ok(())
        } else {
            Err(AuditError::NotWritable)
        }
    }
}
