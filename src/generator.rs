//! Derived-value generators.

use serde_json::{json, Value};

use crate::error::BoxError;

/// Produces a derived audit value with no input.
///
/// Generators are registered against a full path and run during the
/// generation stage of an audit call. They must be free of
/// non-idempotent side effects: a recording call may be retried as a
/// whole by the ambient transaction.
pub trait DataGenerator: Send + Sync {
    /// Name used in logs and error context.
    fn name(&self) -> &str;

    /// Produces the derived value.
    ///
    /// # Errors
    ///
    /// Any error aborts the enclosing audit call, wrapped with the
    /// registration path and this generator's name.
    fn generate(&self) -> Result<Value, BoxError>;
}

/// Generates the current wall-clock time as an RFC 3339 string.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeGenerator;

impl DataGenerator for SystemTimeGenerator {
    fn name(&self) -> &str {
        "system-time"
    }

    fn generate(&self) -> Result<Value, BoxError> {
        Ok(json!(chrono::Utc::now().to_rfc3339()))
    }
}
