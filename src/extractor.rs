//! Value extractors.

use serde_json::Value;

use crate::error::BoxError;

/// Derives an audit value from a raw captured value.
///
/// Extractors are registered with a *source* path (the raw value they
/// read) and a *target* path (the key the derived value lands under).
/// The [`supports`](DataExtractor::supports) gate lets an extractor
/// decline values whose shape it cannot handle; a decline is a normal
/// skip, not an error.
pub trait DataExtractor: Send + Sync {
    /// Name used in logs and error context.
    fn name(&self) -> &str;

    /// Whether this extractor can handle the given raw value.
    fn supports(&self, value: &Value) -> bool;

    /// Derives the audit value from the raw value.
    ///
    /// # Errors
    ///
    /// Any error aborts the enclosing audit call, wrapped with the
    /// source path, the raw value, and this extractor's name.
    fn extract(&self, value: &Value) -> Result<Value, BoxError>;
}

/// Records the raw value unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleValueExtractor;

impl DataExtractor for SimpleValueExtractor {
    fn name(&self) -> &str {
        "simple-value"
    }

    fn supports(&self, _value: &Value) -> bool {
        true
    }

    fn extract(&self, value: &Value) -> Result<Value, BoxError> {
        Ok(value.clone())
    }
}
