//! Error types for the audit recording core.

use thiserror::Error;

/// Convenience alias for fallible audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Boxed error carried as the source of collaborator and component faults.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the audit recording core.
///
/// The taxonomy is deliberate:
///
/// - Validation errors ([`MissingArgument`], [`InvalidPath`], [`NotWritable`])
///   fail fast with no side effects.
/// - [`DisabledPathsCorrupt`] is a configuration error: the model registry
///   has already been told to reload before it is returned, and it is never
///   retried at this layer.
/// - [`Generation`] and [`Extraction`] are fatal for the enclosing audit
///   call; no partial entry is persisted.
///
/// Unsupported extractors and unregistered applications are *not* errors;
/// they are silent (debug-logged) skips.
///
/// [`MissingArgument`]: AuditError::MissingArgument
/// [`InvalidPath`]: AuditError::InvalidPath
/// [`NotWritable`]: AuditError::NotWritable
/// [`DisabledPathsCorrupt`]: AuditError::DisabledPathsCorrupt
/// [`Generation`]: AuditError::Generation
/// [`Extraction`]: AuditError::Extraction
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuditError {
    /// A required argument was absent or empty.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// A path did not conform to the audit path grammar, or fell outside
    /// the application it was checked against.
    #[error("invalid audit path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// A mutating operation was attempted without a writable transaction.
    #[error("a writable transaction is required for this operation")]
    NotWritable,

    /// The persisted disabled-path blob for an application could not be
    /// read or deserialized. The registry has been instructed to reload.
    #[error("unable to read disabled paths for audit application '{application}'")]
    DisabledPathsCorrupt {
        /// Name of the application whose blob is unreadable.
        application: String,
        /// The underlying read or deserialization fault.
        #[source]
        source: BoxError,
    },

    /// A data generator failed while producing a derived value.
    #[error("failed to generate audit data at '{path}' using generator '{generator}'")]
    Generation {
        /// Full path the generator is registered at.
        path: String,
        /// Name of the failing generator.
        generator: String,
        /// The generator's own fault.
        #[source]
        source: BoxError,
    },

    /// A data extractor failed while deriving a value from a raw input.
    #[error("failed to extract audit data at '{path}' from value {value} using extractor '{extractor}'")]
    Extraction {
        /// Full path of the raw value being extracted from.
        path: String,
        /// The raw value handed to the extractor.
        value: serde_json::Value,
        /// Name of the failing extractor.
        extractor: String,
        /// The extractor's own fault.
        #[source]
        source: BoxError,
    },

    /// A property or entry store operation failed.
    #[error("audit store operation failed")]
    Store {
        /// The underlying store fault.
        #[source]
        source: BoxError,
    },
}
