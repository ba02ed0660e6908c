//! The two-stage audit pipeline: generation, then extraction.

use std::sync::Arc;

use chrono::Utc;

use crate::application::{Application, ValueMap};
use crate::disabled::DisabledPaths;
use crate::error::{AuditError, AuditResult};
use crate::identity::IdentityService;
use crate::store::EntryStore;

/// Turns routed values into one persisted audit entry per application.
///
/// The pipeline runs inside whatever transaction context the caller is
/// already in; it opens none of its own. A generator or extractor fault
/// aborts the whole call for its application — no partial entry is ever
/// persisted — but does not affect other applications' groups in the
/// same outer recording.
pub struct AuditPipeline {
    entries: Arc<dyn EntryStore>,
    identity: Arc<dyn IdentityService>,
}

impl AuditPipeline {
    /// Creates a pipeline over the given collaborators.
    pub fn new(entries: Arc<dyn EntryStore>, identity: Arc<dyn IdentityService>) -> Self {
        Self { entries, identity }
    }

    /// Audits `values` for one application and returns the data that was
    /// actually persisted.
    ///
    /// `values` are re-filtered against `disabled` here so the function
    /// is independently correct for direct callers, even though
    /// [`crate::ValueRouter`] filters before routing. Stages, in order:
    /// generation, extraction under the system identity, merge with
    /// extracted values taking precedence, then a single atomic entry
    /// write when the merged map is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Generation`] or [`AuditError::Extraction`]
    /// on a component fault, and [`AuditError::Store`] when the entry
    /// cannot be persisted.
    pub fn audit(
        &self,
        application: &Application,
        disabled: &DisabledPaths,
        values: &ValueMap,
    ) -> AuditResult<ValueMap> {
        let survivors: ValueMap = values
            .iter()
            .filter(|(path, _)| disabled.is_enabled(path))
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect();
        if survivors.is_empty() {
            tracing::debug!(
                application = application.name(),
                "all values excluded by disabled paths"
            );
            return Ok(ValueMap::new());
        }

        let mut audit_data = generate_data(application)?;

        // Extraction may need system-level context, whoever the caller is.
        let extracted = self
            .identity
            .run_as_system(&mut || extract_data(application, &survivors))?;

        // Extracted values win over generated ones at the same path.
        audit_data.extend(extracted);

        // Time and principal are intrinsic entry metadata, not values.
        let time = Utc::now();
        let principal = self.identity.current_principal();

        if !audit_data.is_empty() {
            let entry_id = self
                .entries
                .create_entry(application.id(), time, principal.as_deref(), &audit_data)
                .map_err(|source| AuditError::Store { source })?;
            tracing::debug!(
                application = application.name(),
                entry_id,
                principal = ?principal,
                values = audit_data.len(),
                "new audit entry"
            );
        }
        Ok(audit_data)
    }
}

/// Runs every generator registered on the application.
fn generate_data(application: &Application) -> AuditResult<ValueMap> {
    let mut data = ValueMap::new();
    for (path, generator) in application.generators() {
        let value = generator
            .generate()
            .map_err(|source| AuditError::Generation {
                path: path.to_string(),
                generator: generator.name().to_string(),
                source,
            })?;
        data.insert(path.to_string(), value);
    }
    Ok(data)
}

/// Runs every applicable, supporting extractor over the raw values.
fn extract_data(application: &Application, values: &ValueMap) -> AuditResult<ValueMap> {
    let mut data = ValueMap::new();
    for (path, value) in values {
        for (target, extractor) in application.extractors_for(path) {
            if !extractor.supports(value) {
                continue;
            }
            let extracted = extractor
                .extract(value)
                .map_err(|source| AuditError::Extraction {
                    path: path.clone(),
                    value: value.clone(),
                    extractor: extractor.name().to_string(),
                    source,
                })?;
            data.insert(target.to_string(), extracted);
        }
    }
    Ok(data)
}
