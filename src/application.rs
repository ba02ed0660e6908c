//! Audit applications and their registered data generators and extractors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{AuditError, AuditResult};
use crate::extractor::DataExtractor;
use crate::generator::DataGenerator;
use crate::path::{check_path_format, root_path};

/// Stable numeric identity of a persisted audit application.
pub type ApplicationId = i64;

/// Identity of a value held in the property store.
pub type PropertyId = i64;

/// A flat mapping from full audit path to value.
///
/// This is the shape values take at every stage of the pipeline: raw
/// captured values, translated values, and the merged data that is
/// finally persisted.
pub type ValueMap = BTreeMap<String, Value>;

/// One extractor registration: where it reads from and where it writes to.
#[derive(Clone)]
struct ExtractorRegistration {
    target: String,
    source: String,
    extractor: Arc<dyn DataExtractor>,
}

/// A named audit namespace.
///
/// An application owns the sub-tree of paths under its root key, the
/// generators and extractors registered for those paths, and the storage
/// identity of its disabled-path set. Applications are immutable once
/// built; the registry hands out shared references for the duration of a
/// recording operation.
///
/// # Examples
///
/// ```
/// use audit_core::Application;
///
/// let app = Application::new(100, "access-audit", "alfresco-access", 7)?;
/// assert_eq!(app.root_path(), "/alfresco-access");
/// app.check_path("/alfresco-access/login")?;
/// assert!(app.check_path("/other/login").is_err());
/// # Ok::<(), audit_core::AuditError>(())
/// ```
#[derive(Clone)]
pub struct Application {
    id: ApplicationId,
    name: String,
    root_key: String,
    disabled_paths_id: PropertyId,
    generators: BTreeMap<String, Arc<dyn DataGenerator>>,
    extractors: Vec<ExtractorRegistration>,
}

impl Application {
    /// Creates an application with no generators or extractors.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidPath`] if `root_key` is not a single
    /// well-formed path segment.
    pub fn new(
        id: ApplicationId,
        name: impl Into<String>,
        root_key: impl Into<String>,
        disabled_paths_id: PropertyId,
    ) -> AuditResult<Self> {
        let root_key = root_key.into();
        check_path_format(&root_path(&root_key))?;
        if root_key.contains(crate::path::PATH_SEPARATOR) {
            return Err(AuditError::InvalidPath {
                path: root_key,
                reason: "root key must be a single path segment",
            });
        }
        Ok(Self {
            id,
            name: name.into(),
            root_key,
            disabled_paths_id,
            generators: BTreeMap::new(),
            extractors: Vec::new(),
        })
    }

    /// Registers a generator at `path`. Replaces any generator already
    /// registered at the same path.
    pub fn with_generator(
        mut self,
        path: impl Into<String>,
        generator: Arc<dyn DataGenerator>,
    ) -> Self {
        self.generators.insert(path.into(), generator);
        self
    }

    /// Registers an extractor that reads the raw value at `source_path`
    /// and writes its result under `target_path`.
    pub fn with_extractor(
        mut self,
        target_path: impl Into<String>,
        source_path: impl Into<String>,
        extractor: Arc<dyn DataExtractor>,
    ) -> Self {
        self.extractors.push(ExtractorRegistration {
            target: target_path.into(),
            source: source_path.into(),
            extractor,
        });
        self
    }

    /// The application's persisted identity.
    pub fn id(&self) -> ApplicationId {
        self.id
    }

    /// The application's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First segment of every path owned by this application.
    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    /// The application's root path, `"/" + root_key`.
    pub fn root_path(&self) -> String {
        root_path(&self.root_key)
    }

    /// Storage identity of the application's disabled-path blob.
    pub fn disabled_paths_id(&self) -> PropertyId {
        self.disabled_paths_id
    }

    /// All registered generators, keyed by their full path.
    pub fn generators(&self) -> impl Iterator<Item = (&str, &dyn DataGenerator)> {
        self.generators
            .iter()
            .map(|(path, generator)| (path.as_str(), generator.as_ref()))
    }

    /// Extractors whose source path matches `source_path`, as
    /// `(target path, extractor)` pairs.
    pub fn extractors_for<'a>(
        &'a self,
        source_path: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a dyn DataExtractor)> {
        self.extractors
            .iter()
            .filter(move |reg| reg.source == source_path)
            .map(|reg| (reg.target.as_str(), reg.extractor.as_ref()))
    }

    /// Checks that `path` is well-formed and rooted in this application.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidPath`] otherwise.
    pub fn check_path(&self, path: &str) -> AuditResult<()> {
        check_path_format(path)?;
        let root = self.root_path();
        if path == root
            || path
                .strip_prefix(root.as_str())
                .is_some_and(|rest| rest.starts_with(crate::path::PATH_SEPARATOR))
        {
            Ok(())
        } else {
            Err(AuditError::InvalidPath {
                path: path.to_string(),
                reason: "path does not fall under this application's root",
            })
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("root_key", &self.root_key)
            .field("disabled_paths_id", &self.disabled_paths_id)
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .field(
                "extractors",
                &self
                    .extractors
                    .iter()
                    .map(|reg| (&reg.source, &reg.target))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (/{})", self.name, self.root_key)
    }
}
