//! Audit path grammar and the [`PathRule`] type.
//!
//! Audit paths are `/`-delimited strings rooted at an application's root
//! key, e.g. `/alfresco-access/login/user`. This module owns the format
//! check shared by every public entry point and the rule type used for
//! disabled-path matching.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};

/// Separator between audit path segments.
pub const PATH_SEPARATOR: char = '/';

/// Validates the audit path grammar.
///
/// A well-formed path starts with `/`, does not end with `/`, and every
/// segment is non-empty and drawn from `[A-Za-z0-9._-]`.
///
/// # Errors
///
/// Returns [`AuditError::InvalidPath`] describing the first violation.
///
/// # Examples
///
/// ```
/// use audit_core::check_path_format;
///
/// assert!(check_path_format("/alfresco-access/login").is_ok());
/// assert!(check_path_format("alfresco-access").is_err());
/// assert!(check_path_format("/alfresco-access/").is_err());
/// ```
pub fn check_path_format(path: &str) -> AuditResult<()> {
    let reason = if path.is_empty() {
        Some("path is empty")
    } else if !path.starts_with(PATH_SEPARATOR) {
        Some("path must start with '/'")
    } else if path.ends_with(PATH_SEPARATOR) {
        Some("path must not end with '/'")
    } else if path[1..].split(PATH_SEPARATOR).any(|segment| {
        segment.is_empty()
            || !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }) {
        Some("path segments must be non-empty and contain only [A-Za-z0-9._-]")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AuditError::InvalidPath {
            path: path.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Returns the root key of a full path: its first segment.
///
/// # Examples
///
/// ```
/// use audit_core::root_key;
///
/// assert_eq!(root_key("/alfresco-access/login/user"), Some("alfresco-access"));
/// assert_eq!(root_key(""), None);
/// ```
pub fn root_key(path: &str) -> Option<&str> {
    path.strip_prefix(PATH_SEPARATOR)
        .map(|rest| rest.split(PATH_SEPARATOR).next().unwrap_or(rest))
        .filter(|key| !key.is_empty())
}

/// Builds the root path for an application root key.
pub fn root_path(root_key: &str) -> String {
    format!("{PATH_SEPARATOR}{root_key}")
}

/// Appends a path element to a base path.
///
/// # Examples
///
/// ```
/// use audit_core::build_path;
///
/// assert_eq!(build_path("/alfresco-access", "user"), "/alfresco-access/user");
/// ```
pub fn build_path(base: &str, element: &str) -> String {
    format!("{base}{PATH_SEPARATOR}{element}")
}

/// A validated disabled-path rule.
///
/// A rule *covers* a path when the path starts with the rule as a raw
/// string prefix. The test is intentionally not segment-aware: `/a/b`
/// covers `/a/bx`. This matches the observable behavior of the stored
/// rule sets and is relied on by existing deployments.
///
/// # Examples
///
/// ```
/// use audit_core::PathRule;
///
/// let rule = PathRule::new("/app/login")?;
/// assert!(rule.covers("/app/login/user"));
/// assert!(rule.covers("/app/login-attempt")); // raw prefix, by contract
/// assert!(!rule.covers("/app/logout"));
/// # Ok::<(), audit_core::AuditError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathRule(String);

impl PathRule {
    /// Creates a rule after validating the path format.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidPath`] if the path is malformed.
    pub fn new(path: impl Into<String>) -> AuditResult<Self> {
        let path = path.into();
        check_path_format(&path)?;
        Ok(Self(path))
    }

    /// The rule as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this rule covers `path` (raw string-prefix test).
    pub fn covers(&self, path: &str) -> bool {
        path.starts_with(self.0.as_str())
    }
}

impl fmt::Display for PathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PathRule {
    type Error = AuditError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<PathRule> for String {
    fn from(rule: PathRule) -> Self {
        rule.0
    }
}

impl AsRef<str> for PathRule {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
