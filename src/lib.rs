//! Structured audit recording for a hierarchical content repository.
//!
//! This crate decides *whether* and *what* to audit. Raw values captured
//! under a root path are translated, routed to their owning audit
//! application, filtered against administratively disabled path
//! prefixes, and run through a two-stage pipeline — derived-value
//! generation, then extraction — before one immutable entry per
//! application is persisted.
//!
//! # Core Types
//!
//! - [`AuditRecorder`]: facade over the whole recording and
//!   administration surface
//! - [`Application`]: a named audit namespace with its generators,
//!   extractors, and disabled-path storage identity
//! - [`DisabledPaths`]: superseding-aware set of disabled path prefixes
//! - [`PathRule`]: validated path with raw-prefix covering semantics
//! - [`ValueRouter`] / [`AuditPipeline`] / [`TransactionGate`]: the
//!   routing, generation/extraction, and transaction stages
//!
//! Persistence, model configuration, transactions, and identity are
//! collaborator traits ([`PropertyStore`], [`EntryStore`],
//! [`ModelRegistry`], [`TransactionContext`], [`IdentityService`]); the
//! [`memory`] module provides in-memory implementations for tests and
//! demonstrations.
//!
//! # Examples
//!
//! ```
//! use audit_core::{DisabledPaths, PathRule};
//!
//! // Disabled paths collapse to a maximal antichain.
//! let set = DisabledPaths::new()
//!     .disable(PathRule::new("/access/login/user")?)
//!     .expect("changed");
//! let set = set.disable(PathRule::new("/access/login")?).expect("changed");
//!
//! assert_eq!(set.len(), 1);
//! assert!(!set.is_enabled("/access/login/user"));
//! assert!(set.is_enabled("/access/logout"));
//! # Ok::<(), audit_core::AuditError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod application;
mod disabled;
mod error;
mod extractor;
mod generator;
mod identity;
mod mapper;
pub mod memory;
mod path;
mod pipeline;
mod recorder;
mod registry;
mod router;
mod store;
mod txn;

pub use application::{Application, ApplicationId, PropertyId, ValueMap};
pub use disabled::DisabledPaths;
pub use error::{AuditError, AuditResult, BoxError};
pub use extractor::{DataExtractor, SimpleValueExtractor};
pub use generator::{DataGenerator, SystemTimeGenerator};
pub use identity::IdentityService;
pub use mapper::PathMapper;
pub use path::{build_path, check_path_format, root_key, root_path, PathRule, PATH_SEPARATOR};
pub use pipeline::AuditPipeline;
pub use recorder::AuditRecorder;
pub use registry::ModelRegistry;
pub use router::{RoutedGroup, ValueRouter};
pub use store::{AuditEntry, EntryId, EntryQuery, EntryStore, PropertyStore};
pub use txn::{TransactionContext, TransactionGate};
