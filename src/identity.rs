//! Identity collaborator contract.

use crate::application::ValueMap;
use crate::error::AuditResult;

/// Resolves the acting principal and performs elevated execution.
///
/// Extraction runs under the system identity so extractors can read
/// system-level context regardless of who triggered the recording; the
/// substitution is explicit rather than an ambient identity stack.
/// [`current_principal`](IdentityService::current_principal) always
/// answers with the *fully resolved caller*, even while
/// [`run_as_system`](IdentityService::run_as_system) work is executing,
/// so entries are attributed to the real actor.
pub trait IdentityService: Send + Sync {
    /// The fully resolved acting principal, if any.
    fn current_principal(&self) -> Option<String>;

    /// Runs `work` under the system identity and returns its result.
    fn run_as_system(
        &self,
        work: &mut dyn FnMut() -> AuditResult<ValueMap>,
    ) -> AuditResult<ValueMap>;
}
