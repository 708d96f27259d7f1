/*!
 * Scope Handles
 * RAII guards over a scope's acquire count
 */

use super::Scope;
use std::fmt;

/// Token proving a scope cannot close while it is held
///
/// Obtained from [`Scope::acquire`]. Released explicitly with
/// [`ScopeHandle::release`] or implicitly on drop; either way exactly once.
pub struct ScopeHandle {
    scope: Option<Scope>,
}

impl ScopeHandle {
    pub(super) fn new(scope: Scope) -> Self {
        Self { scope: Some(scope) }
    }

    /// The scope this handle keeps open
    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    /// Give up the hold on the scope
    pub fn release(mut self) {
        self.release_inner();
    }

    #[inline]
    fn release_inner(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.end_access();
        }
    }
}

impl Drop for ScopeHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeHandle")
            .field("scope", &self.scope.as_ref().map(Scope::id))
            .finish()
    }
}

/// Transient hold taken for the duration of one memory access
///
/// Only shared scopes are counted; confined, implicit and global scopes
/// cannot be closed concurrently with an access.
#[must_use]
pub struct AccessGuard<'a> {
    scope: Option<&'a Scope>,
}

impl<'a> AccessGuard<'a> {
    #[inline]
    pub(super) fn counted(scope: &'a Scope) -> Self {
        Self { scope: Some(scope) }
    }

    #[inline]
    pub(super) fn uncounted() -> Self {
        Self { scope: None }
    }
}

impl Drop for AccessGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.end_access();
        }
    }
}
