/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 */

use crate::core::id::ScopeId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for every fallible memory operation
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Coarse error classification
///
/// Every [`MemoryError`] belongs to exactly one kind. Callers that only care
/// about the class of failure should match on [`MemoryError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Access after close, from the wrong thread, while acquired, or double close
    LifecycleViolation,
    /// Bad size, alignment, offset, path selector or carrier mismatch
    InvalidArgument,
    /// Operation not permitted by the current access mode or layout shape
    UnsupportedOperation,
    /// Native allocation could not be satisfied
    AllocationFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::LifecycleViolation => write!(f, "lifecycle violation"),
            ErrorKind::InvalidArgument => write!(f, "invalid argument"),
            ErrorKind::UnsupportedOperation => write!(f, "unsupported operation"),
            ErrorKind::AllocationFailure => write!(f, "allocation failure"),
        }
    }
}

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Scope {scope} is already closed")]
    #[diagnostic(
        code(scope::closed),
        help("The backing memory has been released. Keep the scope open while segments are in use.")
    )]
    ScopeClosed { scope: ScopeId },

    #[error("Scope {scope} is confined to another thread")]
    #[diagnostic(
        code(scope::wrong_thread),
        help("Confined scopes may only be used and closed by their owner thread. Use a shared scope instead.")
    )]
    WrongThread { scope: ScopeId },

    #[error("Scope {scope} is acquired by {count} handle(s)")]
    #[diagnostic(
        code(scope::acquired),
        help("Release every scope handle (and wait for in-flight accesses) before closing.")
    )]
    ScopeAcquired { scope: ScopeId, count: u64 },

    #[error("Scope {scope} cannot be closed explicitly: {reason}")]
    #[diagnostic(
        code(scope::not_closeable),
        help("Implicit scopes close when unreachable; the global scope never closes.")
    )]
    NotCloseable { scope: ScopeId, reason: &'static str },

    #[error("Invalid state: {0}")]
    #[diagnostic(code(memory::invalid_state))]
    InvalidState(String),

    #[error("Out of bounds access: offset {offset}, length {length}, segment size {size}")]
    #[diagnostic(
        code(segment::out_of_bounds),
        help("Accesses must satisfy offset + length <= byte_size.")
    )]
    OutOfBounds { offset: u64, length: u64, size: u64 },

    #[error("Misaligned access: address 0x{address:x}, required alignment {alignment}")]
    #[diagnostic(code(segment::misaligned))]
    Misaligned { address: usize, alignment: u64 },

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(memory::invalid_argument))]
    InvalidArgument(String),

    #[error("Unsupported operation: {0}")]
    #[diagnostic(code(memory::unsupported))]
    Unsupported(String),

    #[error("Allocation failed: requested {requested} bytes (alignment {alignment}): {reason}")]
    #[diagnostic(
        code(memory::allocation_failed),
        help("System may be low on memory, or a bounded arena/pool is exhausted.")
    )]
    AllocationFailed {
        requested: u64,
        alignment: u64,
        reason: String,
    },
}

impl MemoryError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemoryError::ScopeClosed { .. }
            | MemoryError::WrongThread { .. }
            | MemoryError::ScopeAcquired { .. }
            | MemoryError::NotCloseable { .. }
            | MemoryError::InvalidState(_) => ErrorKind::LifecycleViolation,
            MemoryError::OutOfBounds { .. }
            | MemoryError::Misaligned { .. }
            | MemoryError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            MemoryError::Unsupported(_) => ErrorKind::UnsupportedOperation,
            MemoryError::AllocationFailed { .. } => ErrorKind::AllocationFailure,
        }
    }

    #[inline]
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        MemoryError::InvalidArgument(msg.into())
    }

    #[inline]
    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        MemoryError::Unsupported(msg.into())
    }

    #[inline]
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        MemoryError::InvalidState(msg.into())
    }

    #[inline]
    pub(crate) fn allocation_failed(requested: u64, alignment: u64, reason: impl Into<String>) -> Self {
        MemoryError::AllocationFailed {
            requested,
            alignment,
            reason: reason.into(),
        }
    }
}
