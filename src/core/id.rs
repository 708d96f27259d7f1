/*!
 * ID Generation
 * Process-unique scope identifiers
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Type-Safe ID Wrappers
// ============================================================================

/// Scope identifier, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(pub u64);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Atomic Counter Generator
// ============================================================================

/// Monotonic atomic counter for hot paths
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - Lock-free, never recycles
#[repr(C, align(64))]
pub struct AtomicGenerator {
    counter: AtomicU64,
}

impl AtomicGenerator {
    /// Create new generator starting at given value
    #[inline]
    pub const fn new(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }

    /// Next value
    #[inline]
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Current counter value (for debugging)
    #[inline]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

static SCOPE_IDS: AtomicGenerator = AtomicGenerator::new(1);

impl ScopeId {
    /// Allocate a fresh scope id. Id 0 is reserved for the global scope.
    #[inline]
    pub(crate) fn next() -> Self {
        ScopeId(SCOPE_IDS.next())
    }

    /// Id of the global scope
    pub const GLOBAL: ScopeId = ScopeId(0);
}

// ============================================================================
// Tests
// ============================================================================
