/*!
 * System Limits and Constants
 *
 * Centralized location for allocator and pool sizing constants.
 * Values are tunable defaults, not contracts; [`crate::config`] overrides them.
 *
 * ## Design Philosophy
 * - Each constant notes the unit it is measured in
 * - Values are grouped by the component that reads them
 * - Performance-critical constants are marked with [PERF]
 */

// =============================================================================
// ALIGNMENT
// =============================================================================

/// Smallest legal layout alignment, in bits
pub const MIN_BIT_ALIGNMENT: u64 = 8;

/// Alignment of native blocks when the caller does not care (bytes)
pub const DEFAULT_BYTE_ALIGNMENT: u64 = 1;

/// Largest alignment the pool applies to freshly allocated blocks (4KB page)
/// Requests needing more get a dedicated over-aligned block
pub const MAX_POOL_BLOCK_ALIGNMENT: u64 = 4 * 1024;

// =============================================================================
// ARENA LIMITS
// =============================================================================

/// Default arena block size (4KB)
/// [PERF] One page per block keeps small arenas cheap
pub const DEFAULT_ARENA_BLOCK_SIZE: u64 = 4 * 1024;

/// Alignment of the block behind a bounded bump allocator
/// Covers every scalar carrier so aligned requests waste nothing up front
pub const BUMP_BLOCK_ALIGNMENT: u64 = 16;

/// Initial chunk size for unbounded bump allocators (64KB)
pub const DEFAULT_BUMP_CHUNK_SIZE: usize = 64 * 1024;

// =============================================================================
// POOL LIMITS
// =============================================================================

/// Number of pool buckets: one per power of two up to the address width
pub const POOL_BUCKETS: usize = usize::BITS as usize + 1;

/// Largest bucket considered "small" (1KB blocks)
pub const POOL_SMALL_BUCKET: u32 = 10;

/// Largest bucket considered "medium" (64KB blocks)
pub const POOL_MEDIUM_BUCKET: u32 = 16;

/// Largest bucket considered "large" (1MB blocks); beyond this blocks are huge
pub const POOL_LARGE_BUCKET: u32 = 20;

/// Per-core queue capacity for small blocks
/// [PERF] Small blocks are cheap to retain and most frequently recycled
pub const POOL_SMALL_CAPACITY_PER_CORE: usize = 32;

/// Per-core queue capacity for medium blocks
pub const POOL_MEDIUM_CAPACITY_PER_CORE: usize = 8;

/// Per-core queue capacity for large blocks
pub const POOL_LARGE_CAPACITY_PER_CORE: usize = 1;

/// Queue capacity for multi-MB blocks, independent of core count
pub const POOL_HUGE_CAPACITY: usize = 2;

/// Upper bound on any single bucket's capacity
pub const POOL_MAX_BUCKET_CAPACITY: usize = 4096;
