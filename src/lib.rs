/*!
 * Native Memory Library
 * Checked, scope-tracked access to memory outside the Rust heap
 *
 * - [`Scope`]: lifetime and thread confinement of resources
 * - [`Segment`]: bounded views over native memory
 * - [`Layout`]: descriptors of native data shapes and paths into them
 * - [`SegmentAllocator`]: bump, arena, prefix and scoped allocation
 * - [`SegmentPool`]: reuse of native blocks across scopes
 */

pub mod allocator;
pub mod config;
pub mod core;
pub mod layout;
pub mod monitoring;
pub mod pool;
pub mod scope;
pub mod segment;

// Re-exports
pub use allocator::{ArenaAllocator, BumpAllocator, PrefixAllocator, SegmentAllocator};
pub use config::{ArenaConfig, MemoryConfig, PoolConfig};
pub use crate::core::{ErrorKind, MemoryError, MemoryResult, ScopeId};
pub use layout::{Accessor, ByteOrder, Carrier, GroupKind, Layout, LayoutKind, LayoutPath, PathElement};
pub use monitoring::init_tracing;
pub use pool::{PoolAllocator, PoolStats, SegmentPool};
pub use scope::{Scope, ScopeHandle, ScopeKind};
pub use segment::{AccessModes, Segment};
