/*!
 * Bump Allocation
 * Pointer-bump allocation with reclamation only when the scope closes
 */

use super::SegmentAllocator;
use crate::core::errors::{MemoryError, MemoryResult};
use crate::core::limits::{BUMP_BLOCK_ALIGNMENT, DEFAULT_BUMP_CHUNK_SIZE};
use crate::core::types::{align_up, check_byte_alignment, to_native_size};
use crate::scope::Scope;
use crate::segment::{AccessModes, Segment};
use bumpalo::Bump;
use parking_lot::Mutex;
use std::alloc::Layout as AllocLayout;
use std::fmt;
use std::ptr;
use std::sync::Arc;
use tracing::debug;

/// Cursor over one block; hands out consecutive aligned slices
pub(super) struct BumpBlock {
    block: Segment,
    cursor: u64,
}

impl BumpBlock {
    pub(super) fn new(block: Segment) -> Self {
        Self { block, cursor: 0 }
    }

    /// Next slice of `size` bytes at `alignment`, or `None` if the block is spent
    ///
    /// Alignment is relative to the absolute address, not the block start.
    pub(super) fn try_slice(&mut self, size: u64, alignment: u64) -> Option<Segment> {
        let base = self.block.address() as u64;
        let start = align_up(base.checked_add(self.cursor)?, alignment)? - base;
        let end = start.checked_add(size)?;
        if end > self.block.byte_size() {
            return None;
        }
        let slice = self.block.slice(start, size).ok()?;
        self.cursor = end;
        Some(slice)
    }

    #[inline]
    pub(super) fn used(&self) -> u64 {
        self.cursor
    }

    #[inline]
    pub(super) fn capacity(&self) -> u64 {
        self.block.byte_size()
    }
}

enum BumpStorage {
    Bounded(Mutex<BumpBlock>),
    /// Taken and dropped by the scope's close action
    Unbounded(Arc<Mutex<Option<Bump>>>),
}

/// Bump allocator bound to a scope
///
/// # Performance
///
/// - **Allocation**: O(1), rounds the cursor up and bumps it
/// - **Deallocation**: none individually; everything goes when the scope closes
pub struct BumpAllocator {
    scope: Scope,
    storage: BumpStorage,
}

impl BumpAllocator {
    /// Bump allocator over one preallocated block of `capacity` bytes
    pub fn bounded(capacity: u64, scope: &Scope) -> MemoryResult<Self> {
        let block = Segment::allocate_native(capacity, BUMP_BLOCK_ALIGNMENT, scope)?;
        Ok(Self::over(block))
    }

    /// Bump allocator that slices an existing segment
    pub fn over(segment: Segment) -> Self {
        Self {
            scope: segment.scope().clone(),
            storage: BumpStorage::Bounded(Mutex::new(BumpBlock::new(segment))),
        }
    }

    /// Bump allocator that grows by chunks as needed
    pub fn unbounded(scope: &Scope) -> MemoryResult<Self> {
        let arena = Arc::new(Mutex::new(Some(Bump::with_capacity(DEFAULT_BUMP_CHUNK_SIZE))));
        let released = Arc::clone(&arena);
        let id = scope.id();
        scope.add_close_action(move || {
            if let Some(bump) = released.lock().take() {
                debug!(scope = %id, bytes = bump.allocated_bytes(), "bump chunks released");
            }
        })?;
        Ok(Self {
            scope: scope.clone(),
            storage: BumpStorage::Unbounded(arena),
        })
    }

    #[inline]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[inline]
    pub fn is_bounded(&self) -> bool {
        matches!(self.storage, BumpStorage::Bounded(_))
    }

    /// Bytes handed out so far (bounded) or reserved in chunks (unbounded)
    pub fn allocated_bytes(&self) -> u64 {
        match &self.storage {
            BumpStorage::Bounded(block) => block.lock().used(),
            BumpStorage::Unbounded(arena) => arena
                .lock()
                .as_ref()
                .map_or(0, |bump| bump.allocated_bytes() as u64),
        }
    }

    fn allocate_unbounded(
        &self,
        arena: &Mutex<Option<Bump>>,
        byte_size: u64,
        byte_alignment: u64,
    ) -> MemoryResult<Segment> {
        let failed = |reason: &str| {
            MemoryError::allocation_failed(byte_size, byte_alignment, reason.to_string())
        };
        let size = to_native_size(byte_size).map_err(|_| failed("size exceeds the address space"))?;
        let align = to_native_size(byte_alignment)?;
        let layout = AllocLayout::from_size_align(size, align)
            .map_err(|_| failed("size overflows when rounded up to the alignment"))?;

        let guard = arena.lock();
        let bump = guard.as_ref().ok_or(MemoryError::ScopeClosed {
            scope: self.scope.id(),
        })?;
        let ptr = bump
            .try_alloc_layout(layout)
            .map_err(|_| failed("bump chunk allocation failed"))?;
        // SAFETY: freshly reserved, `size` bytes long; chunks may hold stale data after growth
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, size) };
        // SAFETY: the chunk lives until the scope's close action takes the arena
        Ok(unsafe { Segment::from_parts(ptr, byte_size, AccessModes::ALL, self.scope.clone()) })
    }
}

impl SegmentAllocator for BumpAllocator {
    fn allocate(&self, byte_size: u64, byte_alignment: u64) -> MemoryResult<Segment> {
        check_byte_alignment(byte_alignment)?;
        self.scope.check_valid()?;
        match &self.storage {
            BumpStorage::Bounded(block) => {
                let mut block = block.lock();
                block.try_slice(byte_size, byte_alignment).ok_or_else(|| {
                    MemoryError::allocation_failed(
                        byte_size,
                        byte_alignment,
                        format!(
                            "bump allocator exhausted ({} of {} bytes used)",
                            block.used(),
                            block.capacity()
                        ),
                    )
                })
            }
            BumpStorage::Unbounded(arena) => self.allocate_unbounded(arena, byte_size, byte_alignment),
        }
    }
}

impl fmt::Debug for BumpAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BumpAllocator")
            .field("scope", &self.scope.id())
            .field("bounded", &self.is_bounded())
            .field("allocated_bytes", &self.allocated_bytes())
            .finish()
    }
}
