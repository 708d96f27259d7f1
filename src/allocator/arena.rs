/*!
 * Arena Allocation
 *
 * Block-based arena: requests are sliced out of the current fixed-size
 * block; a request whose worst case (`size + alignment - 1`) does not fit a
 * block gets a dedicated block of its own. All blocks are native segments of
 * the arena's scope and are released together when it closes.
 *
 * Shared arenas serialize allocation through a `parking_lot::Mutex`; confined
 * arenas reject callers other than the owner before touching the lock.
 */

use super::bump::BumpBlock;
use super::SegmentAllocator;
use crate::config::ArenaConfig;
use crate::core::errors::{MemoryError, MemoryResult};
use crate::core::limits::DEFAULT_BYTE_ALIGNMENT;
use crate::core::types::{align_up, check_byte_alignment};
use crate::scope::Scope;
use crate::segment::Segment;
use parking_lot::Mutex;
use std::fmt;
use tracing::{debug, warn};

struct ArenaState {
    current: Option<BumpBlock>,
    /// Bytes reserved in native blocks so far, counted against the limit
    reserved: u64,
    blocks: usize,
}

/// Arena allocator bound to a scope
pub struct ArenaAllocator {
    scope: Scope,
    block_size: u64,
    limit: Option<u64>,
    state: Mutex<ArenaState>,
}

impl ArenaAllocator {
    /// Unbounded arena with the default block size
    pub fn new(scope: &Scope) -> MemoryResult<Self> {
        Self::with_config(&ArenaConfig::default(), scope)
    }

    /// Unbounded arena with a custom block size
    pub fn with_block_size(block_size: u64, scope: &Scope) -> MemoryResult<Self> {
        Self::with_config(&ArenaConfig::default().with_block_size(block_size), scope)
    }

    /// Arena that never reserves more than `arena_size` bytes
    ///
    /// The whole arena is reserved up front as a single block.
    pub fn bounded(arena_size: u64, scope: &Scope) -> MemoryResult<Self> {
        Self::with_config(&ArenaConfig::bounded(arena_size), scope)
    }

    pub fn with_config(config: &ArenaConfig, scope: &Scope) -> MemoryResult<Self> {
        config.validate()?;
        scope.check_valid()?;
        let arena = Self {
            scope: scope.clone(),
            block_size: config.block_size,
            limit: config.limit,
            state: Mutex::new(ArenaState {
                current: None,
                reserved: 0,
                blocks: 0,
            }),
        };
        if config.limit.is_some() {
            let mut state = arena.state.lock();
            let block = arena.new_block(&mut state, config.block_size, DEFAULT_BYTE_ALIGNMENT)?;
            state.current = Some(BumpBlock::new(block));
            drop(state);
        }
        Ok(arena)
    }

    #[inline]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[inline]
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    #[inline]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Bytes reserved in native blocks
    pub fn reserved_bytes(&self) -> u64 {
        self.state.lock().reserved
    }

    /// Native blocks reserved so far, dedicated ones included
    pub fn block_count(&self) -> usize {
        self.state.lock().blocks
    }

    fn new_block(&self, state: &mut ArenaState, byte_size: u64, byte_alignment: u64) -> MemoryResult<Segment> {
        let footprint = align_up(byte_size, byte_alignment).ok_or_else(|| {
            MemoryError::allocation_failed(byte_size, byte_alignment, "size overflows")
        })?;
        let reserved = state.reserved.checked_add(footprint);
        if let Some(limit) = self.limit {
            if reserved.map_or(true, |total| total > limit) {
                warn!(scope = %self.scope.id(), limit, requested = byte_size, "arena limit reached");
                return Err(MemoryError::allocation_failed(
                    byte_size,
                    byte_alignment,
                    format!("arena limit of {} bytes exhausted", limit),
                ));
            }
        }

        let block = Segment::allocate_native(byte_size, byte_alignment, &self.scope)?;
        state.reserved = reserved.unwrap_or(u64::MAX);
        state.blocks += 1;
        debug!(
            scope = %self.scope.id(),
            size = byte_size,
            alignment = byte_alignment,
            blocks = state.blocks,
            "arena block allocated"
        );
        Ok(block)
    }
}

impl SegmentAllocator for ArenaAllocator {
    fn allocate(&self, byte_size: u64, byte_alignment: u64) -> MemoryResult<Segment> {
        check_byte_alignment(byte_alignment)?;
        self.scope.check_valid()?;

        let mut state = self.state.lock();
        if let Some(slice) = state
            .current
            .as_mut()
            .and_then(|block| block.try_slice(byte_size, byte_alignment))
        {
            return Ok(slice);
        }

        let worst_case = byte_size.checked_add(byte_alignment - 1);
        if worst_case.map_or(true, |worst| worst > self.block_size) {
            // Dedicated block; the current block keeps serving small requests
            return self.new_block(&mut state, byte_size, byte_alignment);
        }

        let block = self.new_block(&mut state, self.block_size, DEFAULT_BYTE_ALIGNMENT)?;
        let mut block = BumpBlock::new(block);
        let slice = block.try_slice(byte_size, byte_alignment).ok_or_else(|| {
            MemoryError::allocation_failed(byte_size, byte_alignment, "request does not fit a fresh block")
        })?;
        state.current = Some(block);
        Ok(slice)
    }
}

impl fmt::Debug for ArenaAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ArenaAllocator")
            .field("scope", &self.scope.id())
            .field("block_size", &self.block_size)
            .field("limit", &self.limit)
            .field("reserved", &state.reserved)
            .field("blocks", &state.blocks)
            .finish()
    }
}
