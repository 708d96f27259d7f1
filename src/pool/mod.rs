/*!
 * Segment Pool
 *
 * Recycles native blocks across scopes. Bucket `b` holds idle blocks of
 * exactly `2^b` bytes, so a request is served by the smallest power of two
 * that covers its aligned size.
 *
 * # Lifecycle
 *
 * - `borrow` pops a block (hit) or allocates one (miss) and binds it to the
 *   caller's scope; closing that scope releases the block to its bucket
 * - A release into a full bucket frees the block
 * - Closing the pool's own scope drains and frees every bucket; blocks
 *   released afterwards are freed directly
 *
 * # Performance
 *
 * - Buckets are guarded by spin locks; each critical section is one push or pop
 * - Hits zero only the requested prefix of the block
 */

mod bucket;
mod stats;

pub use stats::PoolStats;

use crate::allocator::SegmentAllocator;
use crate::config::PoolConfig;
use crate::core::errors::{MemoryError, MemoryResult};
use crate::core::limits::{MAX_POOL_BLOCK_ALIGNMENT, POOL_BUCKETS};
use crate::core::types::{align_up, check_byte_alignment};
use crate::scope::{Scope, ScopeHandle};
use crate::segment::native::NativeBlock;
use crate::segment::{AccessModes, Segment};
use bucket::Bucket;
use stats::PoolCounters;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

struct PoolInner {
    buckets: Box<[Bucket]>,
    counters: PoolCounters,
    shutdown: AtomicBool,
}

impl PoolInner {
    fn take_block(&self, bucket: &Bucket, byte_size: u64, byte_alignment: u64) -> MemoryResult<NativeBlock> {
        if let Some(mut block) = bucket.pop() {
            if block.is_aligned_to(byte_alignment) {
                self.counters.hit();
                block.zero_prefix(byte_size as usize);
                trace!(bucket = bucket.index(), address = block.address(), "pool hit");
                return Ok(block);
            }
            // Under-aligned for this request; leave it for the next one
            if let Err(block) = bucket.push(block) {
                drop(block);
                self.counters.freed(1);
            }
        }

        self.counters.miss();
        let block_size = bucket.block_size().ok_or_else(|| {
            MemoryError::allocation_failed(byte_size, byte_alignment, "request exceeds the largest pool bucket")
        })?;
        let block_alignment = byte_alignment.max(block_size.min(MAX_POOL_BLOCK_ALIGNMENT));
        debug!(
            bucket = bucket.index(),
            block_size,
            alignment = block_alignment,
            "pool miss, allocating block"
        );
        NativeBlock::allocate(block_size, block_alignment)
    }

    fn release(&self, bucket: u32, block: NativeBlock) {
        if self.shutdown.load(Ordering::Acquire) {
            drop(block);
            self.counters.freed(1);
            return;
        }
        match self.buckets[bucket as usize].push(block) {
            Ok(()) => self.counters.recycled(),
            Err(block) => {
                trace!(bucket, "bucket full, freeing block");
                drop(block);
                self.counters.freed(1);
            }
        }
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let freed: usize = self.buckets.iter().map(|bucket| bucket.drain().len()).sum();
        self.counters.freed(freed as u64);
        debug!(freed, "segment pool shut down");
    }

    fn queued(&self) -> Vec<(u32, usize)> {
        self.buckets
            .iter()
            .map(|bucket| (bucket.index(), bucket.len()))
            .filter(|&(_, len)| len > 0)
            .collect()
    }
}

/// Pool of reusable native blocks, shut down when its scope closes
#[derive(Clone)]
pub struct SegmentPool {
    scope: Scope,
    inner: Arc<PoolInner>,
}

impl SegmentPool {
    /// Pool with default capacities bound to `scope`
    pub fn new(scope: &Scope) -> MemoryResult<Self> {
        Self::with_config(&PoolConfig::default(), scope)
    }

    pub fn with_config(config: &PoolConfig, scope: &Scope) -> MemoryResult<Self> {
        config.validate()?;
        let buckets = (0..POOL_BUCKETS as u32)
            .map(|index| Bucket::new(index, config.capacity(index)))
            .collect();
        let inner = Arc::new(PoolInner {
            buckets,
            counters: PoolCounters::default(),
            shutdown: AtomicBool::new(false),
        });

        let on_close = Arc::clone(&inner);
        scope.add_close_action(move || on_close.shutdown())?;
        debug!(scope = %scope.id(), "segment pool created");
        Ok(Self {
            scope: scope.clone(),
            inner,
        })
    }

    /// Bucket serving `byte_size` bytes at `byte_alignment`
    ///
    /// `ceil(log2(align_up(byte_size, byte_alignment)))`, with empty requests
    /// in bucket 0.
    pub fn bucket_for(byte_size: u64, byte_alignment: u64) -> MemoryResult<u32> {
        check_byte_alignment(byte_alignment)?;
        let rounded = align_up(byte_size, byte_alignment).ok_or_else(|| {
            MemoryError::allocation_failed(byte_size, byte_alignment, "size overflows when aligned")
        })?;
        if rounded <= 1 {
            return Ok(0);
        }
        Ok(u64::BITS - (rounded - 1).leading_zeros())
    }

    /// Borrow a block of at least `byte_size` bytes, returned when `scope` closes
    pub fn borrow(&self, byte_size: u64, byte_alignment: u64, scope: &Scope) -> MemoryResult<Segment> {
        let index = Self::bucket_for(byte_size, byte_alignment)?;
        self.scope.check_valid()?;
        scope.check_valid()?;
        let bucket = self.inner.buckets.get(index as usize).ok_or_else(|| {
            MemoryError::allocation_failed(byte_size, byte_alignment, "request exceeds the largest pool bucket")
        })?;

        let block = self.inner.take_block(bucket, byte_size, byte_alignment)?;
        self.bind(index, block, byte_size, scope)
    }

    /// Hand `block` to `scope`, which releases it back to bucket `index` on close
    fn bind(&self, index: u32, block: NativeBlock, byte_size: u64, scope: &Scope) -> MemoryResult<Segment> {
        let base = block.as_ptr();
        let inner = Arc::clone(&self.inner);
        if let Err((err, release)) = scope.try_add_close_action(move || inner.release(index, block)) {
            // The scope closed after it was checked; the block goes back to its bucket
            release();
            return Err(err);
        }

        // SAFETY: the block is owned by the close action until the scope closes
        Ok(unsafe { Segment::from_parts(base, byte_size, AccessModes::ALL, scope.clone()) })
    }

    /// Allocator drawing from this pool on behalf of `scope`
    ///
    /// Holds the pool's scope open until the allocator is dropped.
    pub fn allocator(&self, scope: &Scope) -> MemoryResult<PoolAllocator> {
        let hold = self.scope.acquire()?;
        Ok(PoolAllocator {
            pool: self.clone(),
            target: scope.clone(),
            _hold: hold,
        })
    }

    #[inline]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Capacity of `bucket`, zero after shutdown
    pub fn bucket_capacity(&self, bucket: u32) -> usize {
        self.inner
            .buckets
            .get(bucket as usize)
            .map_or(0, Bucket::capacity)
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.counters.snapshot(self.inner.queued())
    }
}

impl fmt::Debug for SegmentPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentPool")
            .field("scope", &self.scope.id())
            .field("shut_down", &self.is_shut_down())
            .field("stats", &self.stats())
            .finish()
    }
}

/// [`SegmentAllocator`] that borrows from a pool into a target scope
#[derive(Debug)]
pub struct PoolAllocator {
    pool: SegmentPool,
    target: Scope,
    _hold: ScopeHandle,
}

impl PoolAllocator {
    #[inline]
    pub fn pool(&self) -> &SegmentPool {
        &self.pool
    }

    /// Scope the borrowed segments are bound to
    #[inline]
    pub fn target(&self) -> &Scope {
        &self.target
    }
}

impl SegmentAllocator for PoolAllocator {
    fn allocate(&self, byte_size: u64, byte_alignment: u64) -> MemoryResult<Segment> {
        self.pool.borrow(byte_size, byte_alignment, &self.target)
    }
}
