/*!
 * Pool Buckets
 * Bounded LIFO queues of same-sized native blocks
 */

use crate::core::sync::SpinLock;
use crate::segment::native::NativeBlock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Queue of idle `2^index`-byte blocks
pub(super) struct Bucket {
    index: u32,
    capacity: AtomicUsize,
    queue: SpinLock<Vec<NativeBlock>>,
}

impl Bucket {
    pub(super) fn new(index: u32, capacity: usize) -> Self {
        Self {
            index,
            capacity: AtomicUsize::new(capacity),
            queue: SpinLock::new(Vec::new()),
        }
    }

    #[inline]
    pub(super) fn index(&self) -> u32 {
        self.index
    }

    /// Block size served by this bucket, `None` if it exceeds 64 bits
    #[inline]
    pub(super) fn block_size(&self) -> Option<u64> {
        1u64.checked_shl(self.index)
    }

    /// Most recently returned block
    #[inline]
    pub(super) fn pop(&self) -> Option<NativeBlock> {
        self.queue.lock().pop()
    }

    /// Queue `block` if there is room, else hand it back to be freed
    pub(super) fn push(&self, block: NativeBlock) -> Result<(), NativeBlock> {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity.load(Ordering::Acquire) {
            return Err(block);
        }
        queue.push(block);
        Ok(())
    }

    /// Stop retaining blocks and return everything queued
    pub(super) fn drain(&self) -> Vec<NativeBlock> {
        self.capacity.store(0, Ordering::Release);
        std::mem::take(&mut *self.queue.lock())
    }

    #[inline]
    pub(super) fn len(&self) -> usize {
        self.queue.lock().len()
    }

    #[inline]
    pub(super) fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }
}
