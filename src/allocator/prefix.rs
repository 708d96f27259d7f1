/*!
 * Prefix Allocator
 * Hands out the head of a single segment, over and over
 */

use super::SegmentAllocator;
use crate::core::errors::MemoryResult;
use crate::segment::Segment;

/// Allocator that always returns `segment.slice(0, size)`
///
/// Each allocation overwrites the previous one and alignment is ignored.
/// Useful for scratch buffers reused across calls.
#[derive(Debug, Clone)]
pub struct PrefixAllocator {
    segment: Segment,
}

impl PrefixAllocator {
    pub fn new(segment: Segment) -> Self {
        Self { segment }
    }

    #[inline]
    pub fn segment(&self) -> &Segment {
        &self.segment
    }
}

impl SegmentAllocator for PrefixAllocator {
    fn allocate(&self, byte_size: u64, _byte_alignment: u64) -> MemoryResult<Segment> {
        self.segment.slice(0, byte_size)
    }
}
