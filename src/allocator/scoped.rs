/*!
 * Scoped Allocation
 * A scope allocates one native block per request, freed when it closes
 */

use super::SegmentAllocator;
use crate::core::errors::MemoryResult;
use crate::scope::Scope;
use crate::segment::Segment;

impl SegmentAllocator for Scope {
    #[inline]
    fn allocate(&self, byte_size: u64, byte_alignment: u64) -> MemoryResult<Segment> {
        Segment::allocate_native(byte_size, byte_alignment, self)
    }
}
