/*!
 * Segment Allocators
 *
 * Strategies for carving segments out of native memory. Every allocator is
 * bound to a scope: what it hands out lives until that scope closes.
 *
 * - [`BumpAllocator`]: one cursor over a bounded block, or growing chunks
 * - [`ArenaAllocator`]: fixed-size blocks with dedicated blocks for big requests
 * - [`PrefixAllocator`]: always returns the head of one segment
 * - [`Scope`](crate::scope::Scope): one native block per request
 *
 * The typed layer (`allocate_value`, `allocate_array`, ...) is provided by
 * default methods on [`SegmentAllocator`].
 */

mod arena;
mod bump;
mod prefix;
mod scoped;

pub use arena::ArenaAllocator;
pub use bump::BumpAllocator;
pub use prefix::PrefixAllocator;

use crate::core::errors::{MemoryError, MemoryResult};
use crate::core::limits::DEFAULT_BYTE_ALIGNMENT;
use crate::layout::{Carrier, Layout, LayoutKind};
use crate::segment::Segment;
use std::sync::Arc;

/// Source of segments
pub trait SegmentAllocator {
    /// Allocate `byte_size` bytes aligned to `byte_alignment` (a power of two)
    fn allocate(&self, byte_size: u64, byte_alignment: u64) -> MemoryResult<Segment>;

    /// Allocate `byte_size` bytes with no alignment requirement
    fn allocate_bytes(&self, byte_size: u64) -> MemoryResult<Segment> {
        self.allocate(byte_size, DEFAULT_BYTE_ALIGNMENT)
    }

    /// Allocate a segment sized and aligned for `layout`
    fn allocate_layout(&self, layout: &Layout) -> MemoryResult<Segment> {
        self.allocate(layout.byte_size()?, layout.byte_alignment())
    }

    /// Allocate room for one value of `layout` and store `value` in it
    fn allocate_value<T: Carrier>(&self, layout: &Layout, value: T) -> MemoryResult<Segment>
    where
        Self: Sized,
    {
        let segment = self.allocate_layout(layout)?;
        segment.set(layout, 0, value)?;
        Ok(segment)
    }

    /// Allocate an array of `element` and copy `values` into it
    ///
    /// Values are byte-swapped when the element's order is not native.
    fn allocate_array<T: Carrier>(&self, element: &Layout, values: &[T]) -> MemoryResult<Segment>
    where
        Self: Sized,
    {
        let order = match element.kind() {
            LayoutKind::Value { bits, order } if *bits == T::BITS => *order,
            _ => {
                return Err(MemoryError::invalid_argument(format!(
                    "carrier {} does not match element layout {}",
                    T::NAME,
                    element
                )))
            }
        };
        let segment = self.allocate_sequence(element, values.len() as u64)?;
        if order.is_native() {
            // SAFETY: carriers are plain data; the view covers exactly the slice
            let bytes = unsafe {
                std::slice::from_raw_parts(values.as_ptr().cast::<u8>(), std::mem::size_of_val(values))
            };
            segment.write_bytes(0, bytes)?;
        } else {
            for (index, value) in values.iter().enumerate() {
                segment.set_at_index(element, index as u64, *value)?;
            }
        }
        Ok(segment)
    }

    /// Allocate `count` consecutive elements of `element`
    fn allocate_sequence(&self, element: &Layout, count: u64) -> MemoryResult<Segment> {
        self.allocate_layout(&Layout::sequence(count, element.clone()))
    }
}

impl<A: SegmentAllocator + ?Sized> SegmentAllocator for &A {
    fn allocate(&self, byte_size: u64, byte_alignment: u64) -> MemoryResult<Segment> {
        (**self).allocate(byte_size, byte_alignment)
    }
}

impl<A: SegmentAllocator + ?Sized> SegmentAllocator for Arc<A> {
    fn allocate(&self, byte_size: u64, byte_alignment: u64) -> MemoryResult<Segment> {
        (**self).allocate(byte_size, byte_alignment)
    }
}

impl<A: SegmentAllocator + ?Sized> SegmentAllocator for Box<A> {
    fn allocate(&self, byte_size: u64, byte_alignment: u64) -> MemoryResult<Segment> {
        (**self).allocate(byte_size, byte_alignment)
    }
}
