/*!
 * Bulk Operations
 * Fill, copy, compare and split whole segments
 */

use super::Segment;
use crate::core::errors::{MemoryError, MemoryResult};
use crate::layout::Layout;
use std::ptr;
use std::slice;

impl Segment {
    /// Set every byte to `value`
    pub fn fill(&self, value: u8) -> MemoryResult<()> {
        let _guard = self.begin(0, self.byte_size(), true)?;
        // SAFETY: whole region checked and writable
        unsafe { ptr::write_bytes(self.base().as_ptr(), value, self.len()) };
        Ok(())
    }

    /// Copy all of `src` to the start of this segment
    ///
    /// Requires `self.byte_size() >= src.byte_size()`. Overlapping regions
    /// behave as if copied through an intermediate buffer.
    pub fn copy_from(&self, src: &Segment) -> MemoryResult<()> {
        copy_region(src, 0, self, 0, src.byte_size())
    }

    /// First offset at which this segment and `other` differ
    ///
    /// `None` when both have the same size and contents. When one is a prefix
    /// of the other, the shorter size.
    pub fn mismatch(&self, other: &Segment) -> MemoryResult<Option<u64>> {
        let _mine = self.begin(0, self.byte_size(), false)?;
        let _theirs = other.begin(0, other.byte_size(), false)?;

        if self.address() == other.address() && self.byte_size() == other.byte_size() {
            return Ok(None);
        }

        let common = self.len().min(other.len());
        // SAFETY: both ranges checked for the lifetime of the guards
        let (a, b) = unsafe {
            (
                slice::from_raw_parts(self.base().as_ptr(), common),
                slice::from_raw_parts(other.base().as_ptr(), common),
            )
        };

        if let Some(index) = a.iter().zip(b).position(|(x, y)| x != y) {
            return Ok(Some(index as u64));
        }
        if self.byte_size() != other.byte_size() {
            return Ok(Some(common as u64));
        }
        Ok(None)
    }

    /// Split into consecutive element-sized slices
    ///
    /// The element size must be non-zero and divide the segment size.
    pub fn elements(&self, layout: &Layout) -> MemoryResult<Elements> {
        let element_size = layout.byte_size()?;
        if element_size == 0 {
            return Err(MemoryError::invalid_argument(format!(
                "cannot split into zero-sized elements of {}",
                layout
            )));
        }
        if self.byte_size() % element_size != 0 {
            return Err(MemoryError::invalid_argument(format!(
                "segment size {} is not a multiple of element size {}",
                self.byte_size(),
                element_size
            )));
        }
        Ok(Elements {
            segment: self.clone(),
            element_size,
            next: 0,
            remaining: self.byte_size() / element_size,
        })
    }
}

/// Copy all of `from` to the start of `to`
pub fn copy(from: &Segment, to: &Segment) -> MemoryResult<()> {
    to.copy_from(from)
}

/// Copy `length` bytes between two segments at the given offsets
pub fn copy_region(
    from: &Segment,
    from_offset: u64,
    to: &Segment,
    to_offset: u64,
    length: u64,
) -> MemoryResult<()> {
    let _src = from.begin(from_offset, length, false)?;
    let _dst = to.begin(to_offset, length, true)?;
    // SAFETY: both ranges checked; `ptr::copy` is memmove and tolerates overlap
    unsafe {
        ptr::copy(
            from.base().as_ptr().add(from_offset as usize),
            to.base().as_ptr().add(to_offset as usize),
            length as usize,
        )
    };
    Ok(())
}

/// First differing offset between `a` and `b`, see [`Segment::mismatch`]
pub fn mismatch(a: &Segment, b: &Segment) -> MemoryResult<Option<u64>> {
    a.mismatch(b)
}

/// Iterator over the element slices of a segment
#[derive(Debug, Clone)]
pub struct Elements {
    segment: Segment,
    element_size: u64,
    next: u64,
    remaining: u64,
}

impl Iterator for Elements {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.segment.slice(self.next, self.element_size).ok()?;
        self.next += self.element_size;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Elements {}
