/*!
 * Memory Segments
 *
 * A segment is a bounded view over a contiguous native region, tied to the
 * scope that governs the region's lifetime. Every access checks, in order:
 *
 * 1. temporal safety: the scope is alive and usable from this thread
 * 2. access mode: writes need WRITE, closing needs CLOSE
 * 3. spatial safety: `offset + length <= byte_size`
 *
 * Segments are immutable values. Views (`slice`, `as_read_only`, ...) return
 * new segments sharing the same scope; re-ownership consumes the source.
 */

mod access;
mod bulk;
pub(crate) mod native;

pub use access::AccessModes;
pub use bulk::{copy, copy_region, mismatch, Elements};

use crate::core::errors::{MemoryError, MemoryResult};
use crate::core::types::Address;
use crate::scope::{Ownership, Scope};
use std::fmt;
use std::ptr::NonNull;
use std::thread::ThreadId;

/// Bounded, scope-checked view over native memory
#[derive(Clone)]
pub struct Segment {
    base: NonNull<u8>,
    byte_size: u64,
    modes: AccessModes,
    scope: Scope,
}

// SAFETY: every dereference of `base` goes through the scope check, which
// enforces confinement for confined scopes. Concurrent accesses through a
// shared scope are unordered; callers synchronize them.
unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

impl Segment {
    /// Assemble a segment from its parts
    ///
    /// # Safety
    ///
    /// `base..base + byte_size` must stay valid while `scope` is alive, and
    /// `byte_size` must fit in `usize`.
    pub(crate) unsafe fn from_parts(
        base: NonNull<u8>,
        byte_size: u64,
        modes: AccessModes,
        scope: Scope,
    ) -> Self {
        Self {
            base,
            byte_size,
            modes,
            scope,
        }
    }

    /// Base address
    #[inline]
    pub fn address(&self) -> Address {
        self.base.as_ptr() as Address
    }

    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.byte_size == 0
    }

    #[inline]
    pub fn modes(&self) -> AccessModes {
        self.modes
    }

    #[inline]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.scope.is_alive()
    }

    #[inline]
    pub fn is_read_only(&self) -> bool {
        !self.modes.contains(AccessModes::WRITE)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        !self.modes.contains(AccessModes::CLOSE)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        // Constructors guarantee the size fits the address space
        self.byte_size as usize
    }

    #[inline]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// View of `length` bytes starting at `offset`
    pub fn slice(&self, offset: u64, length: u64) -> MemoryResult<Segment> {
        self.check_bounds(offset, length)?;
        Ok(self.view(offset, length, self.modes))
    }

    /// View from `offset` to the end
    pub fn slice_from(&self, offset: u64) -> MemoryResult<Segment> {
        let length = self.byte_size.checked_sub(offset).ok_or(MemoryError::OutOfBounds {
            offset,
            length: 0,
            size: self.byte_size,
        })?;
        self.slice(offset, length)
    }

    /// View without WRITE
    pub fn as_read_only(&self) -> Segment {
        self.view(0, self.byte_size, self.modes.without(AccessModes::WRITE))
    }

    /// View without CLOSE
    pub fn as_pinned(&self) -> Segment {
        self.view(0, self.byte_size, self.modes.without(AccessModes::CLOSE))
    }

    /// Hand the region over to `owner`
    ///
    /// Consumes the segment and invalidates its scope; every other view of the
    /// old scope fails from now on. Only confined scopes can be handed over.
    pub fn as_confined(self, owner: ThreadId) -> MemoryResult<Segment> {
        self.transfer(Ownership::Confined(owner))
    }

    /// Make the region usable from any thread
    ///
    /// Consumes the segment and invalidates its scope, like [`Self::as_confined`].
    pub fn as_shared(self) -> MemoryResult<Segment> {
        self.transfer(Ownership::Shared)
    }

    fn transfer(self, to: Ownership) -> MemoryResult<Segment> {
        self.require_close("change the ownership of")?;
        let scope = self.scope.transfer(to)?;
        Ok(Segment { scope, ..self })
    }

    /// Close the segment's scope, releasing everything bound to it
    pub fn close(self) -> MemoryResult<()> {
        self.require_close("close")?;
        self.scope.close()
    }

    fn require_close(&self, action: &str) -> MemoryResult<()> {
        if self.is_pinned() {
            return Err(MemoryError::unsupported(format!(
                "cannot {} pinned segment at 0x{:x}",
                action,
                self.address()
            )));
        }
        Ok(())
    }

    /// Signed distance from this segment's base to `other`'s
    pub fn segment_offset(&self, other: &Segment) -> i64 {
        other.address().wrapping_sub(self.address()) as isize as i64
    }

    /// Part of this segment that overlaps `other`, if any
    pub fn as_overlapping_slice(&self, other: &Segment) -> Option<Segment> {
        let start = self.address().max(other.address());
        let end = (self.address() + self.len()).min(other.address() + other.len());
        if start >= end {
            return None;
        }
        let offset = (start - self.address()) as u64;
        Some(self.view(offset, (end - start) as u64, self.modes))
    }

    /// View that is known to be in bounds
    fn view(&self, offset: u64, length: u64, modes: AccessModes) -> Segment {
        debug_assert!(offset + length <= self.byte_size);
        // SAFETY: offset is within the region, so the result is in bounds and non-null
        let base = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(offset as usize)) };
        Segment {
            base,
            byte_size: length,
            modes,
            scope: self.scope.clone(),
        }
    }

    #[inline]
    pub(crate) fn check_bounds(&self, offset: u64, length: u64) -> MemoryResult<()> {
        match offset.checked_add(length) {
            Some(end) if end <= self.byte_size => Ok(()),
            _ => Err(MemoryError::OutOfBounds {
                offset,
                length,
                size: self.byte_size,
            }),
        }
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("address", &format_args!("0x{:x}", self.address()))
            .field("byte_size", &self.byte_size)
            .field("modes", &self.modes)
            .field("scope", &self.scope.id())
            .finish()
    }
}
