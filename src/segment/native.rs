/*!
 * Native Storage
 *
 * Owned native blocks and the segment constructors that bind storage to a
 * scope. Every constructor registers exactly one close action that releases
 * the storage, so the scope decides when memory goes away.
 */

use super::{AccessModes, Segment};
use crate::core::errors::{MemoryError, MemoryResult};
use crate::core::types::{check_byte_alignment, to_native_size, Address};
use crate::layout::{Carrier, Layout};
use crate::scope::Scope;
use std::alloc::{self, Layout as AllocLayout};
use std::ptr::{self, NonNull};
use tracing::{trace, warn};

/// Zero-initialized block from the global allocator, freed on drop
#[derive(Debug)]
pub(crate) struct NativeBlock {
    ptr: NonNull<u8>,
    layout: AllocLayout,
}

// SAFETY: the block exclusively owns its allocation; no thread-affine state.
unsafe impl Send for NativeBlock {}

impl NativeBlock {
    /// Allocate `byte_size` zeroed bytes aligned to `byte_alignment`
    ///
    /// Zero-sized blocks do not allocate; their address is the alignment.
    pub(crate) fn allocate(byte_size: u64, byte_alignment: u64) -> MemoryResult<Self> {
        check_byte_alignment(byte_alignment)?;
        let failed = |reason: &str| {
            MemoryError::allocation_failed(byte_size, byte_alignment, reason.to_string())
        };
        let size = to_native_size(byte_size).map_err(|_| failed("size exceeds the address space"))?;
        let align =
            to_native_size(byte_alignment).map_err(|_| failed("alignment exceeds the address space"))?;
        let layout = AllocLayout::from_size_align(size, align)
            .map_err(|_| failed("size overflows when rounded up to the alignment"))?;

        let ptr = if size == 0 {
            NonNull::new(ptr::null_mut::<u8>().wrapping_add(align))
        } else {
            // SAFETY: layout has non-zero size
            NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
        };
        match ptr {
            Some(ptr) => Ok(Self { ptr, layout }),
            None => {
                warn!(size = byte_size, alignment = byte_alignment, "native allocation failed");
                Err(failed("the native allocator returned null"))
            }
        }
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    #[inline]
    pub(crate) fn address(&self) -> Address {
        self.ptr.as_ptr() as Address
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub(crate) fn is_aligned_to(&self, byte_alignment: u64) -> bool {
        (self.address() as u64) % byte_alignment == 0
    }

    /// Zero the first `len` bytes
    pub(crate) fn zero_prefix(&mut self, len: usize) {
        let len = len.min(self.size());
        // SAFETY: len is within the block and the block is exclusively owned
        unsafe { ptr::write_bytes(self.ptr.as_ptr(), 0, len) };
    }
}

impl Drop for NativeBlock {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            // SAFETY: allocated with exactly this layout in `allocate`
            unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }
}

/// Heap array kept alive by an implicit scope
struct ArrayStorage<T> {
    ptr: NonNull<[T]>,
}

// SAFETY: owns the boxed slice; carriers are Send.
unsafe impl<T: Carrier> Send for ArrayStorage<T> {}

impl<T> Drop for ArrayStorage<T> {
    fn drop(&mut self) {
        // SAFETY: produced by Box::into_raw and dropped exactly once
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
    }
}

impl Segment {
    /// Allocate a fresh zeroed native block bound to `scope`
    pub fn allocate_native(byte_size: u64, byte_alignment: u64, scope: &Scope) -> MemoryResult<Segment> {
        scope.check_valid()?;
        let block = NativeBlock::allocate(byte_size, byte_alignment)?;
        let base = block.as_ptr();
        // On failure the block is dropped with the closure, freeing it
        scope.add_close_action(move || drop(block))?;
        trace!(scope = %scope.id(), size = byte_size, alignment = byte_alignment, "native segment allocated");
        // SAFETY: the block stays allocated until the scope's close action runs
        Ok(unsafe { Segment::from_parts(base, byte_size, AccessModes::ALL, scope.clone()) })
    }

    /// Allocate a native block sized and aligned for `layout`
    pub fn allocate_layout(layout: &Layout, scope: &Scope) -> MemoryResult<Segment> {
        Self::allocate_native(layout.byte_size()?, layout.byte_alignment(), scope)
    }

    /// Wrap an in-process array without copying
    ///
    /// The segment gets an implicit scope that owns the storage and frees it
    /// once the last view is gone.
    pub fn of_array<T: Carrier>(values: Vec<T>) -> Segment {
        let byte_size = (values.len() * std::mem::size_of::<T>()) as u64;
        let raw = Box::into_raw(values.into_boxed_slice());
        // SAFETY: Box::into_raw never returns null
        let ptr = unsafe { NonNull::new_unchecked(raw) };
        let storage = ArrayStorage { ptr };
        let scope = Scope::implicit_with(move || drop(storage));
        // SAFETY: the storage lives until the implicit scope becomes unreachable
        unsafe { Segment::from_parts(ptr.cast::<u8>(), byte_size, AccessModes::ALL, scope) }
    }

    /// Segment over memory owned elsewhere
    ///
    /// # Safety
    ///
    /// `address..address + byte_size` must be valid for reads and writes for
    /// as long as `scope` is alive. Releasing it is up to the caller, usually
    /// through a close action on `scope`.
    pub unsafe fn from_raw_parts(address: Address, byte_size: u64, scope: &Scope) -> MemoryResult<Segment> {
        scope.check_valid()?;
        let len = to_native_size(byte_size)?;
        if address.checked_add(len).is_none() {
            return Err(MemoryError::invalid_argument(format!(
                "region 0x{:x} + {} wraps the address space",
                address, byte_size
            )));
        }
        let base = NonNull::new(address as *mut u8)
            .ok_or_else(|| MemoryError::invalid_argument("segment base address is null"))?;
        Ok(Segment::from_parts(base, byte_size, AccessModes::ALL, scope.clone()))
    }
}
