/*!
 * Segment Access
 * Access modes and checked single-value and byte-range access
 */

use super::Segment;
use crate::core::errors::{MemoryError, MemoryResult};
use crate::layout::{ByteOrder, Carrier, Layout, LayoutKind};
use crate::scope::AccessGuard;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::ptr;

/// Operations a segment view permits
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessModes(u8);

impl AccessModes {
    pub const READ: AccessModes = AccessModes(0b001);
    pub const WRITE: AccessModes = AccessModes(0b010);
    pub const CLOSE: AccessModes = AccessModes(0b100);
    pub const ALL: AccessModes = AccessModes(0b111);

    #[inline]
    pub const fn contains(self, other: AccessModes) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn without(self, other: AccessModes) -> AccessModes {
        AccessModes(self.0 & !other.0)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for AccessModes {
    type Output = AccessModes;

    fn bitor(self, rhs: AccessModes) -> AccessModes {
        AccessModes(self.0 | rhs.0)
    }
}

impl fmt::Debug for AccessModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |mode, c| if self.contains(mode) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(AccessModes::READ, 'r'),
            flag(AccessModes::WRITE, 'w'),
            flag(AccessModes::CLOSE, 'c')
        )
    }
}

impl Segment {
    /// Run the scope, mode and bounds checks for an access
    pub(crate) fn begin(&self, offset: u64, length: u64, write: bool) -> MemoryResult<AccessGuard<'_>> {
        let guard = self.scope().begin_access()?;
        if write && self.is_read_only() {
            return Err(MemoryError::unsupported(format!(
                "segment at 0x{:x} is read-only",
                self.address()
            )));
        }
        self.check_bounds(offset, length)?;
        Ok(guard)
    }

    fn checked_ptr<T: Carrier>(&self, offset: u64, byte_alignment: u64) -> MemoryResult<*mut T> {
        // Bounds were checked, so the address cannot wrap
        let address = self.address() + offset as usize;
        if (address as u64) % byte_alignment != 0 {
            return Err(MemoryError::Misaligned {
                address,
                alignment: byte_alignment,
            });
        }
        // SAFETY: offset is within the checked region
        Ok(unsafe { self.base().as_ptr().add(offset as usize) }.cast::<T>())
    }

    pub(crate) fn read_value<T: Carrier>(
        &self,
        offset: u64,
        order: ByteOrder,
        byte_alignment: u64,
    ) -> MemoryResult<T> {
        let _guard = self.begin(offset, T::BITS / 8, false)?;
        let ptr = self.checked_ptr::<T>(offset, byte_alignment)?;
        // SAFETY: in bounds, scope alive for the guard's lifetime, any bit pattern is a valid carrier
        let raw = unsafe { ptr::read_unaligned(ptr) };
        Ok(raw.to_order(order))
    }

    pub(crate) fn write_value<T: Carrier>(
        &self,
        offset: u64,
        order: ByteOrder,
        byte_alignment: u64,
        value: T,
    ) -> MemoryResult<()> {
        let _guard = self.begin(offset, T::BITS / 8, true)?;
        let ptr = self.checked_ptr::<T>(offset, byte_alignment)?;
        // SAFETY: in bounds, writable, scope alive for the guard's lifetime
        unsafe { ptr::write_unaligned(ptr, value.to_order(order)) };
        Ok(())
    }

    /// Load a `T` described by value layout `layout` at `offset`
    pub fn get<T: Carrier>(&self, layout: &Layout, offset: u64) -> MemoryResult<T> {
        let order = value_order::<T>(layout)?;
        self.read_value(offset, order, layout.byte_alignment())
    }

    /// Store `value` as described by value layout `layout` at `offset`
    pub fn set<T: Carrier>(&self, layout: &Layout, offset: u64, value: T) -> MemoryResult<()> {
        let order = value_order::<T>(layout)?;
        self.write_value(offset, order, layout.byte_alignment(), value)
    }

    /// Load element `index` of an array of `layout`
    pub fn get_at_index<T: Carrier>(&self, layout: &Layout, index: u64) -> MemoryResult<T> {
        self.get(layout, element_offset(layout, index)?)
    }

    /// Store element `index` of an array of `layout`
    pub fn set_at_index<T: Carrier>(&self, layout: &Layout, index: u64, value: T) -> MemoryResult<()> {
        self.set(layout, element_offset(layout, index)?, value)
    }

    /// Copy `dst.len()` bytes starting at `offset` out of the segment
    pub fn read_bytes(&self, offset: u64, dst: &mut [u8]) -> MemoryResult<()> {
        let _guard = self.begin(offset, dst.len() as u64, false)?;
        // SAFETY: source range checked; dst is a distinct Rust buffer
        unsafe {
            ptr::copy_nonoverlapping(
                self.base().as_ptr().add(offset as usize),
                dst.as_mut_ptr(),
                dst.len(),
            )
        };
        Ok(())
    }

    /// Copy `src` into the segment starting at `offset`
    pub fn write_bytes(&self, offset: u64, src: &[u8]) -> MemoryResult<()> {
        let _guard = self.begin(offset, src.len() as u64, true)?;
        // SAFETY: destination range checked and writable; memmove tolerates src aliasing the segment
        unsafe { ptr::copy(src.as_ptr(), self.base().as_ptr().add(offset as usize), src.len()) };
        Ok(())
    }

    /// Copy the whole segment into a new vector
    pub fn to_vec(&self) -> MemoryResult<Vec<u8>> {
        let mut bytes = vec![0u8; self.len()];
        self.read_bytes(0, &mut bytes)?;
        Ok(bytes)
    }
}

fn value_order<T: Carrier>(layout: &Layout) -> MemoryResult<ByteOrder> {
    match layout.kind() {
        LayoutKind::Value { bits, order } if *bits == T::BITS => Ok(*order),
        _ => Err(MemoryError::invalid_argument(format!(
            "carrier {} ({} bits) does not match layout {}",
            T::NAME,
            T::BITS,
            layout
        ))),
    }
}

fn element_offset(layout: &Layout, index: u64) -> MemoryResult<u64> {
    layout
        .byte_size()?
        .checked_mul(index)
        .ok_or_else(|| MemoryError::invalid_argument(format!("index {} overflows", index)))
}
