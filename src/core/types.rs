/*!
 * Core Types
 * Common types and arithmetic helpers used across the crate
 */

use super::errors::{MemoryError, MemoryResult};

/// Raw native address
pub type Address = usize;

/// Round `value` up to the next multiple of `alignment` (a power of two)
///
/// Returns `None` on overflow.
#[inline]
pub fn align_up(value: u64, alignment: u64) -> Option<u64> {
    debug_assert!(alignment.is_power_of_two());
    let mask = alignment - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

/// Validate a byte alignment supplied by a caller
#[inline]
pub fn check_byte_alignment(alignment: u64) -> MemoryResult<()> {
    if alignment == 0 || !alignment.is_power_of_two() {
        return Err(MemoryError::invalid_argument(format!(
            "alignment {} is not a power of two",
            alignment
        )));
    }
    Ok(())
}

/// Convert a 64-bit byte count into a native size
#[inline]
pub fn to_native_size(value: u64) -> MemoryResult<usize> {
    usize::try_from(value).map_err(|_| {
        MemoryError::invalid_argument(format!("{} exceeds the native address width", value))
    })
}
