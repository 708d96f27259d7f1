/*!
 * Typed Accessors
 * Load and store a carrier through a resolved layout path
 */

use super::path::{FreeDimension, LayoutPath};
use super::{ByteOrder, Carrier, LayoutKind};
use crate::core::errors::{MemoryError, MemoryResult};
use crate::segment::Segment;
use std::fmt;
use std::marker::PhantomData;

/// Reads and writes values of carrier `T` at the location a path selects
///
/// Takes one coordinate per free dimension of the path, left to right.
pub struct Accessor<T: Carrier> {
    path: LayoutPath,
    order: ByteOrder,
    byte_alignment: u64,
    _carrier: PhantomData<fn() -> T>,
}

impl<T: Carrier> Accessor<T> {
    pub(super) fn new(path: LayoutPath) -> MemoryResult<Self> {
        let layout = path.layout();
        let (bits, order) = match layout.kind() {
            LayoutKind::Value { bits, order } => (*bits, *order),
            _ => {
                return Err(MemoryError::invalid_argument(format!(
                    "path {} selects non-value layout {}",
                    path, layout
                )))
            }
        };
        if bits != T::BITS {
            return Err(MemoryError::invalid_argument(format!(
                "carrier {} ({} bits) does not match layout {}",
                T::NAME,
                T::BITS,
                layout
            )));
        }

        let alignment = layout.bit_alignment();
        if path.bit_offset() % alignment != 0 {
            return Err(MemoryError::invalid_argument(format!(
                "offset {} bits of path {} is incompatible with alignment {}",
                path.bit_offset(),
                path,
                alignment
            )));
        }
        if let Some(FreeDimension { stride_bits, .. }) = path
            .free_dimensions()
            .iter()
            .find(|dimension| dimension.stride_bits.unsigned_abs() % alignment != 0)
        {
            return Err(MemoryError::invalid_argument(format!(
                "stride {} bits of path {} is incompatible with alignment {}",
                stride_bits, path, alignment
            )));
        }

        Ok(Self {
            order,
            byte_alignment: alignment / 8,
            path,
            _carrier: PhantomData,
        })
    }

    /// Number of coordinates each access takes
    #[inline]
    pub fn coordinates(&self) -> usize {
        self.path.free_dimensions().len()
    }

    #[inline]
    pub fn path(&self) -> &LayoutPath {
        &self.path
    }

    #[inline]
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn get(&self, segment: &Segment, coordinates: &[u64]) -> MemoryResult<T> {
        let offset = self.path.byte_offset_at(coordinates)?;
        segment.read_value(offset, self.order, self.byte_alignment)
    }

    pub fn set(&self, segment: &Segment, coordinates: &[u64], value: T) -> MemoryResult<()> {
        let offset = self.path.byte_offset_at(coordinates)?;
        segment.write_value(offset, self.order, self.byte_alignment, value)
    }
}

impl<T: Carrier> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            order: self.order,
            byte_alignment: self.byte_alignment,
            _carrier: PhantomData,
        }
    }
}

impl<T: Carrier> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("carrier", &T::NAME)
            .field("path", &self.path.to_string())
            .field("layout", &self.path.layout().to_string())
            .field("coordinates", &self.coordinates())
            .finish()
    }
}
