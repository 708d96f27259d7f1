/*!
 * Layout Paths
 *
 * A path walks from a root layout into nested members and elements. Each
 * selector either fixes an offset statically (`ByName`, `ByIndex`) or opens
 * a free dimension whose index is supplied later (`ByRange`, `Unbound`).
 */

use super::{GroupKind, Layout, LayoutName};
use crate::core::errors::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a layout path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathElement {
    /// Group member with the given name
    ByName(LayoutName),
    /// Sequence element at a fixed index
    ByIndex(u64),
    /// Sequence elements `start, start + step, ...`; adds one free dimension
    ByRange { start: u64, step: i64 },
    /// Every sequence element; adds one free dimension
    Unbound,
}

impl PathElement {
    pub fn name(name: impl Into<LayoutName>) -> Self {
        PathElement::ByName(name.into())
    }

    pub fn index(index: u64) -> Self {
        PathElement::ByIndex(index)
    }

    pub fn range(start: u64, step: i64) -> Self {
        PathElement::ByRange { start, step }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::ByName(name) => write!(f, ".{}", name),
            PathElement::ByIndex(index) => write!(f, "[{}]", index),
            PathElement::ByRange { start, step } => write!(f, "[{}::{}]", start, step),
            PathElement::Unbound => write!(f, "[*]"),
        }
    }
}

/// Free dimension opened by a range or unbound selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeDimension {
    /// Distance between consecutive indices, in bits; negative for reverse ranges
    pub stride_bits: i64,
    /// Number of valid indices, `None` over an unbounded sequence
    pub bound: Option<u64>,
}

/// Resolved path: the selected layout, its static offset and free dimensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPath {
    elements: Vec<PathElement>,
    selected: Layout,
    bit_offset: u64,
    dimensions: Vec<FreeDimension>,
}

impl LayoutPath {
    /// Walk `elements` from `root`
    pub fn resolve(root: &Layout, elements: &[PathElement]) -> MemoryResult<Self> {
        let mut current = root;
        let mut bit_offset = 0u64;
        let mut dimensions = Vec::new();

        for element in elements {
            let (next, offset) = match element {
                PathElement::ByName(name) => select_member(current, name)?,
                PathElement::ByIndex(index) => {
                    let (item, count, item_bits) = sequence_parts(current, element)?;
                    if let Some(count) = count {
                        if *index >= count {
                            return Err(MemoryError::invalid_argument(format!(
                                "index {} out of bounds for {}",
                                index, current
                            )));
                        }
                    }
                    let offset = item_bits.checked_mul(*index).ok_or_else(|| overflow(current))?;
                    (item, offset)
                }
                PathElement::ByRange { start, step } => {
                    let (item, count, item_bits) = sequence_parts(current, element)?;
                    if *step == 0 {
                        return Err(MemoryError::invalid_argument("range step must not be zero"));
                    }
                    let bound = match count {
                        Some(count) if *start >= count => {
                            return Err(MemoryError::invalid_argument(format!(
                                "range start {} out of bounds for {}",
                                start, current
                            )))
                        }
                        Some(count) => Some(range_len(*start, *step, count)),
                        None => None,
                    };
                    let stride_bits = i64::try_from(item_bits)
                        .ok()
                        .and_then(|bits| bits.checked_mul(*step))
                        .ok_or_else(|| overflow(current))?;
                    dimensions.push(FreeDimension { stride_bits, bound });
                    let offset = item_bits.checked_mul(*start).ok_or_else(|| overflow(current))?;
                    (item, offset)
                }
                PathElement::Unbound => {
                    let (item, count, item_bits) = sequence_parts(current, element)?;
                    let stride_bits = i64::try_from(item_bits).map_err(|_| overflow(current))?;
                    dimensions.push(FreeDimension {
                        stride_bits,
                        bound: count,
                    });
                    (item, 0)
                }
            };
            bit_offset = bit_offset.checked_add(offset).ok_or_else(|| overflow(root))?;
            current = next;
        }

        Ok(Self {
            elements: elements.to_vec(),
            selected: current.clone(),
            bit_offset,
            dimensions,
        })
    }

    /// The layout the path ends at
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.selected
    }

    #[inline]
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Static bit offset, free dimensions taken at index zero
    #[inline]
    pub fn bit_offset(&self) -> u64 {
        self.bit_offset
    }

    /// Static byte offset
    pub fn byte_offset(&self) -> MemoryResult<u64> {
        to_bytes(self.bit_offset)
    }

    #[inline]
    pub fn free_dimensions(&self) -> &[FreeDimension] {
        &self.dimensions
    }

    /// Bit offset with one coordinate per free dimension, left to right
    pub fn offset_at(&self, coordinates: &[u64]) -> MemoryResult<u64> {
        if coordinates.len() != self.dimensions.len() {
            return Err(MemoryError::invalid_argument(format!(
                "path has {} free dimension(s), got {} coordinate(s)",
                self.dimensions.len(),
                coordinates.len()
            )));
        }

        let mut offset = i128::from(self.bit_offset);
        for (dimension, &coordinate) in self.dimensions.iter().zip(coordinates) {
            if let Some(bound) = dimension.bound {
                if coordinate >= bound {
                    return Err(MemoryError::invalid_argument(format!(
                        "coordinate {} out of bounds for dimension of {}",
                        coordinate, bound
                    )));
                }
            }
            offset += i128::from(coordinate) * i128::from(dimension.stride_bits);
        }

        u64::try_from(offset).map_err(|_| {
            MemoryError::invalid_argument(format!(
                "coordinates {:?} resolve outside the addressable range",
                coordinates
            ))
        })
    }

    /// Byte offset with one coordinate per free dimension
    pub fn byte_offset_at(&self, coordinates: &[u64]) -> MemoryResult<u64> {
        to_bytes(self.offset_at(coordinates)?)
    }
}

impl fmt::Display for LayoutPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

fn overflow(layout: &Layout) -> MemoryError {
    MemoryError::invalid_argument(format!("offset into {} overflows", layout))
}

fn to_bytes(bits: u64) -> MemoryResult<u64> {
    if bits % 8 != 0 {
        return Err(MemoryError::unsupported(format!(
            "bit offset {} is not a whole number of bytes",
            bits
        )));
    }
    Ok(bits / 8)
}

/// Number of indices in `start, start + step, ...` within `0..count`
fn range_len(start: u64, step: i64, count: u64) -> u64 {
    let magnitude = step.unsigned_abs();
    if step > 0 {
        (count - start).div_ceil(magnitude)
    } else {
        start / magnitude + 1
    }
}

fn select_member<'a>(current: &'a Layout, name: &str) -> MemoryResult<(&'a Layout, u64)> {
    let (group, members) = current.as_group().ok_or_else(|| {
        MemoryError::invalid_state(format!(
            "cannot select member '{}' of non-group layout {}",
            name, current
        ))
    })?;

    let mut offset = 0u64;
    for member in members {
        if member.name() == Some(name) {
            return Ok((member, offset));
        }
        if group == GroupKind::Struct {
            offset = offset
                .checked_add(member.bit_size()?)
                .ok_or_else(|| overflow(current))?;
        }
    }

    Err(MemoryError::invalid_argument(format!(
        "no member named '{}' in {}",
        name, current
    )))
}

fn sequence_parts<'a>(
    current: &'a Layout,
    element: &PathElement,
) -> MemoryResult<(&'a Layout, Option<u64>, u64)> {
    let (item, count) = current.as_sequence().ok_or_else(|| {
        MemoryError::invalid_state(format!(
            "cannot apply {} to non-sequence layout {}",
            element, current
        ))
    })?;
    Ok((item, count, item.bit_size()?))
}
