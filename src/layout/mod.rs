/*!
 * Layout Algebra
 *
 * Immutable descriptors of native data shapes: scalar values, padding,
 * sequences and groups (structs and unions). Layouts compute their size and
 * alignment, and resolve paths to offsets and typed accessors.
 *
 * Sizes and alignments are tracked in bits. Byte-based queries fail when a
 * size is not a whole number of bytes.
 */

mod accessor;
mod path;
mod value;

pub use accessor::Accessor;
pub use path::{FreeDimension, LayoutPath, PathElement};
pub use value::{ByteOrder, Carrier};

use crate::core::errors::{MemoryError, MemoryResult};
use crate::core::limits::MIN_BIT_ALIGNMENT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout and member names
pub type LayoutName = smartstring::alias::String;

/// Bit widths a value layout may have
const VALUE_WIDTHS: [u64; 4] = [8, 16, 32, 64];

/// Struct or union
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Members laid out back to back, no implicit padding
    Struct,
    /// Members overlap at offset zero
    Union,
}

/// Shape of a layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutKind {
    Value { bits: u64, order: ByteOrder },
    Padding { bits: u64 },
    Sequence {
        element: Box<Layout>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u64>,
    },
    Group { group: GroupKind, members: Vec<Layout> },
}

/// Descriptor of a native data shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(flatten)]
    kind: LayoutKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<LayoutName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bit_alignment: Option<u64>,
}

// =============================================================================
// Construction
// =============================================================================

impl Layout {
    fn from_kind(kind: LayoutKind) -> Self {
        Self {
            kind,
            name: None,
            bit_alignment: None,
        }
    }

    /// Scalar value of `bits` width (8, 16, 32 or 64)
    pub fn value(bits: u64, order: ByteOrder) -> MemoryResult<Self> {
        if !VALUE_WIDTHS.contains(&bits) {
            return Err(MemoryError::invalid_argument(format!(
                "value layouts must be 8, 16, 32 or 64 bits wide, got {}",
                bits
            )));
        }
        Ok(Self::from_kind(LayoutKind::Value { bits, order }))
    }

    /// Native-order value layout matching carrier `T`
    pub fn of<T: Carrier>() -> Self {
        Self::of_order::<T>(ByteOrder::native())
    }

    /// Value layout matching carrier `T` with an explicit byte order
    pub fn of_order<T: Carrier>(order: ByteOrder) -> Self {
        Self::from_kind(LayoutKind::Value {
            bits: T::BITS,
            order,
        })
    }

    /// Native pointer-sized value
    pub fn address() -> Self {
        Self::of::<usize>()
    }

    /// Padding of `bits` width
    pub fn padding(bits: u64) -> MemoryResult<Self> {
        if bits == 0 {
            return Err(MemoryError::invalid_argument("padding must be at least one bit"));
        }
        Ok(Self::from_kind(LayoutKind::Padding { bits }))
    }

    /// `count` repetitions of `element`
    pub fn sequence(count: u64, element: Layout) -> Self {
        Self::from_kind(LayoutKind::Sequence {
            element: Box::new(element),
            count: Some(count),
        })
    }

    /// Sequence of `element` without a count; has no size
    pub fn unbounded_sequence(element: Layout) -> Self {
        Self::from_kind(LayoutKind::Sequence {
            element: Box::new(element),
            count: None,
        })
    }

    pub fn structure(members: Vec<Layout>) -> Self {
        Self::from_kind(LayoutKind::Group {
            group: GroupKind::Struct,
            members,
        })
    }

    pub fn union(members: Vec<Layout>) -> Self {
        Self::from_kind(LayoutKind::Group {
            group: GroupKind::Union,
            members,
        })
    }

    /// Same layout with a name
    pub fn with_name(mut self, name: impl Into<LayoutName>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Same layout with an alignment override, in bits
    pub fn with_bit_alignment(mut self, bits: u64) -> MemoryResult<Self> {
        if bits < MIN_BIT_ALIGNMENT || !bits.is_power_of_two() {
            return Err(MemoryError::invalid_argument(format!(
                "alignment must be a power of two of at least {} bits, got {}",
                MIN_BIT_ALIGNMENT, bits
            )));
        }
        self.bit_alignment = Some(bits);
        Ok(self)
    }

    /// Same layout with an alignment override, in bytes
    pub fn with_byte_alignment(self, bytes: u64) -> MemoryResult<Self> {
        let bits = bytes.checked_mul(8).ok_or_else(|| {
            MemoryError::invalid_argument(format!("alignment of {} bytes overflows", bytes))
        })?;
        self.with_bit_alignment(bits)
    }

    /// Parse a layout descriptor from JSON and validate it
    pub fn from_json(json: &str) -> MemoryResult<Self> {
        let layout: Layout = serde_json::from_str(json)
            .map_err(|e| MemoryError::invalid_argument(format!("malformed layout: {}", e)))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Serialize this layout as JSON
    pub fn to_json(&self) -> MemoryResult<String> {
        serde_json::to_string(self)
            .map_err(|e| MemoryError::invalid_argument(format!("layout not serializable: {}", e)))
    }

    /// Check constructor invariants on a layout that bypassed the constructors
    pub fn validate(&self) -> MemoryResult<()> {
        if let Some(bits) = self.bit_alignment {
            if bits < MIN_BIT_ALIGNMENT || !bits.is_power_of_two() {
                return Err(MemoryError::invalid_argument(format!(
                    "alignment must be a power of two of at least {} bits, got {}",
                    MIN_BIT_ALIGNMENT, bits
                )));
            }
        }
        match &self.kind {
            LayoutKind::Value { bits, order } => Self::value(*bits, *order).map(drop),
            LayoutKind::Padding { bits } => Self::padding(*bits).map(drop),
            LayoutKind::Sequence { element, .. } => element.validate(),
            LayoutKind::Group { members, .. } => members.iter().try_for_each(Layout::validate),
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

impl Layout {
    #[inline]
    pub fn kind(&self) -> &LayoutKind {
        &self.kind
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Byte order if this is a value layout
    pub fn order(&self) -> Option<ByteOrder> {
        match self.kind {
            LayoutKind::Value { order, .. } => Some(order),
            _ => None,
        }
    }

    #[inline]
    pub fn is_value(&self) -> bool {
        matches!(self.kind, LayoutKind::Value { .. })
    }

    #[inline]
    pub fn is_padding(&self) -> bool {
        matches!(self.kind, LayoutKind::Padding { .. })
    }

    /// Element layout and count if this is a sequence
    pub fn as_sequence(&self) -> Option<(&Layout, Option<u64>)> {
        match &self.kind {
            LayoutKind::Sequence { element, count } => Some((element, *count)),
            _ => None,
        }
    }

    /// Group kind and members if this is a group
    pub fn as_group(&self) -> Option<(GroupKind, &[Layout])> {
        match &self.kind {
            LayoutKind::Group { group, members } => Some((*group, members)),
            _ => None,
        }
    }

    /// Whether the size of this layout is defined
    pub fn has_size(&self) -> bool {
        match &self.kind {
            LayoutKind::Value { .. } | LayoutKind::Padding { .. } => true,
            LayoutKind::Sequence { element, count } => count.is_some() && element.has_size(),
            LayoutKind::Group { members, .. } => members.iter().all(Layout::has_size),
        }
    }

    /// Size in bits
    ///
    /// Fails with `UnsupportedOperation` for unbounded sequences.
    pub fn bit_size(&self) -> MemoryResult<u64> {
        let overflow = || MemoryError::invalid_argument(format!("size of {} overflows", self));
        match &self.kind {
            LayoutKind::Value { bits, .. } | LayoutKind::Padding { bits } => Ok(*bits),
            LayoutKind::Sequence { element, count } => {
                let count = count.ok_or_else(|| {
                    MemoryError::unsupported(format!("unbounded sequence {} has no size", self))
                })?;
                element.bit_size()?.checked_mul(count).ok_or_else(overflow)
            }
            LayoutKind::Group {
                group: GroupKind::Struct,
                members,
            } => members.iter().try_fold(0u64, |total, member| {
                total.checked_add(member.bit_size()?).ok_or_else(overflow)
            }),
            LayoutKind::Group {
                group: GroupKind::Union,
                members,
            } => members
                .iter()
                .try_fold(0u64, |widest, member| Ok(widest.max(member.bit_size()?))),
        }
    }

    /// Size in bytes
    ///
    /// Fails with `UnsupportedOperation` when the size is undefined or not a
    /// whole number of bytes.
    pub fn byte_size(&self) -> MemoryResult<u64> {
        let bits = self.bit_size()?;
        if bits % 8 != 0 {
            return Err(MemoryError::unsupported(format!(
                "{} is {} bits, not a whole number of bytes",
                self, bits
            )));
        }
        Ok(bits / 8)
    }

    /// Alignment in bits: the override if any, else the natural alignment
    pub fn bit_alignment(&self) -> u64 {
        self.bit_alignment
            .unwrap_or_else(|| self.natural_bit_alignment())
    }

    /// Alignment in bytes
    #[inline]
    pub fn byte_alignment(&self) -> u64 {
        self.bit_alignment() / 8
    }

    fn natural_bit_alignment(&self) -> u64 {
        match &self.kind {
            LayoutKind::Value { bits, .. } => *bits,
            LayoutKind::Padding { bits } => {
                if bits.is_power_of_two() && *bits >= MIN_BIT_ALIGNMENT {
                    *bits
                } else {
                    MIN_BIT_ALIGNMENT
                }
            }
            LayoutKind::Sequence { element, .. } => element.bit_alignment(),
            LayoutKind::Group { members, .. } => members
                .iter()
                .map(Layout::bit_alignment)
                .fold(MIN_BIT_ALIGNMENT, u64::max),
        }
    }

    /// Whether the effective alignment equals the natural one
    pub fn has_natural_alignment(&self) -> bool {
        self.bit_alignment
            .map_or(true, |bits| bits == self.natural_bit_alignment())
    }
}

// =============================================================================
// Paths
// =============================================================================

impl Layout {
    /// Resolve `elements` against this layout
    pub fn path(&self, elements: &[PathElement]) -> MemoryResult<LayoutPath> {
        LayoutPath::resolve(self, elements)
    }

    /// Bit offset of the layout selected by `elements`
    ///
    /// Free dimensions count as index zero.
    pub fn bit_offset(&self, elements: &[PathElement]) -> MemoryResult<u64> {
        Ok(self.path(elements)?.bit_offset())
    }

    /// Byte offset of the layout selected by `elements`
    pub fn byte_offset(&self, elements: &[PathElement]) -> MemoryResult<u64> {
        self.path(elements)?.byte_offset()
    }

    /// Layout selected by `elements`
    pub fn select(&self, elements: &[PathElement]) -> MemoryResult<Layout> {
        Ok(self.path(elements)?.layout().clone())
    }

    /// Typed accessor for the value selected by `elements`
    pub fn accessor<T: Carrier>(&self, elements: &[PathElement]) -> MemoryResult<Accessor<T>> {
        Accessor::new(self.path(elements)?)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_natural_alignment() {
            write!(f, "{}%", self.bit_alignment())?;
        }
        match &self.kind {
            LayoutKind::Value { bits, order } => match order {
                ByteOrder::LittleEndian => write!(f, "b{}", bits)?,
                ByteOrder::BigEndian => write!(f, "B{}", bits)?,
            },
            LayoutKind::Padding { bits } => write!(f, "x{}", bits)?,
            LayoutKind::Sequence { element, count } => match count {
                Some(count) => write!(f, "[{}:{}]", count, element)?,
                None => write!(f, "[:{}]", element)?,
            },
            LayoutKind::Group { group, members } => {
                let separator = match group {
                    GroupKind::Struct => "",
                    GroupKind::Union => "|",
                };
                write!(f, "[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    write!(f, "{}", member)?;
                }
                write!(f, "]")?;
            }
        }
        if let Some(name) = &self.name {
            write!(f, "({})", name)?;
        }
        Ok(())
    }
}
