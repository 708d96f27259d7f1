/*!
 * Value Carriers
 * Byte order and the scalar types a value layout can be read as
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte order of a value layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the host
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        }
    }

    #[inline]
    pub fn is_native(self) -> bool {
        self == Self::native()
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LittleEndian => write!(f, "little-endian"),
            ByteOrder::BigEndian => write!(f, "big-endian"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Scalar type a value layout can be loaded into or stored from
///
/// Sealed: every implementor is valid for any bit pattern, which is what makes
/// reading it out of raw native memory sound.
pub trait Carrier: sealed::Sealed + Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Width in bits
    const BITS: u64;

    /// Type name for diagnostics
    const NAME: &'static str;

    /// Reverse the byte order of the value
    fn swap_bytes(self) -> Self;

    /// Convert between native order and `order`
    #[inline]
    fn to_order(self, order: ByteOrder) -> Self {
        if order.is_native() {
            self
        } else {
            self.swap_bytes()
        }
    }
}

macro_rules! integer_carrier {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Carrier for $ty {
                const BITS: u64 = <$ty>::BITS as u64;
                const NAME: &'static str = stringify!($ty);

                #[inline(always)]
                fn swap_bytes(self) -> Self {
                    <$ty>::swap_bytes(self)
                }
            }
        )*
    };
}

macro_rules! float_carrier {
    ($($ty:ty => $bits:expr),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Carrier for $ty {
                const BITS: u64 = $bits;
                const NAME: &'static str = stringify!($ty);

                #[inline(always)]
                fn swap_bytes(self) -> Self {
                    <$ty>::from_bits(self.to_bits().swap_bytes())
                }
            }
        )*
    };
}

integer_carrier!(u8, i8, u16, i16, u32, i32, u64, i64, usize);
float_carrier!(f32 => 32, f64 => 64);
