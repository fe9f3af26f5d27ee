/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Integer domain coordinate types.

use std::fmt::Debug;
use std::fmt::Display;

use crate::datatype::Datatype;

mod sealed {
    // Private trait — only the integer types below can implement it.
    pub trait Sealed {}
}

/// A trait for the integer types usable as array domain coordinates.
///
/// Implemented for exactly `{i8, u8, i16, u16, i32, u32, i64, u64}`;
/// floating-point and string domains are unrepresentable by
/// construction. All tiler geometry widens coordinates to `i128`, does
/// its arithmetic there, and narrows the result back. Schema validation
/// bounds every intermediate value by the tile-aligned domain, so
/// narrowing cannot lose range (see
/// [`Dimension::new`](crate::schema::Dimension::new)).
pub trait Coordinate:
    sealed::Sealed + Copy + Ord + Eq + Debug + Display + Send + Sync + 'static
{
    /// The datatype tag matching this coordinate type.
    const DATATYPE: Datatype;

    /// Widens the coordinate for geometry arithmetic.
    fn to_i128(self) -> i128;

    /// Narrows an arithmetic result back to the coordinate type.
    ///
    /// Callers must have established representability.
    fn from_i128(v: i128) -> Self;

    /// Fallible narrowing, for validating representability up front.
    fn try_from_i128(v: i128) -> Option<Self>;
}

macro_rules! impl_coordinate {
    ($($t:ty => $dt:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Coordinate for $t {
                const DATATYPE: Datatype = Datatype::$dt;

                fn to_i128(self) -> i128 {
                    self as i128
                }

                fn from_i128(v: i128) -> Self {
                    debug_assert!(
                        <$t>::try_from(v).is_ok(),
                        "coordinate {} out of range for {}",
                        v,
                        stringify!($t)
                    );
                    v as $t
                }

                fn try_from_i128(v: i128) -> Option<Self> {
                    <$t>::try_from(v).ok()
                }
            }
        )*
    };
}

impl_coordinate! {
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datatype_tags() {
        assert_eq!(<i8 as Coordinate>::DATATYPE, Datatype::Int8);
        assert_eq!(<u32 as Coordinate>::DATATYPE, Datatype::UInt32);
        assert_eq!(<i64 as Coordinate>::DATATYPE, Datatype::Int64);
    }

    #[test]
    fn test_roundtrip() {
        assert_eq!(i32::from_i128((-17i32).to_i128()), -17);
        assert_eq!(u64::from_i128(u64::MAX.to_i128()), u64::MAX);
        assert_eq!(i8::from_i128(i8::MIN.to_i128()), i8::MIN);
    }
}
