/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Cell datatypes.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// The type of a single cell value, for attributes and dimensions.
///
/// Only fixed-width numeric types participate in dense tiling.
/// Dimensions are further restricted to the integral variants; see
/// [`Coordinate`](crate::coordinate::Coordinate).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Datatype {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl Datatype {
    /// Size of one value of this type, in bytes.
    pub fn size(&self) -> u64 {
        match self {
            Datatype::Int8 | Datatype::UInt8 => 1,
            Datatype::Int16 | Datatype::UInt16 => 2,
            Datatype::Int32 | Datatype::UInt32 | Datatype::Float32 => 4,
            Datatype::Int64 | Datatype::UInt64 | Datatype::Float64 => 8,
        }
    }

    /// Whether this type can serve as an array domain coordinate.
    pub fn is_integral(&self) -> bool {
        !matches!(self, Datatype::Float32 | Datatype::Float64)
    }

    /// The default fill value for one cell value of this type: the
    /// minimum representable value for integral types, NaN for floats.
    pub fn default_fill(&self) -> Vec<u8> {
        match self {
            Datatype::Int8 => i8::MIN.to_le_bytes().to_vec(),
            Datatype::UInt8 => u8::MIN.to_le_bytes().to_vec(),
            Datatype::Int16 => i16::MIN.to_le_bytes().to_vec(),
            Datatype::UInt16 => u16::MIN.to_le_bytes().to_vec(),
            Datatype::Int32 => i32::MIN.to_le_bytes().to_vec(),
            Datatype::UInt32 => u32::MIN.to_le_bytes().to_vec(),
            Datatype::Int64 => i64::MIN.to_le_bytes().to_vec(),
            Datatype::UInt64 => u64::MIN.to_le_bytes().to_vec(),
            Datatype::Float32 => f32::NAN.to_le_bytes().to_vec(),
            Datatype::Float64 => f64::NAN.to_le_bytes().to_vec(),
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Datatype::Int8 => "int8",
            Datatype::UInt8 => "uint8",
            Datatype::Int16 => "int16",
            Datatype::UInt16 => "uint16",
            Datatype::Int32 => "int32",
            Datatype::UInt32 => "uint32",
            Datatype::Int64 => "int64",
            Datatype::UInt64 => "uint64",
            Datatype::Float32 => "float32",
            Datatype::Float64 => "float64",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(Datatype::Int8.size(), 1);
        assert_eq!(Datatype::UInt16.size(), 2);
        assert_eq!(Datatype::Int32.size(), 4);
        assert_eq!(Datatype::Float32.size(), 4);
        assert_eq!(Datatype::UInt64.size(), 8);
        assert_eq!(Datatype::Float64.size(), 8);
    }

    #[test]
    fn test_default_fill() {
        assert_eq!(Datatype::Int32.default_fill(), i32::MIN.to_le_bytes());
        assert_eq!(Datatype::UInt8.default_fill(), vec![0u8]);
        let fill = Datatype::Float64.default_fill();
        assert!(f64::from_le_bytes(fill.try_into().unwrap()).is_nan());
    }

    #[test]
    fn test_integral() {
        assert!(Datatype::Int64.is_integral());
        assert!(!Datatype::Float32.is_integral());
    }
}
