/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Unary N-dimensional subarrays.

use crate::coordinate::Coordinate;
use crate::layout::Layout;
use crate::schema::ArraySchema;
use crate::schema::SchemaError;

/// A single rectangular region of interest within an array's domain,
/// with one inclusive range per dimension and a traversal order for
/// the source buffer laid out over it.
///
/// A subarray borrows the schema it was validated against, so its
/// geometry can never drift from the array's. Dense writes are
/// restricted to exactly one range per dimension.
#[derive(Clone, Debug)]
pub struct Subarray<'a, T> {
    schema: &'a ArraySchema<T>,
    ranges: Vec<[T; 2]>,
    layout: Layout,
}

impl<'a, T: Coordinate> Subarray<'a, T> {
    /// Creates a subarray, checking one range per dimension, range
    /// ordering, and containment in the domain.
    pub fn new(
        schema: &'a ArraySchema<T>,
        ranges: Vec<[T; 2]>,
        layout: Layout,
    ) -> Result<Self, SchemaError> {
        if ranges.len() != schema.dim_num() {
            return Err(SchemaError::RangeCountMismatch {
                expected: schema.dim_num(),
                got: ranges.len(),
            });
        }
        for (dim, range) in schema.dimensions().iter().zip(&ranges) {
            if range[0] > range[1] {
                return Err(SchemaError::InvalidRange {
                    name: dim.name().to_string(),
                    lo: range[0].to_string(),
                    hi: range[1].to_string(),
                });
            }
            let domain = dim.domain();
            if range[0] < domain[0] || range[1] > domain[1] {
                return Err(SchemaError::RangeOutOfDomain {
                    name: dim.name().to_string(),
                    lo: range[0].to_string(),
                    hi: range[1].to_string(),
                });
            }
        }
        Ok(Self {
            schema,
            ranges,
            layout,
        })
    }

    pub fn schema(&self) -> &'a ArraySchema<T> {
        self.schema
    }

    /// Traversal order of the source buffers over this subarray.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// The unary N-D range, one `[lo, hi]` per dimension.
    pub fn ndrange(&self) -> &[[T; 2]] {
        &self.ranges
    }

    pub fn range(&self, d: usize) -> [T; 2] {
        self.ranges[d]
    }

    /// Number of cells in the subarray.
    pub fn cell_num(&self) -> u64 {
        self.ranges
            .iter()
            .map(|r| (r[1].to_i128() - r[0].to_i128() + 1) as u64)
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::Datatype;
    use crate::schema::Attribute;
    use crate::schema::Dimension;

    fn schema_2d() -> ArraySchema<i32> {
        ArraySchema::new(
            vec![
                Dimension::new("d1", [1, 10], 5).unwrap(),
                Dimension::new("d2", [1, 30], 10).unwrap(),
            ],
            vec![Attribute::new("a", Datatype::Int32)],
            Layout::RowMajor,
            Layout::RowMajor,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_subarray() {
        let schema = schema_2d();
        let sub = Subarray::new(&schema, vec![[4, 6], [18, 22]], Layout::RowMajor).unwrap();
        assert_eq!(sub.cell_num(), 15);
        assert_eq!(sub.range(1), [18, 22]);
        assert_eq!(sub.layout(), Layout::RowMajor);
    }

    #[test]
    fn test_invalid_subarrays() {
        let schema = schema_2d();
        assert!(matches!(
            Subarray::new(&schema, vec![[4, 6]], Layout::RowMajor),
            Err(SchemaError::RangeCountMismatch { .. })
        ));
        assert!(matches!(
            Subarray::new(&schema, vec![[6, 4], [18, 22]], Layout::RowMajor),
            Err(SchemaError::InvalidRange { .. })
        ));
        assert!(matches!(
            Subarray::new(&schema, vec![[4, 6], [18, 31]], Layout::RowMajor),
            Err(SchemaError::RangeOutOfDomain { .. })
        ));
    }
}
