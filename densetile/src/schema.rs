/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Array schemas: dimensions, attributes, and cell orders.
//!
//! An [`ArraySchema`] fixes the geometry a dense write is tiled
//! against: the inclusive domain and tile extent of every dimension,
//! the order of cells within a tile, the order of tiles within the
//! tile grid, and the cell size and fill value of every attribute.
//! Schemas are validated on construction and immutable afterwards.

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::coordinate::Coordinate;
use crate::datatype::Datatype;
use crate::layout::Layout;

/// Errors arising from schema and subarray construction.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid domain [{lo}, {hi}] for dimension '{name}': lo exceeds hi")]
    EmptyDomain { name: String, lo: String, hi: String },

    #[error("invalid tile extent for dimension '{name}': extent must be positive")]
    InvalidExtent { name: String },

    #[error("domain of dimension '{name}' cannot be tile-aligned without overflow")]
    DomainOverflow { name: String },

    #[error("duplicate name '{0}' in schema")]
    DuplicateName(String),

    #[error("attribute '{0}' must have at least one value per cell")]
    InvalidCellValNum(String),

    #[error("fill value for attribute '{name}' has {got} bytes, expected {expected}")]
    FillValueSize {
        name: String,
        got: u64,
        expected: u64,
    },

    #[error("schema must have at least one dimension")]
    NoDimensions,

    #[error("schema must have at least one attribute")]
    NoAttributes,

    #[error("'{0}' is not an attribute of the schema")]
    NotAnAttribute(String),

    #[error("subarray must have exactly {expected} ranges, got {got}")]
    RangeCountMismatch { expected: usize, got: usize },

    #[error("invalid range [{lo}, {hi}] on dimension '{name}': lo exceeds hi")]
    InvalidRange { name: String, lo: String, hi: String },

    #[error("range [{lo}, {hi}] out of domain bounds on dimension '{name}'")]
    RangeOutOfDomain { name: String, lo: String, hi: String },
}

/// A single array dimension: an inclusive domain and a tile extent.
///
/// The tile grid is anchored at the domain low corner; the last tile
/// spans a full extent even when the domain ends mid-tile. Validation
/// therefore requires the high edge of that last tile to stay
/// representable in `T`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Dimension<T> {
    name: String,
    domain: [T; 2],
    extent: T,
}

impl<T: Coordinate> Dimension<T> {
    pub fn new(name: impl Into<String>, domain: [T; 2], extent: T) -> Result<Self, SchemaError> {
        let name = name.into();
        let lo = domain[0].to_i128();
        let hi = domain[1].to_i128();
        let ext = extent.to_i128();
        if lo > hi {
            return Err(SchemaError::EmptyDomain {
                name,
                lo: domain[0].to_string(),
                hi: domain[1].to_string(),
            });
        }
        if ext < 1 {
            return Err(SchemaError::InvalidExtent { name });
        }
        let tiles = (hi - lo + 1 + ext - 1) / ext;
        let aligned_hi = lo + tiles * ext - 1;
        if T::try_from_i128(aligned_hi).is_none() {
            return Err(SchemaError::DomainOverflow { name });
        }
        Ok(Self {
            name,
            domain,
            extent,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> [T; 2] {
        self.domain
    }

    pub fn extent(&self) -> T {
        self.extent
    }

    /// Tile extent as an element count.
    pub fn extent_el(&self) -> u64 {
        self.extent.to_i128() as u64
    }

    /// Inclusive width of the domain, in cells.
    pub fn domain_extent(&self) -> u64 {
        (self.domain[1].to_i128() - self.domain[0].to_i128() + 1) as u64
    }

    /// Number of tiles of the grid that a coordinate range intersects.
    pub fn tile_num_in_range(&self, range: [T; 2]) -> u64 {
        let dom_lo = self.domain[0].to_i128();
        let ext = self.extent.to_i128();
        let first = (range[0].to_i128() - dom_lo) / ext;
        let last = (range[1].to_i128() - dom_lo) / ext;
        (last - first + 1) as u64
    }
}

/// A fixed-size or var-sized array attribute.
///
/// The cell size of a fixed-size attribute is
/// `cell_val_num * datatype.size()`. The fill value defaults to the
/// datatype's fill repeated per value; a custom fill must match the
/// cell size exactly.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    datatype: Datatype,
    cell_val_num: u64,
    fill: Vec<u8>,
    var_size: bool,
}

impl Attribute {
    /// A fixed-size attribute with one value per cell.
    pub fn new(name: impl Into<String>, datatype: Datatype) -> Self {
        let name = name.into();
        Self {
            name,
            datatype,
            cell_val_num: 1,
            fill: datatype.default_fill(),
            var_size: false,
        }
    }

    /// A fixed-size attribute with `cell_val_num` values per cell.
    pub fn with_cell_val_num(
        name: impl Into<String>,
        datatype: Datatype,
        cell_val_num: u64,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        if cell_val_num < 1 {
            return Err(SchemaError::InvalidCellValNum(name));
        }
        let fill = datatype
            .default_fill()
            .iter()
            .copied()
            .cycle()
            .take((cell_val_num * datatype.size()) as usize)
            .collect();
        Ok(Self {
            name,
            datatype,
            cell_val_num,
            fill,
            var_size: false,
        })
    }

    /// A var-sized attribute. Declarable, but dense tiling of var-sized
    /// cells is not supported and `get_tile` rejects it.
    pub fn var_sized(name: impl Into<String>, datatype: Datatype) -> Self {
        let name = name.into();
        Self {
            name,
            datatype,
            cell_val_num: 1,
            fill: datatype.default_fill(),
            var_size: true,
        }
    }

    /// Replaces the fill value; must be exactly one cell in size.
    pub fn set_fill_value(&mut self, fill: Vec<u8>) -> Result<(), SchemaError> {
        if fill.len() as u64 != self.cell_size() {
            return Err(SchemaError::FillValueSize {
                name: self.name.clone(),
                got: fill.len() as u64,
                expected: self.cell_size(),
            });
        }
        self.fill = fill;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    pub fn cell_val_num(&self) -> u64 {
        self.cell_val_num
    }

    pub fn var_size(&self) -> bool {
        self.var_size
    }

    /// Size of one cell of this attribute, in bytes.
    pub fn cell_size(&self) -> u64 {
        self.cell_val_num * self.datatype.size()
    }

    pub fn fill_value(&self) -> &[u8] {
        &self.fill
    }
}

/// A dense array schema over coordinate type `T`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArraySchema<T> {
    dimensions: Vec<Dimension<T>>,
    attributes: Vec<Attribute>,
    tile_order: Layout,
    cell_order: Layout,
}

impl<T: Coordinate> ArraySchema<T> {
    /// Creates a schema. Dimension and attribute names must be unique
    /// across both sets, and at least one of each must be present.
    pub fn new(
        dimensions: Vec<Dimension<T>>,
        attributes: Vec<Attribute>,
        tile_order: Layout,
        cell_order: Layout,
    ) -> Result<Self, SchemaError> {
        if dimensions.is_empty() {
            return Err(SchemaError::NoDimensions);
        }
        if attributes.is_empty() {
            return Err(SchemaError::NoAttributes);
        }
        let mut names: Vec<&str> = dimensions
            .iter()
            .map(|d| d.name())
            .chain(attributes.iter().map(|a| a.name()))
            .collect();
        names.sort_unstable();
        for pair in names.windows(2) {
            if pair[0] == pair[1] {
                return Err(SchemaError::DuplicateName(pair[0].to_string()));
            }
        }
        Ok(Self {
            dimensions,
            attributes,
            tile_order,
            cell_order,
        })
    }

    pub fn dim_num(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimension(&self, d: usize) -> &Dimension<T> {
        &self.dimensions[d]
    }

    pub fn dimensions(&self) -> &[Dimension<T>] {
        &self.dimensions
    }

    /// Order of tiles within the tile grid.
    pub fn tile_order(&self) -> Layout {
        self.tile_order
    }

    /// Order of cells within a tile.
    pub fn cell_order(&self) -> Layout {
        self.cell_order
    }

    pub fn domain(&self, d: usize) -> [T; 2] {
        self.dimensions[d].domain()
    }

    pub fn tile_extent(&self, d: usize) -> T {
        self.dimensions[d].extent()
    }

    /// Number of cells in one tile.
    pub fn cells_per_tile(&self) -> u64 {
        self.dimensions.iter().map(|d| d.extent_el()).product()
    }

    /// Number of tiles of the grid intersecting an N-D range.
    pub fn tile_num_in_range(&self, range: &[[T; 2]]) -> u64 {
        self.dimensions
            .iter()
            .zip(range)
            .map(|(dim, r)| dim.tile_num_in_range(*r))
            .product()
    }

    pub fn is_attr(&self, name: &str) -> bool {
        self.find_attribute(name).is_some()
    }

    pub fn find_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    pub fn attribute(&self, name: &str) -> Result<&Attribute, SchemaError> {
        self.find_attribute(name)
            .ok_or_else(|| SchemaError::NotAnAttribute(name.to_string()))
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn cell_size(&self, name: &str) -> Result<u64, SchemaError> {
        Ok(self.attribute(name)?.cell_size())
    }

    pub fn datatype(&self, name: &str) -> Result<Datatype, SchemaError> {
        Ok(self.attribute(name)?.datatype())
    }

    pub fn var_size(&self, name: &str) -> Result<bool, SchemaError> {
        Ok(self.attribute(name)?.var_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_1d() -> ArraySchema<i32> {
        ArraySchema::new(
            vec![Dimension::new("d", [1, 10], 5).unwrap()],
            vec![Attribute::new("a", Datatype::Int32)],
            Layout::RowMajor,
            Layout::RowMajor,
        )
        .unwrap()
    }

    #[test]
    fn test_dimension_validation() {
        assert!(matches!(
            Dimension::new("d", [5, 1], 2),
            Err(SchemaError::EmptyDomain { .. })
        ));
        assert!(matches!(
            Dimension::new("d", [1, 5], 0),
            Err(SchemaError::InvalidExtent { .. })
        ));
        assert!(matches!(
            Dimension::new("d", [1i32, 5], -3),
            Err(SchemaError::InvalidExtent { .. })
        ));
        // [120, 127] with extent 6 needs two tiles; the second ends at
        // 131, past i8::MAX.
        assert!(matches!(
            Dimension::new("d", [120i8, 127], 6),
            Err(SchemaError::DomainOverflow { .. })
        ));
        // A single exact tile at the top of the range is fine.
        assert!(Dimension::new("d", [120i8, 127], 8).is_ok());
    }

    #[test]
    fn test_tile_num_in_range() {
        let dim = Dimension::new("d", [1, 10], 5).unwrap();
        assert_eq!(dim.tile_num_in_range([3, 6]), 2);
        assert_eq!(dim.tile_num_in_range([6, 9]), 1);
        assert_eq!(dim.tile_num_in_range([1, 10]), 2);

        let dim = Dimension::new("d", [-4, 5], 5).unwrap();
        assert_eq!(dim.tile_num_in_range([-2, 1]), 2);
    }

    #[test]
    fn test_attribute_cell_size_and_fill() {
        let a = Attribute::new("a", Datatype::Int32);
        assert_eq!(a.cell_size(), 4);
        assert_eq!(a.fill_value(), i32::MIN.to_le_bytes());

        let b = Attribute::with_cell_val_num("b", Datatype::Int32, 2).unwrap();
        assert_eq!(b.cell_size(), 8);
        assert_eq!(b.fill_value().len(), 8);

        let mut c = Attribute::new("c", Datatype::Int32);
        assert!(matches!(
            c.set_fill_value(vec![0u8; 3]),
            Err(SchemaError::FillValueSize { .. })
        ));
        c.set_fill_value(7i32.to_le_bytes().to_vec()).unwrap();
        assert_eq!(c.fill_value(), 7i32.to_le_bytes());
    }

    #[test]
    fn test_schema_validation() {
        assert!(matches!(
            ArraySchema::<i32>::new(
                vec![],
                vec![Attribute::new("a", Datatype::Int32)],
                Layout::RowMajor,
                Layout::RowMajor,
            ),
            Err(SchemaError::NoDimensions)
        ));
        assert!(matches!(
            ArraySchema::new(
                vec![Dimension::new("a", [1, 10], 5).unwrap()],
                vec![Attribute::new("a", Datatype::Int32)],
                Layout::RowMajor,
                Layout::RowMajor,
            ),
            Err(SchemaError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_schema_accessors() {
        let schema = schema_1d();
        assert_eq!(schema.dim_num(), 1);
        assert_eq!(schema.cells_per_tile(), 5);
        assert_eq!(schema.tile_num_in_range(&[[3, 6]]), 2);
        assert!(schema.is_attr("a"));
        assert!(!schema.is_attr("foo"));
        assert_eq!(schema.cell_size("a").unwrap(), 4);
        assert!(matches!(
            schema.cell_size("foo"),
            Err(SchemaError::NotAnAttribute(_))
        ));
    }
}
