/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Dense tile production for N-dimensional array writes.
//!
//! Given a dense subarray write — one contiguous source buffer per
//! attribute — [`DenseTiler`] decomposes the write into fixed-shape
//! tiles aligned to the array's global tile grid and materializes each
//! (tile id, attribute) pair as a complete tile payload: cells outside
//! the subarray carry the attribute's fill value, cells inside it are
//! copied from the source buffer with as few large contiguous copies
//! as the cell orders allow.
//!
//! The tiler borrows its [`ArraySchema`], [`Subarray`], and
//! [`QueryBuffer`] map for the duration of one write and is read-only
//! after construction; tiles for distinct ids may be produced in
//! parallel, each into its own destination [`Tile`].

pub mod coordinate;
pub mod datatype;
pub mod layout;
pub mod query;
pub mod schema;
pub mod subarray;
pub mod tile;
pub mod tiler;

#[cfg(test)]
pub mod strategy;

pub use crate::coordinate::Coordinate;
pub use crate::datatype::Datatype;
pub use crate::layout::Layout;
pub use crate::query::QueryBuffer;
pub use crate::schema::ArraySchema;
pub use crate::schema::Attribute;
pub use crate::schema::Dimension;
pub use crate::schema::SchemaError;
pub use crate::subarray::Subarray;
pub use crate::tile::Tile;
pub use crate::tile::TileError;
pub use crate::tiler::CopyPlan;
pub use crate::tiler::DenseTiler;
pub use crate::tiler::DenseTilerError;
