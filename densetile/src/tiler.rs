/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Dense tile production.
//!
//! [`DenseTiler`] decomposes one dense subarray write — a single
//! contiguous source buffer per attribute — into fixed-shape tiles
//! aligned to the array's global tile grid. For each (tile id,
//! attribute) pair it materializes a complete tile: cells outside the
//! subarray carry the attribute's fill value, cells inside it are
//! copied from the source buffer.
//!
//! Three coordinate systems meet here: global domain coordinates,
//! subarray-relative buffer offsets, and tile-local offsets, under a
//! cell order and a subarray traversal order that may differ. The
//! tiler precomputes all order-dependent geometry once, at
//! construction:
//!
//! - the number of grid tiles intersecting the subarray;
//! - the grid coordinates of the first intersecting tile;
//! - element strides within a tile (cell order over tile extents);
//! - element strides within the source buffer (subarray order over
//!   subarray extents);
//! - mixed-radix place values converting a linear tile id to grid
//!   coordinates (tile order over per-dimension tile counts).
//!
//! Per tile, a [`CopyPlan`] reduces the overlap between the tile and
//! the subarray to one contiguous run length plus an N-D iteration
//! box over the dimensions that could not be fused. A dimension is
//! absorbed into the run only when the overlap spans both the full
//! tile extent and the full subarray range along it, so both sides of
//! the copy stay contiguous across that dimension's boundary. The
//! materializer then issues one contiguous write per innermost
//! iteration — the coarsest grain at which source and destination are
//! both stride-free.
//!
//! After construction the tiler is read-only; callers may produce
//! tiles for distinct ids in parallel, each with its own destination
//! tile.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::coordinate::Coordinate;
use crate::layout::Layout;
use crate::query::QueryBuffer;
use crate::schema::ArraySchema;
use crate::schema::Attribute;
use crate::subarray::Subarray;
use crate::tile::FORMAT_VERSION;
use crate::tile::Tile;
use crate::tile::TileError;

/// Cells painted per batch when filling a tile with its fill value.
/// An implementation knob, not a contract.
const FILL_BATCH_CELLS: u64 = 1_000_000;

/// Errors surfaced by [`DenseTiler`].
#[derive(Debug, Error)]
pub enum DenseTilerError {
    #[error("invalid tile id: {id} out of range [0, {tile_num})")]
    InvalidTileId { id: u64, tile_num: u64 },

    #[error("'{0}' is not an attribute")]
    UnknownAttribute(String),

    #[error("'{0}' is not a fixed-sized attribute")]
    VarSizedNotSupported(String),

    #[error("query buffer for '{0}' does not comply with the array schema")]
    SchemaMismatch(String),

    #[error("no query buffer set for attribute '{0}'")]
    MissingBuffer(String),

    #[error("cannot initialize tile for attribute '{name}'")]
    TileInit {
        name: String,
        #[source]
        source: TileError,
    },

    #[error("cannot write tile for attribute '{name}'")]
    TileWrite {
        name: String,
        #[source]
        source: TileError,
    },
}

/// How the overlap between one tile and the subarray is materialized.
///
/// The copy proceeds as an N-D loop over `dim_ranges` (both endpoints
/// inclusive, lower always 0), issuing one contiguous copy of
/// `copy_el` elements per innermost iteration. `dim_ranges` covers
/// only the *retained* dimensions — those not absorbed into the
/// contiguous run. Under row-major fusion the retained dimensions are
/// the leading ones; under column-major fusion, the trailing ones.
/// The stride vectors always carry one entry per array dimension, so
/// loop dimension `k` pairs with stride `D - dim_ranges.len() + k`
/// under column-major fusion and with stride `k` otherwise.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CopyPlan {
    /// Elements copied per innermost iteration.
    pub copy_el: u64,

    /// Inclusive iteration ranges for the retained dimensions.
    pub dim_ranges: Vec<[u64; 2]>,

    /// Starting element offset into the source buffer.
    pub sub_start_el: u64,

    /// Element strides inside the source buffer, one per dimension.
    pub sub_strides_el: Vec<u64>,

    /// Starting element offset into the destination tile.
    pub tile_start_el: u64,

    /// Element strides inside the tile, one per dimension.
    pub tile_strides_el: Vec<u64>,
}

/// Creates dense tiles from the input buffers for a particular array
/// schema and subarray. Used in dense writes.
///
/// Borrows the schema (through the subarray) and the buffers map for
/// the duration of one write; all state is immutable after
/// construction.
pub struct DenseTiler<'a, T> {
    schema: &'a ArraySchema<T>,
    buffers: &'a HashMap<String, QueryBuffer<'a>>,
    subarray: &'a Subarray<'a, T>,

    /// Number of tiles intersecting the subarray.
    tile_num: u64,

    /// Element strides inside a tile, under the schema's cell order.
    tile_strides_el: Vec<u64>,

    /// Element strides inside the source buffer, under the subarray's
    /// layout.
    sub_strides_el: Vec<u64>,

    /// Mixed-radix place values serializing grid coordinates into a
    /// linear tile id, under the schema's tile order.
    sub_tile_coord_offsets: Vec<u64>,

    /// Grid coordinates of the first tile intersecting the subarray.
    first_sub_tile_coords: Vec<u64>,
}

/// Element strides of a layout over the given per-dimension extents:
/// the unit-stride dimension is the last under row-major and the
/// first under column-major, growing outward by the extents crossed.
fn strides_el(extents: &[u64], layout: Layout) -> Vec<u64> {
    let n = extents.len();
    let mut strides = vec![1u64; n];
    match layout {
        Layout::RowMajor => {
            for d in (0..n.saturating_sub(1)).rev() {
                strides[d] = strides[d + 1] * extents[d + 1];
            }
        }
        Layout::ColumnMajor => {
            for d in 1..n {
                strides[d] = strides[d - 1] * extents[d - 1];
            }
        }
    }
    strides
}

impl<'a, T: Coordinate> DenseTiler<'a, T> {
    /// Creates a tiler for one dense write.
    ///
    /// Every buffer must name a schema attribute, and fixed-size
    /// buffers must hold exactly one cell per subarray cell;
    /// otherwise construction fails with
    /// [`DenseTilerError::SchemaMismatch`].
    pub fn new(
        buffers: &'a HashMap<String, QueryBuffer<'a>>,
        subarray: &'a Subarray<'a, T>,
    ) -> Result<Self, DenseTilerError> {
        let schema = subarray.schema();
        for (name, buffer) in buffers {
            let Some(attr) = schema.find_attribute(name) else {
                return Err(DenseTilerError::SchemaMismatch(name.clone()));
            };
            if !attr.var_size() && buffer.size() != subarray.cell_num() * attr.cell_size() {
                return Err(DenseTilerError::SchemaMismatch(name.clone()));
            }
        }

        let dim_num = schema.dim_num();
        let tile_num = schema.tile_num_in_range(subarray.ndrange());

        let first_sub_tile_coords: Vec<u64> = (0..dim_num)
            .map(|d| {
                let dim = schema.dimension(d);
                let dom_lo = dim.domain()[0].to_i128();
                let sub_lo = subarray.range(d)[0].to_i128();
                ((sub_lo - dom_lo) / dim.extent().to_i128()) as u64
            })
            .collect();

        let tile_counts: Vec<u64> = (0..dim_num)
            .map(|d| schema.dimension(d).tile_num_in_range(subarray.range(d)))
            .collect();
        let sub_tile_coord_offsets = strides_el(&tile_counts, schema.tile_order());

        let tile_extents: Vec<u64> = (0..dim_num)
            .map(|d| schema.dimension(d).extent_el())
            .collect();
        let tile_strides_el = strides_el(&tile_extents, schema.cell_order());

        let sub_extents: Vec<u64> = (0..dim_num)
            .map(|d| {
                let r = subarray.range(d);
                (r[1].to_i128() - r[0].to_i128() + 1) as u64
            })
            .collect();
        let sub_strides_el = strides_el(&sub_extents, subarray.layout());

        tracing::debug!(tile_num, dim_num, "dense tiler geometry derived");

        Ok(Self {
            schema,
            buffers,
            subarray,
            tile_num,
            tile_strides_el,
            sub_strides_el,
            sub_tile_coord_offsets,
            first_sub_tile_coords,
        })
    }

    /// Number of tiles to be created: the tiles of the grid that
    /// intersect the subarray.
    pub fn tile_num(&self) -> u64 {
        self.tile_num
    }

    /// Element strides inside a tile, one per dimension.
    pub fn tile_strides_el(&self) -> &[u64] {
        &self.tile_strides_el
    }

    /// Element strides inside the source buffer, one per dimension.
    pub fn sub_strides_el(&self) -> &[u64] {
        &self.sub_strides_el
    }

    /// Place values converting a linear tile id to grid coordinates.
    pub fn sub_tile_coord_offsets(&self) -> &[u64] {
        &self.sub_tile_coord_offsets
    }

    /// Grid coordinates of the first tile intersecting the subarray.
    pub fn first_sub_tile_coords(&self) -> &[u64] {
        &self.first_sub_tile_coords
    }

    /// Computes the copy plan for the given tile id.
    pub fn copy_plan(&self, id: u64) -> Result<CopyPlan, DenseTilerError> {
        if id >= self.tile_num {
            return Err(DenseTilerError::InvalidTileId {
                id,
                tile_num: self.tile_num,
            });
        }

        let dim_num = self.schema.dim_num();
        let sub: Vec<[i128; 2]> = (0..dim_num)
            .map(|d| {
                let r = self.subarray.range(d);
                [r[0].to_i128(), r[1].to_i128()]
            })
            .collect();
        let tile_sub = self.tile_subarray(id);

        // Componentwise intersection. The tile intersects the
        // subarray by construction of the id space, so the result is
        // never empty.
        let sub_in_tile: Vec<[i128; 2]> = sub
            .iter()
            .zip(&tile_sub)
            .map(|(s, t)| [s[0].max(t[0]), s[1].min(t[1])])
            .collect();

        let mut sub_start_el = 0u64;
        let mut tile_start_el = 0u64;
        for d in 0..dim_num {
            sub_start_el += (sub_in_tile[d][0] - sub[d][0]) as u64 * self.sub_strides_el[d];
            tile_start_el += (sub_in_tile[d][0] - tile_sub[d][0]) as u64 * self.tile_strides_el[d];
        }

        let width = |d: usize| (sub_in_tile[d][1] - sub_in_tile[d][0] + 1) as u64;
        let tile_layout = self.schema.cell_order();
        let sub_layout = self.subarray.layout();

        let mut copy_el;
        let mut dim_ranges = Vec::new();
        if dim_num == 1 {
            // Copy the entire 1D overlap in a single pass.
            copy_el = width(0);
            dim_ranges.push([0, 0]);
        } else if sub_layout != tile_layout {
            // Orders disagree: no run crosses a dimension boundary on
            // both sides at once, so copy cell by cell.
            copy_el = 1;
            for d in 0..dim_num {
                dim_ranges.push([0, width(d) - 1]);
            }
        } else if tile_layout == Layout::RowMajor {
            copy_el = width(dim_num - 1);
            // Absorb inner dimensions while the overlap spans both the
            // full tile extent and the full subarray range along them.
            let mut d = dim_num - 1;
            while d > 0 {
                let ext = self.schema.dimension(d).extent_el();
                if width(d) == ext && sub_in_tile[d] == sub[d] {
                    copy_el *= width(d - 1);
                    d -= 1;
                } else {
                    break;
                }
            }
            if d == 0 {
                dim_ranges.push([0, 0]);
            } else {
                for k in 0..d {
                    dim_ranges.push([0, width(k) - 1]);
                }
            }
        } else {
            copy_el = width(0);
            let mut d = 0;
            while d + 1 < dim_num {
                let ext = self.schema.dimension(d).extent_el();
                if width(d) == ext && sub_in_tile[d] == sub[d] {
                    copy_el *= width(d + 1);
                    d += 1;
                } else {
                    break;
                }
            }
            if d + 1 == dim_num {
                dim_ranges.push([0, 0]);
            } else {
                for k in d + 1..dim_num {
                    dim_ranges.push([0, width(k) - 1]);
                }
            }
        }

        Ok(CopyPlan {
            copy_el,
            dim_ranges,
            sub_start_el,
            sub_strides_el: self.sub_strides_el.clone(),
            tile_start_el,
            tile_strides_el: self.tile_strides_el.clone(),
        })
    }

    /// Materializes the fixed-sized tile with the given id for the
    /// given attribute.
    ///
    /// The tile is initialized to the tile size of the attribute,
    /// painted with its fill value, then overlaid with the subarray
    /// overlap per the tile's copy plan. On error the tile is
    /// untouched, except for [`DenseTilerError::TileWrite`], which
    /// leaves it partially written; callers must discard it.
    pub fn get_tile(&self, id: u64, name: &str, tile: &mut Tile) -> Result<(), DenseTilerError> {
        if id >= self.tile_num {
            return Err(DenseTilerError::InvalidTileId {
                id,
                tile_num: self.tile_num,
            });
        }
        let attr = self
            .schema
            .find_attribute(name)
            .ok_or_else(|| DenseTilerError::UnknownAttribute(name.to_string()))?;
        if attr.var_size() {
            return Err(DenseTilerError::VarSizedNotSupported(name.to_string()));
        }
        let buffer = self
            .buffers
            .get(name)
            .ok_or_else(|| DenseTilerError::MissingBuffer(name.to_string()))?;

        self.init_tile(attr, tile)?;
        self.fill_tile(attr, tile)?;

        let plan = self.copy_plan(id)?;

        // Scale the plan from elements to bytes.
        let cell_size = attr.cell_size();
        let copy_nbytes = (plan.copy_el * cell_size) as usize;
        let dim_num = self.schema.dim_num();
        let loop_dims = plan.dim_ranges.len();
        // Loop dimension k stands for retained dimension base + k;
        // see the CopyPlan stride pairing rule.
        let base = if self.schema.cell_order() == Layout::ColumnMajor && loop_dims < dim_num {
            dim_num - loop_dims
        } else {
            0
        };
        let sub_strides: Vec<u64> = plan.sub_strides_el[base..base + loop_dims]
            .iter()
            .map(|s| s * cell_size)
            .collect();
        let tile_strides: Vec<u64> = plan.tile_strides_el[base..base + loop_dims]
            .iter()
            .map(|s| s * cell_size)
            .collect();

        let src = buffer.buffer();
        let mut cell_coords: Vec<u64> = plan.dim_ranges.iter().map(|r| r[0]).collect();
        let mut sub_offsets = vec![plan.sub_start_el * cell_size; loop_dims];
        let mut tile_offsets = vec![plan.tile_start_el * cell_size; loop_dims];
        let inner = loop_dims - 1;

        // The copy loop runs in row-major order over dim_ranges
        // regardless of the cell orders; the orders are already baked
        // into the strides.
        loop {
            let start = sub_offsets[inner] as usize;
            tile.write_at(&src[start..start + copy_nbytes], tile_offsets[inner])
                .map_err(|source| DenseTilerError::TileWrite {
                    name: name.to_string(),
                    source,
                })?;

            // Odometer carry: find the outermost loop dimension that
            // advances; everything to its right wraps.
            let mut advanced = None;
            for d in (0..loop_dims).rev() {
                cell_coords[d] += 1;
                if cell_coords[d] > plan.dim_ranges[d][1] {
                    cell_coords[d] = plan.dim_ranges[d][0];
                } else {
                    advanced = Some(d);
                    break;
                }
            }
            let Some(d) = advanced else { break };

            sub_offsets[d] += sub_strides[d];
            tile_offsets[d] += tile_strides[d];
            for k in d + 1..loop_dims {
                sub_offsets[k] = sub_offsets[k - 1];
                tile_offsets[k] = tile_offsets[k - 1];
            }
        }

        tile.reset_offset();
        Ok(())
    }

    /// Grid coordinates (within the subarray tile domain) of the
    /// given tile id, by peeling mixed-radix place values in the
    /// schema's tile order.
    fn tile_coords_in_sub(&self, id: u64) -> Vec<u64> {
        let dim_num = self.schema.dim_num();
        let mut coords = vec![0u64; dim_num];
        let mut rem = id;
        match self.schema.tile_order() {
            Layout::RowMajor => {
                for d in 0..dim_num {
                    coords[d] = rem / self.sub_tile_coord_offsets[d];
                    rem %= self.sub_tile_coord_offsets[d];
                }
            }
            Layout::ColumnMajor => {
                for d in (0..dim_num).rev() {
                    coords[d] = rem / self.sub_tile_coord_offsets[d];
                    rem %= self.sub_tile_coord_offsets[d];
                }
            }
        }
        coords
    }

    /// Global coordinate box of the given tile id. Tiles always span
    /// a full extent: the box may extend past the domain high edge,
    /// and the cells beyond it stay fill-valued.
    fn tile_subarray(&self, id: u64) -> Vec<[i128; 2]> {
        let coords = self.tile_coords_in_sub(id);
        (0..self.schema.dim_num())
            .map(|d| {
                let dim = self.schema.dimension(d);
                let ext = dim.extent().to_i128();
                let tile_coord = (coords[d] + self.first_sub_tile_coords[d]) as i128;
                let lo = tile_coord * ext + dim.domain()[0].to_i128();
                [lo, lo + ext - 1]
            })
            .collect()
    }

    fn init_tile(&self, attr: &Attribute, tile: &mut Tile) -> Result<(), DenseTilerError> {
        let cell_size = attr.cell_size();
        let tile_size = self.schema.cells_per_tile() * cell_size;
        tile.init_unfiltered(FORMAT_VERSION, attr.datatype(), tile_size, cell_size)
            .map_err(|source| DenseTilerError::TileInit {
                name: attr.name().to_string(),
                source,
            })
    }

    /// Paints the entire tile with the attribute's fill value, one
    /// batch at a time rather than one cell at a time.
    fn fill_tile(&self, attr: &Attribute, tile: &mut Tile) -> Result<(), DenseTilerError> {
        let fill = attr.fill_value();
        if fill.iter().all(|&b| b == 0) {
            // A freshly initialized tile is already zeroed.
            return Ok(());
        }

        let cell_num = self.schema.cells_per_tile();
        let batch_cells = FILL_BATCH_CELLS.min(cell_num);
        let batch: Vec<u8> = fill
            .iter()
            .copied()
            .cycle()
            .take((batch_cells as usize) * fill.len())
            .collect();

        let mut remaining = cell_num;
        while remaining > 0 {
            let cells = batch_cells.min(remaining);
            let nbytes = (cells as usize) * fill.len();
            tile.write(&batch[..nbytes])
                .map_err(|source| DenseTilerError::TileWrite {
                    name: attr.name().to_string(),
                    source,
                })?;
            remaining -= cells;
        }

        tile.reset_offset();
        Ok(())
    }
}
