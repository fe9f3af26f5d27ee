/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Cell and tile orderings.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Memory layout order of a multidimensional traversal.
///
/// The same two orders apply in three independent places: cells within a
/// tile (the schema's cell order), tiles within the tile grid (the
/// schema's tile order), and cells within a subarray's source buffer
/// (the subarray's layout). Any combination is valid.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Layout {
    /// Row-major layout (C-style): last index varies fastest.
    RowMajor,

    /// Column-major layout (Fortran-style): first index varies
    /// fastest.
    ColumnMajor,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::RowMajor => write!(f, "row-major"),
            Layout::ColumnMajor => write!(f, "col-major"),
        }
    }
}
