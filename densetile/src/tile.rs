/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Writable tile buffers.

use thiserror::Error;

use crate::datatype::Datatype;

/// On-disk format version stamped on freshly initialized tiles.
pub const FORMAT_VERSION: u32 = 1;

/// Errors arising from tile buffer operations.
#[derive(Debug, Error)]
pub enum TileError {
    #[error("tile is not initialized")]
    NotInitialized,

    #[error("write of {nbytes} bytes at offset {offset} exceeds tile size {size}")]
    WriteOutOfBounds { offset: u64, nbytes: u64, size: u64 },
}

/// A fixed-size byte buffer holding one tile's worth of cells for one
/// attribute, with a write cursor for sequential appends.
///
/// Tiles are reused across `get_tile` calls: `init_unfiltered`
/// reallocates (zeroed) and resets the cursor. Appending writes advance
/// the cursor; positioned writes do not.
#[derive(Clone, Debug, Default)]
pub struct Tile {
    datatype: Option<Datatype>,
    cell_size: u64,
    format_version: u32,
    data: Vec<u8>,
    offset: u64,
}

impl Tile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes the tile as unfiltered: `size` zeroed bytes, typed
    /// as `datatype` with the given cell size, cursor at 0.
    pub fn init_unfiltered(
        &mut self,
        format_version: u32,
        datatype: Datatype,
        size: u64,
        cell_size: u64,
    ) -> Result<(), TileError> {
        self.datatype = Some(datatype);
        self.cell_size = cell_size;
        self.format_version = format_version;
        self.data = vec![0u8; size as usize];
        self.offset = 0;
        Ok(())
    }

    /// Appends `bytes` at the cursor and advances it.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), TileError> {
        self.write_at(bytes, self.offset)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    /// Writes `bytes` at an absolute offset; the cursor is unchanged.
    pub fn write_at(&mut self, bytes: &[u8], offset: u64) -> Result<(), TileError> {
        if self.datatype.is_none() {
            return Err(TileError::NotInitialized);
        }
        let nbytes = bytes.len() as u64;
        if offset + nbytes > self.size() {
            return Err(TileError::WriteOutOfBounds {
                offset,
                nbytes,
                size: self.size(),
            });
        }
        self.data[offset as usize..(offset + nbytes) as usize].copy_from_slice(bytes);
        Ok(())
    }

    /// Resets the write cursor to the beginning of the tile.
    pub fn reset_offset(&mut self) {
        self.offset = 0;
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn cell_size(&self) -> u64 {
        self.cell_size
    }

    pub fn datatype(&self) -> Option<Datatype> {
        self.datatype
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_write() {
        let mut tile = Tile::new();
        assert!(matches!(
            tile.write(&[1, 2, 3]),
            Err(TileError::NotInitialized)
        ));
    }

    #[test]
    fn test_append_and_positioned_writes() {
        let mut tile = Tile::new();
        tile.init_unfiltered(FORMAT_VERSION, Datatype::UInt8, 4, 1)
            .unwrap();
        assert_eq!(tile.size(), 4);
        assert_eq!(tile.data(), &[0, 0, 0, 0]);

        tile.write(&[1, 2]).unwrap();
        assert_eq!(tile.offset(), 2);
        tile.write(&[3]).unwrap();
        assert_eq!(tile.data(), &[1, 2, 3, 0]);

        tile.write_at(&[9], 0).unwrap();
        assert_eq!(tile.offset(), 3);
        assert_eq!(tile.data(), &[9, 2, 3, 0]);

        tile.reset_offset();
        assert_eq!(tile.offset(), 0);
    }

    #[test]
    fn test_write_out_of_bounds() {
        let mut tile = Tile::new();
        tile.init_unfiltered(FORMAT_VERSION, Datatype::UInt8, 4, 1)
            .unwrap();
        assert!(matches!(
            tile.write_at(&[1, 2], 3),
            Err(TileError::WriteOutOfBounds { .. })
        ));
        tile.write(&[0; 4]).unwrap();
        assert!(matches!(
            tile.write(&[1]),
            Err(TileError::WriteOutOfBounds { .. })
        ));
    }
}
