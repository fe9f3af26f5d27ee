/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Source buffers for dense writes.

/// A borrowed, contiguous region of attribute values, laid out over
/// the write's subarray in the subarray's traversal order.
///
/// The buffer must hold exactly one value region of
/// `subarray.cell_num() * attribute.cell_size()` bytes; the tiler
/// never mutates it.
#[derive(Copy, Clone, Debug)]
pub struct QueryBuffer<'a> {
    buffer: &'a [u8],
}

impl<'a> QueryBuffer<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn size(&self) -> u64 {
        self.buffer.len() as u64
    }
}
