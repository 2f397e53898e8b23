//! Tiled encoding support.
//!
//! Codecs take tile data as one contiguous block per tile, while callers hand
//! over a full image with a full-width row stride. `encode_tiles` walks the
//! tile grid in row-major order, gathers each tile's rows into a reusable
//! scratch buffer and passes it to a sink.

use crate::error::{Jpeg2kError, Result};
use log::trace;

/// Geometry of a tiled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    /// Image width in samples.
    pub image_width: usize,
    /// Image height in rows.
    pub image_height: usize,
    /// Nominal tile width. Tiles in the last column may be narrower.
    pub tile_width: usize,
    /// Nominal tile height. Tiles in the last row may be shorter.
    pub tile_height: usize,
    /// Bytes per sample.
    pub item_size: usize,
    /// Number of image planes stored back to back in the source buffer.
    /// Each tile carries its region of every plane, plane by plane.
    pub planes: usize,
}

/// Position and clamped extent of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub index: u32,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl TileGrid {
    pub fn new(
        image_width: usize,
        image_height: usize,
        tile_width: usize,
        tile_height: usize,
        item_size: usize,
    ) -> Self {
        Self {
            image_width,
            image_height,
            tile_width,
            tile_height,
            item_size,
            planes: 1,
        }
    }

    /// A grid with a single tile covering the whole image.
    pub fn single_tile(image_width: usize, image_height: usize, item_size: usize) -> Self {
        Self::new(image_width, image_height, image_width, image_height, item_size)
    }

    pub fn with_planes(mut self, planes: usize) -> Self {
        self.planes = planes;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(Jpeg2kError::InvalidTileGrid(format!(
                "empty image {}x{}",
                self.image_width, self.image_height
            )));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(Jpeg2kError::InvalidTileGrid(format!(
                "empty tile {}x{}",
                self.tile_width, self.tile_height
            )));
        }
        if self.item_size == 0 || self.planes == 0 {
            return Err(Jpeg2kError::InvalidTileGrid(format!(
                "item size {} with {} planes",
                self.item_size, self.planes
            )));
        }
        Ok(())
    }

    /// Tiles per row, zero for a zero tile width.
    pub fn tiles_x(&self) -> usize {
        if self.tile_width == 0 {
            return 0;
        }
        self.image_width.div_ceil(self.tile_width)
    }

    /// Tiles per column, zero for a zero tile height.
    pub fn tiles_y(&self) -> usize {
        if self.tile_height == 0 {
            return 0;
        }
        self.image_height.div_ceil(self.tile_height)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_x() * self.tiles_y()
    }

    /// Bytes the source buffer must hold.
    pub fn image_size(&self) -> usize {
        self.image_width * self.image_height * self.item_size * self.planes
    }

    /// Bytes of the largest tile, which sizes the scratch buffer.
    pub fn max_tile_size(&self) -> usize {
        self.tile_width.min(self.image_width)
            * self.tile_height.min(self.image_height)
            * self.item_size
            * self.planes
    }

    /// Extent of the tile at `index` (row-major), clamped at the image edge.
    pub fn tile_rect(&self, index: usize) -> Option<TileRect> {
        if index >= self.tile_count() {
            return None;
        }
        let x = (index % self.tiles_x()) * self.tile_width;
        let y = (index / self.tiles_x()) * self.tile_height;
        Some(TileRect {
            index: index as u32,
            x,
            y,
            width: self.tile_width.min(self.image_width - x),
            height: self.tile_height.min(self.image_height - y),
        })
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileRect> + '_ {
        (0..self.tile_count()).filter_map(|index| self.tile_rect(index))
    }
}

impl TileRect {
    /// Bytes of this tile for one plane.
    pub fn plane_size(&self, item_size: usize) -> usize {
        self.width * self.height * item_size
    }
}

/// Copies every tile of `pixels` into contiguous memory and hands it to
/// `emit_tile` in row-major tile order.
///
/// `emit_tile` receives the sequential tile index and exactly the tile's
/// bytes. Returning `false` stops the walk with `TileWriteFailed`.
pub fn encode_tiles<F>(pixels: &[u8], grid: &TileGrid, mut emit_tile: F) -> Result<()>
where
    F: FnMut(u32, &[u8]) -> bool,
{
    grid.validate()?;
    if pixels.len() != grid.image_size() {
        return Err(Jpeg2kError::InvalidBufferSize {
            expected: grid.image_size(),
            actual: pixels.len(),
        });
    }

    let row_stride = grid.image_width * grid.item_size;
    let plane_stride = row_stride * grid.image_height;
    let mut scratch = vec![0u8; grid.max_tile_size()];

    for tile in grid.tiles() {
        let tile_row = tile.width * grid.item_size;
        let x_offset = tile.x * grid.item_size;
        let mut dst = 0;
        for plane in 0..grid.planes {
            let plane_start = plane * plane_stride;
            for row in tile.y..tile.y + tile.height {
                let src = plane_start + row * row_stride + x_offset;
                scratch[dst..dst + tile_row].copy_from_slice(&pixels[src..src + tile_row]);
                dst += tile_row;
            }
        }

        trace!(
            "tile {} at ({}, {}) size {}x{}, {} bytes",
            tile.index, tile.x, tile.y, tile.width, tile.height, dst
        );
        if !emit_tile(tile.index, &scratch[..dst]) {
            return Err(Jpeg2kError::TileWriteFailed {
                tile_index: tile.index,
            });
        }
    }
    Ok(())
}
