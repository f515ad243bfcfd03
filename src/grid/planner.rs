//! Tile planning for oversized export requests
//!
//! A request whose pixel grid exceeds the server's maximum export size is
//! split into a grid of sub-rectangles. The split subdivides the native
//! rectangle itself, not the pixel grid: tile edges stay exact fractions
//! of the parent geometry, so rounding never drifts across the plan and
//! the mosaic reassembles without seams.

use log::{debug, info};

use super::pixel::PixelGrid;
use crate::coordinate::BoundingBox;

/// One planned export tile: a sub-rectangle and its own pixel grid
#[derive(Debug, Clone, Copy)]
pub struct TileSpec {
    /// The tile's native bounding rectangle
    pub bbox: BoundingBox,
    /// The tile's pixel dimensions, recomputed from its own rectangle
    pub grid: PixelGrid,
}

/// An ordered plan of export tiles covering a parent rectangle
///
/// Tiles are in row-major order: all tiles of the southernmost row from
/// west to east, then the next row up, and so on.
#[derive(Debug, Clone)]
pub struct TilePlan {
    /// The planned tiles
    pub tiles: Vec<TileSpec>,
    /// Tile columns
    pub nx: u32,
    /// Tile rows
    pub ny: u32,
    /// Pixel grid of the whole parent rectangle
    pub total: PixelGrid,
}

impl TilePlan {
    /// Number of tiles in the plan
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the plan is a single unpartitioned export
    pub fn is_single(&self) -> bool {
        self.tiles.len() == 1
    }
}

/// Plans export tile grids for a fixed pixel size and server limits
pub struct GridPlanner {
    pixel_size_x: f64,
    pixel_size_y: f64,
    max_width: u32,
    max_height: u32,
}

impl GridPlanner {
    /// Create a planner
    ///
    /// `max_width`/`max_height` are the server's maximum exportable pixel
    /// dimensions per request.
    pub fn new(pixel_size_x: f64, pixel_size_y: f64, max_width: u32, max_height: u32) -> Self {
        GridPlanner { pixel_size_x, pixel_size_y, max_width, max_height }
    }

    /// Partition a native rectangle into an ordered tile plan
    pub fn plan(&self, bbox: &BoundingBox) -> TilePlan {
        let total = PixelGrid::derive(bbox, self.pixel_size_x, self.pixel_size_y);
        let nx = total.width.div_ceil(self.max_width).max(1);
        let ny = total.height.div_ceil(self.max_height).max(1);

        if nx == 1 && ny == 1 {
            debug!("Area fits a single export of {}x{} px", total.width, total.height);
            return TilePlan {
                tiles: vec![TileSpec { bbox: *bbox, grid: total }],
                nx, ny, total,
            };
        }

        info!("Splitting {}x{} px export into {}x{} tiles", total.width, total.height, nx, ny);

        let mut tiles = Vec::with_capacity((nx * ny) as usize);
        for iy in 0..ny {
            for ix in 0..nx {
                let tile_bbox = BoundingBox::new(
                    edge(bbox.min_x, bbox.max_x, ix, nx),
                    edge(bbox.min_y, bbox.max_y, iy, ny),
                    edge(bbox.min_x, bbox.max_x, ix + 1, nx),
                    edge(bbox.min_y, bbox.max_y, iy + 1, ny),
                    bbox.wkid,
                );
                // Each tile derives its own grid; neighbors may differ by
                // one pixel, which the mosaic step tolerates.
                let grid = PixelGrid::derive(&tile_bbox, self.pixel_size_x, self.pixel_size_y);
                tiles.push(TileSpec { bbox: tile_bbox, grid });
            }
        }

        TilePlan { tiles, nx, ny, total }
    }
}

/// Interpolated subdivision edge `i` of `n` between `min` and `max`
///
/// The endpoints are returned exactly, and edge `i` evaluates to the same
/// float on both sides of a shared boundary, so the partition has no gap
/// and no overlap.
fn edge(min: f64, max: f64, i: u32, n: u32) -> f64 {
    if i == 0 {
        min
    } else if i == n {
        max
    } else {
        min + (max - min) * (i as f64 / n as f64)
    }
}
