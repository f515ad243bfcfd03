//! Pixel grid derivation from geometry and ground sample distance

use crate::coordinate::BoundingBox;

/// Integer pixel dimensions derived from a rectangle and a pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelGrid {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl PixelGrid {
    /// Derive the pixel grid for a rectangle at the given pixel sizes
    ///
    /// Each dimension rounds to the nearest whole pixel with a floor of 1,
    /// so an area smaller than a single pixel still produces a valid
    /// 1x1 request instead of a degenerate zero-size one.
    pub fn derive(bbox: &BoundingBox, pixel_size_x: f64, pixel_size_y: f64) -> Self {
        let width = (bbox.width() / pixel_size_x).round().max(1.0) as u32;
        let height = (bbox.height() / pixel_size_y).round().max(1.0) as u32;
        PixelGrid { width, height }
    }

    /// Whether this grid exceeds the given per-axis maxima
    pub fn exceeds(&self, max_width: u32, max_height: u32) -> bool {
        self.width > max_width || self.height > max_height
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Format as the comma-joined `width,height` string the exportImage
    /// endpoint expects
    pub fn to_param(&self) -> String {
        format!("{},{}", self.width, self.height)
    }
}
