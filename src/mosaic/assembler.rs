//! Mosaic assembly: fragments to one seamless output raster
//!
//! Placement is driven entirely by each fragment's declared rectangle, so
//! fragments with pixel grids one pixel off a uniform split still land
//! exactly where their geometry says they belong.

use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{debug, info};

use super::fragment::RasterFragment;
use crate::cog::{CogOptions, CogWriter, GeoReference};
use crate::coordinate::BoundingBox;
use crate::errors::{ExportError, ExportResult};
use crate::grid::PixelGrid;

/// Combines fetched fragments into a single cloud-optimized raster
pub struct MosaicAssembler<'a> {
    pixel_size_x: f64,
    pixel_size_y: f64,
    options: &'a CogOptions,
}

impl<'a> MosaicAssembler<'a> {
    /// Create an assembler for the export's pixel size and output options
    pub fn new(pixel_size_x: f64, pixel_size_y: f64, options: &'a CogOptions) -> Self {
        MosaicAssembler { pixel_size_x, pixel_size_y, options }
    }

    /// Mosaic fragments covering `parent` into a COG at `out_path`
    ///
    /// A single fragment is re-encoded directly; multiple fragments are
    /// composited by their declared rectangles first.
    pub fn assemble(&self, parent: &BoundingBox, fragments: &[RasterFragment],
                    out_path: &Path) -> ExportResult<PathBuf> {
        if fragments.is_empty() {
            return Err(ExportError::Encoding("No fragments to mosaic".to_string()));
        }

        let writer = CogWriter::new(self.options);

        if let [single] = fragments {
            info!("Single tile, re-encoding directly to {}", out_path.display());
            let image = decode_fragment(single)?;
            let geo = self.georeference(&single.bbox);
            writer.write(&image, &geo, out_path)?;
            return Ok(out_path.to_path_buf());
        }

        info!("Mosaicking {} fragments into {}", fragments.len(), out_path.display());
        let canvas = self.composite(parent, fragments)?;
        let geo = self.georeference(parent);
        writer.write(&canvas, &geo, out_path)?;
        Ok(out_path.to_path_buf())
    }

    /// Paste every fragment onto a canvas sized by the parent rectangle
    fn composite(&self, parent: &BoundingBox, fragments: &[RasterFragment]) -> ExportResult<RgbImage> {
        let full = PixelGrid::derive(parent, self.pixel_size_x, self.pixel_size_y);
        let mut canvas = RgbImage::new(full.width, full.height);

        for fragment in fragments {
            let image = decode_fragment(fragment)?;

            // Column from the west edge, row from the north edge: raster
            // rows run top-down while native Y runs south-up.
            let col = ((fragment.bbox.min_x - parent.min_x) / self.pixel_size_x).round() as i64;
            let row = ((parent.max_y - fragment.bbox.max_y) / self.pixel_size_y).round() as i64;
            debug!("Placing {} at pixel ({}, {})", fragment.path.display(), col, row);

            image::imageops::replace(&mut canvas, &image, col, row);
        }

        Ok(canvas)
    }

    /// Georeference for a raster covering `bbox` at the export pixel size
    fn georeference(&self, bbox: &BoundingBox) -> GeoReference {
        GeoReference {
            origin_x: bbox.min_x,
            origin_y: bbox.max_y,
            pixel_size_x: self.pixel_size_x,
            pixel_size_y: self.pixel_size_y,
            wkid: bbox.wkid,
        }
    }
}

/// Decode a fragment file into an RGB raster
fn decode_fragment(fragment: &RasterFragment) -> ExportResult<RgbImage> {
    let image = image::open(&fragment.path)
        .map_err(|e| ExportError::Encoding(format!(
            "Failed to decode fragment {}: {}", fragment.path.display(), e)))?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridPlanner;

    /// Write a solid-color fragment file for a planned tile
    fn solid_fragment(dir: &Path, index: usize, bbox: BoundingBox, grid: PixelGrid,
                      color: [u8; 3]) -> RasterFragment {
        let path = dir.join(format!("part{:03}.tif", index));
        let image = RgbImage::from_pixel(grid.width, grid.height, image::Rgb(color));
        image.save(&path).unwrap();
        RasterFragment::new(path, bbox, grid)
    }

    #[test]
    fn test_mosaic_covers_parent_extent() {
        let dir = tempfile::tempdir().unwrap();
        let parent = BoundingBox::new(0.0, 0.0, 40.0, 40.0, 2868);
        let planner = GridPlanner::new(1.0, 1.0, 20, 20);
        let plan = planner.plan(&parent);
        assert_eq!(plan.len(), 4);

        let colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 0]];
        let fragments: Vec<RasterFragment> = plan.tiles.iter().enumerate()
            .map(|(i, tile)| solid_fragment(dir.path(), i, tile.bbox, tile.grid, colors[i]))
            .collect();

        let options = CogOptions { block_size: 16, ..Default::default() };
        let assembler = MosaicAssembler::new(1.0, 1.0, &options);
        let out = dir.path().join("mosaic.tif");
        assembler.assemble(&parent, &fragments, &out).unwrap();
        assert!(out.exists());

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(&bytes[0..2], b"II");
    }

    #[test]
    fn test_composite_places_rows_top_down() {
        let dir = tempfile::tempdir().unwrap();
        let parent = BoundingBox::new(0.0, 0.0, 20.0, 20.0, 2868);
        let planner = GridPlanner::new(1.0, 1.0, 10, 10);
        let plan = planner.plan(&parent);

        // Row-major plan starts at the south row; paint it red and the
        // north row green.
        let fragments: Vec<RasterFragment> = plan.tiles.iter().enumerate()
            .map(|(i, tile)| {
                let color = if tile.bbox.min_y == 0.0 { [255, 0, 0] } else { [0, 255, 0] };
                solid_fragment(dir.path(), i, tile.bbox, tile.grid, color)
            })
            .collect();

        let options = CogOptions::default();
        let assembler = MosaicAssembler::new(1.0, 1.0, &options);
        let canvas = assembler.composite(&parent, &fragments).unwrap();
        assert_eq!(canvas.dimensions(), (20, 20));
        // Top row of the canvas is the north (green) half
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 255, 0]);
        assert_eq!(canvas.get_pixel(0, 19).0, [255, 0, 0]);
    }

    #[test]
    fn test_heterogeneous_fragment_sizes_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        // 7 units across two tiles at 0.5 units/px: 7/0.5 = 14 px total,
        // each half 3.5 units -> 7 px, exact; force inexactness with 0.3
        let parent = BoundingBox::new(0.0, 0.0, 7.0, 3.0, 2868);
        let planner = GridPlanner::new(0.3, 0.3, 12, 12);
        let plan = planner.plan(&parent);
        assert!(plan.len() > 1);

        let fragments: Vec<RasterFragment> = plan.tiles.iter().enumerate()
            .map(|(i, tile)| solid_fragment(dir.path(), i, tile.bbox, tile.grid, [9, 9, 9]))
            .collect();

        let options = CogOptions::default();
        let assembler = MosaicAssembler::new(0.3, 0.3, &options);
        let canvas = assembler.composite(&parent, &fragments).unwrap();

        let expected = PixelGrid::derive(&parent, 0.3, 0.3);
        assert_eq!(canvas.dimensions(), (expected.width, expected.height));
        // No unpainted hole along the tile seam
        for x in 0..expected.width {
            for y in 0..expected.height {
                assert_eq!(canvas.get_pixel(x, y).0, [9, 9, 9],
                           "hole at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_empty_fragment_list_is_error() {
        let options = CogOptions::default();
        let assembler = MosaicAssembler::new(1.0, 1.0, &options);
        let parent = BoundingBox::new(0.0, 0.0, 1.0, 1.0, 2868);
        let result = assembler.assemble(&parent, &[], Path::new("/tmp/never.tif"));
        assert!(matches!(result, Err(ExportError::Encoding(_))));
    }

    #[test]
    fn test_unreadable_fragment_names_file() {
        let options = CogOptions::default();
        let assembler = MosaicAssembler::new(1.0, 1.0, &options);
        let parent = BoundingBox::new(0.0, 0.0, 1.0, 1.0, 2868);
        let fragment = RasterFragment::new(
            PathBuf::from("/nonexistent/part9.tif"),
            parent,
            PixelGrid { width: 1, height: 1 },
        );
        let err = assembler.assemble(&parent, &[fragment], Path::new("/tmp/never.tif"))
            .unwrap_err();
        assert!(err.to_string().contains("part9.tif"));
    }
}
