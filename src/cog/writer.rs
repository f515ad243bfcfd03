//! Tiled GeoTIFF writer with embedded overviews
//!
//! Writes the pipeline's output rasters in a cloud-optimized layout:
//! little-endian classic TIFF, internally tiled with compressed blocks,
//! an IFD chain of reduced-resolution overviews behind the full raster,
//! and GeoTIFF georeferencing on the full-resolution directory.
//!
//! The file is laid out in one pass: directory structures first, external
//! tag payloads next, tile data last. All offsets are computed before any
//! byte is written, so no seeking is needed.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use image::RgbImage;
use log::{debug, info};
use rayon::prelude::*;

use super::codec::{codec_for_name, Codec};
use super::ifd::{align4, tags, Ifd, IfdEntry};
use crate::coordinate::SpatialRef;
use crate::errors::{ExportError, ExportResult};

/// Bytes per pixel for 8-bit RGB
const PIXEL_BYTES: u32 = 3;

/// GeoKey ids and values used in the key directory
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Output encoding configuration
#[derive(Debug, Clone)]
pub struct CogOptions {
    /// Internal tile size in pixels, must be a multiple of 16
    pub block_size: u32,
    /// Compression scheme name (NONE, DEFLATE, ZSTD)
    pub compression: String,
    /// Emit per-level encoding diagnostics at info level
    pub verbose: bool,
}

impl Default for CogOptions {
    fn default() -> Self {
        CogOptions {
            block_size: 512,
            compression: "DEFLATE".to_string(),
            verbose: false,
        }
    }
}

/// Georeferencing for the output raster
#[derive(Debug, Clone, Copy)]
pub struct GeoReference {
    /// World X of the top-left corner of the top-left pixel
    pub origin_x: f64,
    /// World Y of the top-left corner of the top-left pixel
    pub origin_y: f64,
    /// Pixel width in native units
    pub pixel_size_x: f64,
    /// Pixel height in native units
    pub pixel_size_y: f64,
    /// Native reference system wkid
    pub wkid: u32,
}

/// Writer for cloud-optimized output rasters
pub struct CogWriter<'a> {
    options: &'a CogOptions,
}

impl<'a> CogWriter<'a> {
    /// Create a writer with the given encoding options
    pub fn new(options: &'a CogOptions) -> Self {
        CogWriter { options }
    }

    /// Encode an RGB raster to `path`
    pub fn write(&self, image: &RgbImage, geo: &GeoReference, path: &Path) -> ExportResult<()> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ExportError::Encoding("Raster has zero dimensions".to_string()));
        }
        if self.options.block_size == 0 || self.options.block_size % 16 != 0 {
            return Err(ExportError::Parse(format!(
                "Block size must be a positive multiple of 16, got {}",
                self.options.block_size)));
        }

        let codec = codec_for_name(&self.options.compression)?;

        // Reduced-resolution levels, halved until one block holds the image
        let overviews = self.build_overviews(image);
        let mut levels: Vec<&RgbImage> = vec![image];
        levels.extend(overviews.iter());

        if self.options.verbose {
            info!("Encoding {}x{} raster with {} overview level(s), {} tiles of {} px",
                  width, height, overviews.len(), self.options.compression, self.options.block_size);
        }

        // Compress every level's tiles up front; offsets depend on sizes
        let mut level_tiles: Vec<Vec<Vec<u8>>> = Vec::with_capacity(levels.len());
        for level in &levels {
            level_tiles.push(self.compress_level(level, codec.as_ref())?);
        }

        let mut ifds: Vec<Ifd> = levels.iter().enumerate()
            .map(|(i, level)| self.build_ifd(level, i > 0, codec.tag(), geo, i == 0))
            .collect();

        // Layout: header, directories, external payloads, tile data
        let mut offset: u64 = 8;
        let mut ifd_offsets = Vec::with_capacity(ifds.len());
        for ifd in &ifds {
            ifd_offsets.push(offset);
            offset += ifd.byte_size();
        }

        let external_base = offset;
        for ifd in &ifds {
            offset += ifd.external_size();
        }

        let mut tile_offsets: Vec<Vec<u32>> = Vec::with_capacity(level_tiles.len());
        for tiles in &level_tiles {
            let mut offsets = Vec::with_capacity(tiles.len());
            for tile in tiles {
                offsets.push(offset as u32);
                offset += align4(tile.len() as u64);
            }
            tile_offsets.push(offsets);
        }

        // Final payloads now that the data region is placed
        for (i, ifd) in ifds.iter_mut().enumerate() {
            let byte_counts: Vec<u32> = level_tiles[i].iter().map(|t| t.len() as u32).collect();
            ifd.set_longs(tags::TILE_OFFSETS, &tile_offsets[i]);
            ifd.set_longs(tags::TILE_BYTE_COUNTS, &byte_counts);
        }

        let external_offsets = Self::place_external(&ifds, external_base);

        debug!("Writing {} ({} bytes)", path.display(), offset);
        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(1 << 20, file);

        self.write_header(&mut writer)?;
        for (i, ifd) in ifds.iter().enumerate() {
            let next = ifd_offsets.get(i + 1).copied().unwrap_or(0);
            Self::write_ifd(&mut writer, ifd, i, next, &external_offsets)?;
        }
        Self::write_external(&mut writer, &ifds)?;
        for tiles in &level_tiles {
            for tile in tiles {
                writer.write_all(tile)?;
                Self::write_padding(&mut writer, tile.len())?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Halve the raster until the longest side fits within one block
    fn build_overviews(&self, image: &RgbImage) -> Vec<RgbImage> {
        let block = self.options.block_size;
        let mut overviews: Vec<RgbImage> = Vec::new();
        let mut width = image.width();
        let mut height = image.height();

        while width.max(height) > block {
            let w = width.div_ceil(2).max(1);
            let h = height.div_ceil(2).max(1);
            // Nearest sampling keeps original pixel values through the
            // overview chain, consistent with the export resampling.
            let source = overviews.last().unwrap_or(image);
            let reduced = image::imageops::resize(
                source, w, h, image::imageops::FilterType::Nearest);
            overviews.push(reduced);
            width = w;
            height = h;
        }

        overviews
    }

    /// Split one level into block-sized tiles and compress them
    ///
    /// Edge tiles are padded to the full block size with zero bytes, as
    /// the TIFF tile model requires.
    fn compress_level(&self, level: &RgbImage, codec: &dyn Codec) -> ExportResult<Vec<Vec<u8>>> {
        let block = self.options.block_size;
        let cols = level.width().div_ceil(block);
        let rows = level.height().div_ceil(block);

        let indices: Vec<(u32, u32)> = (0..rows)
            .flat_map(|ty| (0..cols).map(move |tx| (tx, ty)))
            .collect();

        // Compression is the one place worker threads are allowed
        indices.par_iter()
            .map(|&(tx, ty)| {
                let raw = Self::extract_tile(level, tx, ty, block);
                codec.compress(&raw)
            })
            .collect()
    }

    /// Copy one block-sized tile out of the level, zero-padded at edges
    fn extract_tile(level: &RgbImage, tx: u32, ty: u32, block: u32) -> Vec<u8> {
        let width = level.width();
        let height = level.height();
        let x0 = tx * block;
        let y0 = ty * block;
        let copy_cols = block.min(width - x0);
        let copy_rows = block.min(height - y0);

        let src = level.as_raw();
        let row_stride = (width * PIXEL_BYTES) as usize;
        let tile_stride = (block * PIXEL_BYTES) as usize;
        let mut tile = vec![0u8; tile_stride * block as usize];

        for row in 0..copy_rows as usize {
            let src_start = (y0 as usize + row) * row_stride + (x0 * PIXEL_BYTES) as usize;
            let src_end = src_start + (copy_cols * PIXEL_BYTES) as usize;
            let dst_start = row * tile_stride;
            tile[dst_start..dst_start + (copy_cols * PIXEL_BYTES) as usize]
                .copy_from_slice(&src[src_start..src_end]);
        }

        tile
    }

    /// Build the directory for one level
    ///
    /// Tile offsets and byte counts are placeholders until layout is done;
    /// georeferencing goes on the full-resolution directory only.
    fn build_ifd(&self, level: &RgbImage, overview: bool, compression_tag: u16,
                 geo: &GeoReference, georeference: bool) -> Ifd {
        let block = self.options.block_size;
        let cols = level.width().div_ceil(block);
        let rows = level.height().div_ceil(block);
        let tile_count = (cols * rows) as usize;

        let mut ifd = Ifd::new();
        if overview {
            ifd.push(IfdEntry::longs(tags::NEW_SUBFILE_TYPE, &[1]));
        }
        ifd.push(IfdEntry::longs(tags::IMAGE_WIDTH, &[level.width()]));
        ifd.push(IfdEntry::longs(tags::IMAGE_LENGTH, &[level.height()]));
        ifd.push(IfdEntry::shorts(tags::BITS_PER_SAMPLE, &[8, 8, 8]));
        ifd.push(IfdEntry::shorts(tags::COMPRESSION, &[compression_tag]));
        // 2 = RGB
        ifd.push(IfdEntry::shorts(tags::PHOTOMETRIC_INTERPRETATION, &[2]));
        ifd.push(IfdEntry::shorts(tags::SAMPLES_PER_PIXEL, &[3]));
        // 1 = chunky (interleaved)
        ifd.push(IfdEntry::shorts(tags::PLANAR_CONFIGURATION, &[1]));
        ifd.push(IfdEntry::shorts(tags::TILE_WIDTH, &[block as u16]));
        ifd.push(IfdEntry::shorts(tags::TILE_LENGTH, &[block as u16]));
        ifd.push(IfdEntry::longs(tags::TILE_OFFSETS, &vec![0u32; tile_count]));
        ifd.push(IfdEntry::longs(tags::TILE_BYTE_COUNTS, &vec![0u32; tile_count]));

        if georeference {
            ifd.push(IfdEntry::ascii(
                tags::SOFTWARE,
                concat!("cogfetch ", env!("CARGO_PKG_VERSION"))));
            ifd.push(IfdEntry::doubles(
                tags::MODEL_PIXEL_SCALE,
                &[geo.pixel_size_x, geo.pixel_size_y, 0.0]));
            // Ties raster (0,0) to the world top-left corner
            ifd.push(IfdEntry::doubles(
                tags::MODEL_TIEPOINT,
                &[0.0, 0.0, 0.0, geo.origin_x, geo.origin_y, 0.0]));
            ifd.push(IfdEntry::shorts(
                tags::GEO_KEY_DIRECTORY,
                &Self::geo_key_directory(geo.wkid)));
            if let Ok(crs) = SpatialRef::from_wkid(geo.wkid) {
                ifd.push(IfdEntry::ascii(
                    tags::GEO_ASCII_PARAMS,
                    &format!("{}|", crs.proj_string())));
            }
        }

        ifd
    }

    /// GeoKey directory: model type, raster type, and the CRS code
    fn geo_key_directory(wkid: u32) -> Vec<u16> {
        let geographic = SpatialRef::from_wkid(wkid)
            .map(|crs| crs.is_geographic())
            .unwrap_or(false);
        // Codes above the SHORT range are recorded as user-defined
        let code = u16::try_from(wkid).unwrap_or(32767);

        let mut keys = vec![1, 1, 0, 3];
        keys.extend_from_slice(&[
            GT_MODEL_TYPE, 0, 1,
            if geographic { MODEL_TYPE_GEOGRAPHIC } else { MODEL_TYPE_PROJECTED },
        ]);
        keys.extend_from_slice(&[GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
        if geographic {
            keys.extend_from_slice(&[GEOGRAPHIC_TYPE, 0, 1, code]);
        } else {
            keys.extend_from_slice(&[PROJECTED_CS_TYPE, 0, 1, code]);
        }
        keys
    }

    /// Assign external-area offsets to every oversized payload
    fn place_external(ifds: &[Ifd], base: u64) -> HashMap<(usize, u16), u64> {
        let mut offsets = HashMap::new();
        let mut offset = base;
        for (i, ifd) in ifds.iter().enumerate() {
            for entry in ifd.sorted_entries() {
                if !entry.is_inline() {
                    offsets.insert((i, entry.tag), offset);
                    offset += align4(entry.payload.len() as u64);
                }
            }
        }
        offsets
    }

    /// Classic little-endian TIFF header; the first IFD starts right after
    fn write_header(&self, writer: &mut impl Write) -> ExportResult<()> {
        writer.write_all(&[0x49, 0x49])?;
        writer.write_u16::<LittleEndian>(42)?;
        writer.write_u32::<LittleEndian>(8)?;
        Ok(())
    }

    /// Write one directory with inline values or external offsets
    fn write_ifd(writer: &mut impl Write, ifd: &Ifd, index: usize, next_offset: u64,
                 external_offsets: &HashMap<(usize, u16), u64>) -> ExportResult<()> {
        let entries = ifd.sorted_entries();
        writer.write_u16::<LittleEndian>(entries.len() as u16)?;

        for entry in entries {
            writer.write_u16::<LittleEndian>(entry.tag)?;
            writer.write_u16::<LittleEndian>(entry.field_type)?;
            writer.write_u32::<LittleEndian>(entry.count)?;

            if entry.is_inline() {
                let mut value = [0u8; 4];
                value[..entry.payload.len()].copy_from_slice(&entry.payload);
                writer.write_all(&value)?;
            } else {
                let offset = external_offsets[&(index, entry.tag)];
                writer.write_u32::<LittleEndian>(offset as u32)?;
            }
        }

        writer.write_u32::<LittleEndian>(next_offset as u32)?;
        Ok(())
    }

    /// Write every external payload in layout order
    fn write_external(writer: &mut impl Write, ifds: &[Ifd]) -> ExportResult<()> {
        for ifd in ifds {
            for entry in ifd.sorted_entries() {
                if !entry.is_inline() {
                    writer.write_all(&entry.payload)?;
                    Self::write_padding(writer, entry.payload.len())?;
                }
            }
        }
        Ok(())
    }

    /// Pad to the next 4-byte boundary
    fn write_padding(writer: &mut impl Write, len: usize) -> ExportResult<()> {
        let padding = (4 - (len % 4)) % 4;
        if padding > 0 {
            writer.write_all(&[0u8; 3][..padding])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::codec::DeflateCodec;
    use super::super::ifd::field_types;
    use super::*;
    use byteorder::ReadBytesExt;
    use std::io::{Cursor, Read, Seek, SeekFrom};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    fn geo() -> GeoReference {
        GeoReference {
            origin_x: 1000.0,
            origin_y: 2000.0,
            pixel_size_x: 0.5,
            pixel_size_y: 0.5,
            wkid: 2868,
        }
    }

    /// Minimal reader for the structures the writer emits
    struct TiffCheck {
        data: Vec<u8>,
    }

    impl TiffCheck {
        fn load(path: &Path) -> Self {
            TiffCheck { data: std::fs::read(path).unwrap() }
        }

        fn ifd_offsets(&self) -> Vec<u64> {
            let mut cursor = Cursor::new(&self.data);
            cursor.seek(SeekFrom::Start(4)).unwrap();
            let mut next = cursor.read_u32::<LittleEndian>().unwrap() as u64;
            let mut offsets = Vec::new();
            while next != 0 {
                offsets.push(next);
                let mut c = Cursor::new(&self.data);
                c.seek(SeekFrom::Start(next)).unwrap();
                let count = c.read_u16::<LittleEndian>().unwrap() as u64;
                c.seek(SeekFrom::Start(next + 2 + count * 12)).unwrap();
                next = c.read_u32::<LittleEndian>().unwrap() as u64;
            }
            offsets
        }

        fn tag_value(&self, ifd_offset: u64, tag: u16) -> Option<(u16, u32, u32)> {
            let mut c = Cursor::new(&self.data);
            c.seek(SeekFrom::Start(ifd_offset)).unwrap();
            let count = c.read_u16::<LittleEndian>().unwrap();
            for _ in 0..count {
                let t = c.read_u16::<LittleEndian>().unwrap();
                let ft = c.read_u16::<LittleEndian>().unwrap();
                let n = c.read_u32::<LittleEndian>().unwrap();
                let v = c.read_u32::<LittleEndian>().unwrap();
                if t == tag {
                    return Some((ft, n, v));
                }
            }
            None
        }

        fn bytes_at(&self, offset: u64, len: usize) -> Vec<u8> {
            let mut c = Cursor::new(&self.data);
            c.seek(SeekFrom::Start(offset)).unwrap();
            let mut buf = vec![0u8; len];
            c.read_exact(&mut buf).unwrap();
            buf
        }
    }

    #[test]
    fn test_header_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");
        let options = CogOptions { block_size: 16, ..Default::default() };
        CogWriter::new(&options).write(&gradient(32, 32), &geo(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..2], b"II");
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 42);
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 8);
    }

    #[test]
    fn test_overview_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");
        let options = CogOptions { block_size: 16, ..Default::default() };
        CogWriter::new(&options).write(&gradient(100, 60), &geo(), &path).unwrap();

        let check = TiffCheck::load(&path);
        let offsets = check.ifd_offsets();
        // 100x60 -> 50x30 -> 25x15 -> 13x8: three overviews
        assert_eq!(offsets.len(), 4);

        let (_, _, w0) = check.tag_value(offsets[0], tags::IMAGE_WIDTH).unwrap();
        let (_, _, w1) = check.tag_value(offsets[1], tags::IMAGE_WIDTH).unwrap();
        assert_eq!(w0, 100);
        assert_eq!(w1, 50);

        // Overviews are flagged as reduced-resolution subfiles
        assert!(check.tag_value(offsets[0], tags::NEW_SUBFILE_TYPE).is_none());
        let (_, _, subfile) = check.tag_value(offsets[1], tags::NEW_SUBFILE_TYPE).unwrap();
        assert_eq!(subfile, 1);
    }

    #[test]
    fn test_single_block_has_no_overviews() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");
        let options = CogOptions { block_size: 64, ..Default::default() };
        CogWriter::new(&options).write(&gradient(48, 48), &geo(), &path).unwrap();

        let check = TiffCheck::load(&path);
        assert_eq!(check.ifd_offsets().len(), 1);
    }

    #[test]
    fn test_deflate_tile_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");
        let options = CogOptions { block_size: 16, ..Default::default() };
        let image = gradient(16, 16);
        CogWriter::new(&options).write(&image, &geo(), &path).unwrap();

        let check = TiffCheck::load(&path);
        let offsets = check.ifd_offsets();
        let (_, count, tile_offset) = check.tag_value(offsets[0], tags::TILE_OFFSETS).unwrap();
        assert_eq!(count, 1);
        let (_, _, byte_count) = check.tag_value(offsets[0], tags::TILE_BYTE_COUNTS).unwrap();

        let compressed = check.bytes_at(tile_offset as u64, byte_count as usize);
        let raw = DeflateCodec.decompress(&compressed).unwrap();
        assert_eq!(raw.len(), 16 * 16 * 3);
        assert_eq!(&raw[..3], &image.as_raw()[..3]);
    }

    #[test]
    fn test_geotags_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");
        let options = CogOptions { block_size: 16, ..Default::default() };
        CogWriter::new(&options).write(&gradient(16, 16), &geo(), &path).unwrap();

        let check = TiffCheck::load(&path);
        let offsets = check.ifd_offsets();
        let (ft, n, scale_offset) = check.tag_value(offsets[0], tags::MODEL_PIXEL_SCALE).unwrap();
        assert_eq!(ft, field_types::DOUBLE);
        assert_eq!(n, 3);
        let scale = check.bytes_at(scale_offset as u64, 8);
        assert_eq!(f64::from_le_bytes(scale.try_into().unwrap()), 0.5);

        let (_, n, key_offset) = check.tag_value(offsets[0], tags::GEO_KEY_DIRECTORY).unwrap();
        assert_eq!(n, 16);
        let keys = check.bytes_at(key_offset as u64, 8);
        // Version 1.1.0 header
        assert_eq!(u16::from_le_bytes([keys[0], keys[1]]), 1);
    }

    #[test]
    fn test_rejects_bad_block_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");
        let options = CogOptions { block_size: 100, ..Default::default() };
        let result = CogWriter::new(&options).write(&gradient(16, 16), &geo(), &path);
        assert!(result.is_err());
    }

    #[test]
    fn test_geokey_directory_projected_vs_geographic() {
        let projected = CogWriter::geo_key_directory(2868);
        assert_eq!(projected[7], MODEL_TYPE_PROJECTED);
        assert_eq!(projected[12], PROJECTED_CS_TYPE);
        assert_eq!(projected[15], 2868);

        let geographic = CogWriter::geo_key_directory(4326);
        assert_eq!(geographic[7], MODEL_TYPE_GEOGRAPHIC);
        assert_eq!(geographic[12], GEOGRAPHIC_TYPE);
        assert_eq!(geographic[15], 4326);
    }

    #[test]
    fn test_edge_tiles_zero_padded() {
        let image = gradient(20, 20);
        let tile = CogWriter::extract_tile(&image, 1, 1, 16);
        assert_eq!(tile.len(), 16 * 16 * 3);
        // Pixel (0,0) of tile (1,1) is image pixel (16,16)
        assert_eq!(tile[0], 16);
        // Beyond the 4 copied columns everything is padding
        assert_eq!(tile[4 * 3], 0);
    }
}
