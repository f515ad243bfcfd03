//! Tile compression codecs
//!
//! Each codec maps to a TIFF compression tag value. DEFLATE is the
//! default output compression; NONE and ZSTD are selectable.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::errors::{ExportError, ExportResult};

/// A block compression scheme for raster tiles
pub trait Codec: Send + Sync {
    /// Compress one tile's raw pixel data
    fn compress(&self, data: &[u8]) -> ExportResult<Vec<u8>>;

    /// Decompress one tile back to raw pixel data
    fn decompress(&self, data: &[u8]) -> ExportResult<Vec<u8>>;

    /// TIFF compression tag value
    fn tag(&self) -> u16;

    /// Canonical scheme name
    fn name(&self) -> &'static str;
}

/// Passthrough codec (TIFF compression 1)
pub struct RawCodec;

impl Codec for RawCodec {
    fn compress(&self, data: &[u8]) -> ExportResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> ExportResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn tag(&self) -> u16 {
        1
    }

    fn name(&self) -> &'static str {
        "NONE"
    }
}

/// Adobe Deflate codec, zlib streams (TIFF compression 8)
pub struct DeflateCodec;

impl Codec for DeflateCodec {
    fn compress(&self, data: &[u8]) -> ExportResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).map_err(ExportError::Io)?;
        encoder.finish().map_err(ExportError::Io)
    }

    fn decompress(&self, data: &[u8]) -> ExportResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(ExportError::Io)?;
        Ok(out)
    }

    fn tag(&self) -> u16 {
        8
    }

    fn name(&self) -> &'static str {
        "DEFLATE"
    }
}

/// Zstandard codec (TIFF compression 50000)
pub struct ZstdCodec;

impl Codec for ZstdCodec {
    fn compress(&self, data: &[u8]) -> ExportResult<Vec<u8>> {
        zstd::encode_all(data, 0).map_err(ExportError::Io)
    }

    fn decompress(&self, data: &[u8]) -> ExportResult<Vec<u8>> {
        zstd::decode_all(data).map_err(ExportError::Io)
    }

    fn tag(&self) -> u16 {
        50_000
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }
}

/// Look up a codec by its case-insensitive scheme name
pub fn codec_for_name(name: &str) -> ExportResult<Box<dyn Codec>> {
    match name.to_uppercase().as_str() {
        "NONE" | "RAW" => Ok(Box::new(RawCodec)),
        "DEFLATE" => Ok(Box::new(DeflateCodec)),
        "ZSTD" => Ok(Box::new(ZstdCodec)),
        other => Err(ExportError::Parse(format!(
            "Unsupported compression scheme: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        (0..4096u32).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_deflate_roundtrip() {
        let codec = DeflateCodec;
        let data = sample();
        let compressed = codec.compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(codec.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_zstd_roundtrip() {
        let codec = ZstdCodec;
        let data = sample();
        let compressed = codec.compress(&data).unwrap();
        assert_eq!(codec.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_raw_is_identity() {
        let codec = RawCodec;
        let data = sample();
        assert_eq!(codec.compress(&data).unwrap(), data);
    }

    #[test]
    fn test_codec_lookup() {
        assert_eq!(codec_for_name("deflate").unwrap().tag(), 8);
        assert_eq!(codec_for_name("ZSTD").unwrap().tag(), 50_000);
        assert_eq!(codec_for_name("none").unwrap().tag(), 1);
        assert!(codec_for_name("JPEG").is_err());
    }
}
