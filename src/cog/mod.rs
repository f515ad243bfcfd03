//! Cloud Optimized GeoTIFF encoding
//!
//! A purpose-built writer for the pipeline's single output shape: 8-bit
//! RGB rasters in an internally tiled, compressed layout with embedded
//! reduced-resolution overviews and GeoTIFF georeferencing.

mod codec;
mod ifd;
mod writer;

pub use self::codec::{codec_for_name, Codec, DeflateCodec, RawCodec, ZstdCodec};
pub use self::writer::{CogOptions, CogWriter, GeoReference};
