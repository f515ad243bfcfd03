//! Minimal IFD model for writing tiled GeoTIFFs
//!
//! Only the write-side subset of the TIFF structure the encoder needs:
//! entries carry their raw little-endian payload, and the writer decides
//! whether a payload is inlined into the 4-byte value field or stored in
//! the external data area.

use byteorder::{ByteOrder, LittleEndian};

/// Field types from the TIFF specification
pub mod field_types {
    /// 8-bit byte containing ASCII character
    pub const ASCII: u16 = 2;
    /// 16-bit unsigned integer
    pub const SHORT: u16 = 3;
    /// 32-bit unsigned integer
    pub const LONG: u16 = 4;
    /// Double precision IEEE floating point
    pub const DOUBLE: u16 = 12;
}

/// The TIFF tags the encoder writes
pub mod tags {
    pub const NEW_SUBFILE_TYPE: u16 = 254;
    pub const IMAGE_WIDTH: u16 = 256;
    pub const IMAGE_LENGTH: u16 = 257;
    pub const BITS_PER_SAMPLE: u16 = 258;
    pub const COMPRESSION: u16 = 259;
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262;
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    pub const PLANAR_CONFIGURATION: u16 = 284;
    pub const SOFTWARE: u16 = 305;
    pub const TILE_WIDTH: u16 = 322;
    pub const TILE_LENGTH: u16 = 323;
    pub const TILE_OFFSETS: u16 = 324;
    pub const TILE_BYTE_COUNTS: u16 = 325;
    pub const MODEL_PIXEL_SCALE: u16 = 33550;
    pub const MODEL_TIEPOINT: u16 = 33922;
    pub const GEO_KEY_DIRECTORY: u16 = 34735;
    pub const GEO_ASCII_PARAMS: u16 = 34737;
}

/// One directory entry with its raw value payload
#[derive(Debug, Clone)]
pub struct IfdEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u32,
    /// Raw little-endian value bytes
    pub payload: Vec<u8>,
}

impl IfdEntry {
    /// Entry holding SHORT values
    pub fn shorts(tag: u16, values: &[u16]) -> Self {
        let mut payload = vec![0u8; values.len() * 2];
        LittleEndian::write_u16_into(values, &mut payload);
        IfdEntry { tag, field_type: field_types::SHORT, count: values.len() as u32, payload }
    }

    /// Entry holding LONG values
    pub fn longs(tag: u16, values: &[u32]) -> Self {
        let mut payload = vec![0u8; values.len() * 4];
        LittleEndian::write_u32_into(values, &mut payload);
        IfdEntry { tag, field_type: field_types::LONG, count: values.len() as u32, payload }
    }

    /// Entry holding DOUBLE values
    pub fn doubles(tag: u16, values: &[f64]) -> Self {
        let mut payload = vec![0u8; values.len() * 8];
        LittleEndian::write_f64_into(values, &mut payload);
        IfdEntry { tag, field_type: field_types::DOUBLE, count: values.len() as u32, payload }
    }

    /// Entry holding a NUL-terminated ASCII string
    pub fn ascii(tag: u16, value: &str) -> Self {
        let mut payload = value.as_bytes().to_vec();
        payload.push(0);
        IfdEntry { tag, field_type: field_types::ASCII, count: payload.len() as u32, payload }
    }

    /// Whether the payload fits inline in the 4-byte value field
    pub fn is_inline(&self) -> bool {
        self.payload.len() <= 4
    }
}

/// An image file directory under construction
#[derive(Debug, Clone, Default)]
pub struct Ifd {
    entries: Vec<IfdEntry>,
}

impl Ifd {
    /// Create an empty directory
    pub fn new() -> Self {
        Ifd { entries: Vec::new() }
    }

    /// Add an entry, replacing any previous entry with the same tag
    pub fn push(&mut self, entry: IfdEntry) {
        self.entries.retain(|e| e.tag != entry.tag);
        self.entries.push(entry);
    }

    /// Entries sorted ascending by tag, as the TIFF spec requires
    pub fn sorted_entries(&self) -> Vec<&IfdEntry> {
        let mut sorted: Vec<&IfdEntry> = self.entries.iter().collect();
        sorted.sort_by_key(|e| e.tag);
        sorted
    }

    /// Byte size of the directory structure itself
    ///
    /// 2 bytes entry count, 12 per entry, 4 for the next-IFD offset.
    pub fn byte_size(&self) -> u64 {
        2 + 12 * self.entries.len() as u64 + 4
    }

    /// Total bytes of payloads too large to inline, each 4-byte aligned
    pub fn external_size(&self) -> u64 {
        self.entries.iter()
            .filter(|e| !e.is_inline())
            .map(|e| align4(e.payload.len() as u64))
            .sum()
    }

    /// Look up an entry by tag
    pub fn get(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Replace an entry's payload in place, keeping type and count rules
    pub fn set_longs(&mut self, tag: u16, values: &[u32]) {
        self.push(IfdEntry::longs(tag, values));
    }
}

/// Round an offset up to the next 4-byte boundary
pub fn align4(offset: u64) -> u64 {
    (offset + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_entry_inline() {
        let entry = IfdEntry::shorts(tags::COMPRESSION, &[8]);
        assert!(entry.is_inline());
        assert_eq!(entry.count, 1);
        assert_eq!(entry.payload, vec![8, 0]);
    }

    #[test]
    fn test_three_shorts_external() {
        let entry = IfdEntry::shorts(tags::BITS_PER_SAMPLE, &[8, 8, 8]);
        assert!(!entry.is_inline());
        assert_eq!(entry.payload.len(), 6);
    }

    #[test]
    fn test_doubles_little_endian() {
        let entry = IfdEntry::doubles(tags::MODEL_PIXEL_SCALE, &[1.0]);
        assert_eq!(entry.payload, 1.0f64.to_le_bytes().to_vec());
    }

    #[test]
    fn test_ascii_nul_terminated() {
        let entry = IfdEntry::ascii(tags::SOFTWARE, "abc");
        assert_eq!(entry.payload, b"abc\0".to_vec());
        assert_eq!(entry.count, 4);
    }

    #[test]
    fn test_push_replaces_same_tag() {
        let mut ifd = Ifd::new();
        ifd.push(IfdEntry::shorts(tags::COMPRESSION, &[1]));
        ifd.push(IfdEntry::shorts(tags::COMPRESSION, &[8]));
        assert_eq!(ifd.sorted_entries().len(), 1);
        assert_eq!(ifd.get(tags::COMPRESSION).unwrap().payload[0], 8);
    }

    #[test]
    fn test_sorted_by_tag() {
        let mut ifd = Ifd::new();
        ifd.push(IfdEntry::shorts(tags::TILE_WIDTH, &[512]));
        ifd.push(IfdEntry::longs(tags::IMAGE_WIDTH, &[100]));
        let tags_in_order: Vec<u16> = ifd.sorted_entries().iter().map(|e| e.tag).collect();
        assert_eq!(tags_in_order, vec![tags::IMAGE_WIDTH, tags::TILE_WIDTH]);
    }

    #[test]
    fn test_alignment() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(4), 4);
        assert_eq!(align4(6), 8);
    }
}
