//! Page-ownership usage maps (§3 Usage map, §4.1).
//!
//! A usage map is a compact bitmap recording which pages belong to a table
//! (the "owned pages" map) or which of a table's data pages still have free
//! space (the "free-space pages" map). Two on-disk variants exist: an
//! inline bitmap starting at a given page, and a reference variant whose
//! header points at further usage-map pages for tables too large to fit in
//! one inline bitmap.

use byteorder::{ByteOrder, LittleEndian};

use crate::jet::format::JetFormat;
use crate::jet::page_channel::PageChannel;
use crate::JetError;

const MAP_TYPE_INLINE: u8 = 0x00;
const MAP_TYPE_REFERENCE: u8 = 0x01;

/// A page-ownership bitmap, either held entirely inline or spread across
/// reference pages.
#[derive(Debug, Clone)]
pub enum UsageMap {
    /// Bitmap bytes plus the page number the first bit refers to.
    Inline { start_page: u32, bitmap: Vec<u8> },
    /// One inline bitmap per referenced usage-map page, each with its own
    /// starting page number.
    Reference {
        map_pages: Vec<u32>,
        bitmaps: Vec<(u32, Vec<u8>)>,
    },
}

impl UsageMap {
    /// Parse a usage map from the bytes stored inline in a table
    /// definition (or another owning structure). `data` begins with the
    /// one-byte map type discriminant.
    pub fn parse(data: &[u8], channel: &mut PageChannel) -> Result<Self, JetError> {
        if data.is_empty() {
            return Err(JetError::Format("empty usage map data".into()));
        }
        match data[0] {
            MAP_TYPE_INLINE => {
                let start_page = LittleEndian::read_u32(&data[1..5]);
                Ok(UsageMap::Inline {
                    start_page,
                    bitmap: data[5..].to_vec(),
                })
            }
            MAP_TYPE_REFERENCE => {
                let map_page_count = (data.len() - 1) / 4;
                let mut map_pages = Vec::with_capacity(map_page_count);
                let mut bitmaps = Vec::with_capacity(map_page_count);
                for i in 0..map_page_count {
                    let page = LittleEndian::read_u32(&data[1 + i * 4..5 + i * 4]);
                    if page == crate::jet::format::INVALID_PAGE_NUMBER {
                        continue;
                    }
                    map_pages.push(page);
                    let mut buf = channel.create_page_buffer();
                    channel.read_page(&mut buf, page)?;
                    let start_page = LittleEndian::read_u32(&buf[1..5]);
                    bitmaps.push((start_page, buf[5..].to_vec()));
                }
                Ok(UsageMap::Reference { map_pages, bitmaps })
            }
            other => Err(JetError::Format(format!(
                "unknown usage map type byte 0x{:02x}",
                other
            ))),
        }
    }

    /// Create a fresh, empty inline usage map rooted at `start_page`.
    pub fn new_inline(start_page: u32, format: &JetFormat) -> Self {
        UsageMap::Inline {
            start_page,
            bitmap: vec![0u8; format.usage_map_table_byte_length],
        }
    }

    /// Returns `true` if `page_number` is marked as owned/used in this map.
    pub fn contains(&self, page_number: u32) -> bool {
        match self {
            UsageMap::Inline { start_page, bitmap } => {
                bit_at(*start_page, bitmap, page_number).unwrap_or(false)
            }
            UsageMap::Reference { bitmaps, .. } => bitmaps
                .iter()
                .any(|(start, bitmap)| bit_at(*start, bitmap, page_number).unwrap_or(false)),
        }
    }

    /// Mark `page_number` as owned/used. Returns `Err` if the page falls
    /// outside every bitmap's addressable range (the reference variant's
    /// extra map pages are not auto-allocated here; callers extend the map
    /// at table-creation time instead).
    pub fn set(&mut self, page_number: u32, value: bool) -> Result<(), JetError> {
        match self {
            UsageMap::Inline { start_page, bitmap } => {
                set_bit_at(*start_page, bitmap, page_number, value)
            }
            UsageMap::Reference { bitmaps, .. } => {
                for (start, bitmap) in bitmaps.iter_mut() {
                    if set_bit_at(*start, bitmap, page_number, value).is_ok() {
                        return Ok(());
                    }
                }
                Err(JetError::Format(format!(
                    "page {} is outside every reference usage-map bitmap",
                    page_number
                )))
            }
        }
    }

    /// Iterate over every page number currently marked in the map.
    pub fn iter_pages(&self) -> Vec<u32> {
        let mut pages = Vec::new();
        match self {
            UsageMap::Inline { start_page, bitmap } => collect_pages(*start_page, bitmap, &mut pages),
            UsageMap::Reference { bitmaps, .. } => {
                for (start, bitmap) in bitmaps {
                    collect_pages(*start, bitmap, &mut pages);
                }
            }
        }
        pages
    }

    /// Serialize back to the on-disk inline-map byte representation
    /// (reference maps persist their referenced pages separately via
    /// [`flush`](Self::flush)).
    pub fn to_inline_bytes(&self) -> Vec<u8> {
        match self {
            UsageMap::Inline { start_page, bitmap } => {
                let mut out = Vec::with_capacity(5 + bitmap.len());
                out.push(MAP_TYPE_INLINE);
                let mut start_buf = [0u8; 4];
                LittleEndian::write_u32(&mut start_buf, *start_page);
                out.extend_from_slice(&start_buf);
                out.extend_from_slice(bitmap);
                out
            }
            UsageMap::Reference { map_pages, .. } => {
                let mut out = Vec::with_capacity(1 + map_pages.len() * 4);
                out.push(MAP_TYPE_REFERENCE);
                for page in map_pages {
                    let mut buf = [0u8; 4];
                    LittleEndian::write_u32(&mut buf, *page);
                    out.extend_from_slice(&buf);
                }
                out
            }
        }
    }

    /// Write each referenced bitmap page back to disk (no-op for inline
    /// maps, whose bytes are embedded in the owning table definition).
    pub fn flush(&self, channel: &mut PageChannel) -> Result<(), JetError> {
        if let UsageMap::Reference { map_pages, bitmaps } = self {
            for (page, (start_page, bitmap)) in map_pages.iter().zip(bitmaps) {
                let mut buf = channel.create_page_buffer();
                buf[0] = 0x05; // UsageMap page type
                LittleEndian::write_u32(&mut buf[1..5], *start_page);
                buf[5..5 + bitmap.len()].copy_from_slice(bitmap);
                channel.write_page(&buf, *page)?;
            }
        }
        Ok(())
    }
}

fn bit_at(start_page: u32, bitmap: &[u8], page_number: u32) -> Option<bool> {
    if page_number < start_page {
        return None;
    }
    let bit_index = (page_number - start_page) as usize;
    let byte_index = bit_index / 8;
    if byte_index >= bitmap.len() {
        return None;
    }
    Some(bitmap[byte_index] & (1 << (bit_index % 8)) != 0)
}

fn set_bit_at(start_page: u32, bitmap: &mut [u8], page_number: u32, value: bool) -> Result<(), JetError> {
    if page_number < start_page {
        return Err(JetError::Format(format!(
            "page {} precedes usage map start page {}",
            page_number, start_page
        )));
    }
    let bit_index = (page_number - start_page) as usize;
    let byte_index = bit_index / 8;
    if byte_index >= bitmap.len() {
        return Err(JetError::Format(format!(
            "page {} is beyond usage map bitmap length",
            page_number
        )));
    }
    if value {
        bitmap[byte_index] |= 1 << (bit_index % 8);
    } else {
        bitmap[byte_index] &= !(1 << (bit_index % 8));
    }
    Ok(())
}

fn collect_pages(start_page: u32, bitmap: &[u8], out: &mut Vec<u32>) {
    for (byte_index, byte) in bitmap.iter().enumerate() {
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                out.push(start_page + (byte_index * 8 + bit) as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_set_and_contains() {
        let fmt = JetFormat::jet4();
        let mut map = UsageMap::new_inline(10, &fmt);
        assert!(!map.contains(10));
        map.set(10, true).unwrap();
        map.set(12, true).unwrap();
        assert!(map.contains(10));
        assert!(map.contains(12));
        assert!(!map.contains(11));
    }

    #[test]
    fn inline_unset_clears_bit() {
        let fmt = JetFormat::jet4();
        let mut map = UsageMap::new_inline(0, &fmt);
        map.set(3, true).unwrap();
        map.set(3, false).unwrap();
        assert!(!map.contains(3));
    }

    #[test]
    fn iter_pages_returns_all_set_bits() {
        let fmt = JetFormat::jet4();
        let mut map = UsageMap::new_inline(100, &fmt);
        map.set(100, true).unwrap();
        map.set(105, true).unwrap();
        map.set(109, true).unwrap();
        let mut pages = map.iter_pages();
        pages.sort_unstable();
        assert_eq!(pages, vec![100, 105, 109]);
    }

    #[test]
    fn set_before_start_page_errors() {
        let fmt = JetFormat::jet4();
        let mut map = UsageMap::new_inline(50, &fmt);
        assert!(map.set(10, true).is_err());
    }

    #[test]
    fn to_inline_bytes_roundtrips_via_parse() {
        let fmt = JetFormat::jet4();
        let mut map = UsageMap::new_inline(7, &fmt);
        map.set(7, true).unwrap();
        map.set(8, true).unwrap();
        let bytes = map.to_inline_bytes();

        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp.as_file(), &vec![0u8; fmt.page_size]).unwrap();
        let mut channel = PageChannel::open(tmp.path(), &fmt, false, false).unwrap();

        let parsed = UsageMap::parse(&bytes, &mut channel).unwrap();
        assert!(parsed.contains(7));
        assert!(parsed.contains(8));
        assert!(!parsed.contains(9));
    }
}
