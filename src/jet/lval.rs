//! Long-value (LVAL) overflow storage (§4.3).
//!
//! Large column values (long TEXT/MEMO, OLE) are stored outside the row
//! that references them. The 12-byte [`LvalDef`] records how: fully
//! inline, as a single row on another page, or as a chain of rows spread
//! across multiple pages — the same `[length][next-pointer]`-per-chunk
//! shape as the teacher's old-style InnoDB BLOB chain in `lob.rs`, just
//! little-endian and keyed by `(row, page)` instead of a raw page number.

use crate::jet::bytes::{read_i24_le, read_u24_le, write_u24_le};
use crate::jet::format::JetFormat;
use crate::jet::page_channel::PageChannel;
use crate::jet::row::{add_data_page_row, init_data_page, row_data};
use crate::JetError;

const LVAL_TYPE_INLINE: u8 = 0x80;
const LVAL_TYPE_OTHER_PAGE: u8 = 0x40;
const LVAL_TYPE_OTHER_PAGES: u8 = 0x00;

/// The 12-byte definition pointing at (or embedding) a long value.
#[derive(Debug, Clone, PartialEq)]
pub struct LvalDef {
    pub length: i32,
    pub kind: LvalKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LvalKind {
    Inline { data: Vec<u8> },
    OtherPage { row: u8, page: u32 },
    OtherPages { row: u8, page: u32 },
}

impl LvalDef {
    /// Parse a 12-byte LVAL definition, followed by its inline payload
    /// when `kind` is inline.
    pub fn parse(bytes: &[u8]) -> Result<Self, JetError> {
        if bytes.len() < 12 {
            return Err(JetError::Format("LVAL definition shorter than 12 bytes".into()));
        }
        let length = read_i24_le(&bytes[0..3]);
        let type_byte = bytes[3];
        let row = bytes[4];
        let page = read_u24_le(&bytes[5..8]);

        let kind = match type_byte {
            LVAL_TYPE_INLINE => LvalKind::Inline {
                data: bytes[12..].to_vec(),
            },
            LVAL_TYPE_OTHER_PAGE => LvalKind::OtherPage { row, page },
            LVAL_TYPE_OTHER_PAGES => LvalKind::OtherPages { row, page },
            other => {
                return Err(JetError::Format(format!(
                    "unknown LVAL type byte 0x{:02x}",
                    other
                )))
            }
        };
        Ok(LvalDef { length, kind })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; 12];
        write_u24_le(&mut out[0..3], (self.length as u32) & 0x00FF_FFFF);
        match &self.kind {
            LvalKind::Inline { data } => {
                out[3] = LVAL_TYPE_INLINE;
                out.extend_from_slice(data);
            }
            LvalKind::OtherPage { row, page } => {
                out[3] = LVAL_TYPE_OTHER_PAGE;
                out[4] = *row;
                write_u24_le(&mut out[5..8], *page);
            }
            LvalKind::OtherPages { row, page } => {
                out[3] = LVAL_TYPE_OTHER_PAGES;
                out[4] = *row;
                write_u24_le(&mut out[5..8], *page);
            }
        }
        out
    }
}

/// Read the full byte payload referenced by `def`. Negative (sentinel)
/// lengths are tolerated by returning `None` rather than failing (§4.3).
pub fn read(def: &LvalDef, channel: &mut PageChannel) -> Result<Option<Vec<u8>>, JetError> {
    if def.length < 0 {
        return Ok(None);
    }
    match &def.kind {
        LvalKind::Inline { data } => Ok(Some(data.clone())),
        LvalKind::OtherPage { row, page } => {
            let mut buf = channel.create_page_buffer();
            channel.read_page(&mut buf, *page)?;
            Ok(Some(row_data(&buf, *row)?.to_vec()))
        }
        LvalKind::OtherPages { row, page } => {
            let mut out = Vec::with_capacity(def.length.max(0) as usize);
            let mut current_row = *row;
            let mut current_page = *page;
            loop {
                let mut buf = channel.create_page_buffer();
                channel.read_page(&mut buf, current_page)?;
                let chunk = row_data(&buf, current_row)?;
                if chunk.len() < 4 {
                    return Err(JetError::Format("other-pages LVAL chunk too short".into()));
                }
                let next_row = chunk[0];
                let next_page = read_u24_le(&chunk[1..4]);
                out.extend_from_slice(&chunk[4..]);
                if next_row == 0 && next_page == 0 {
                    break;
                }
                current_row = next_row;
                current_page = next_page;
            }
            Ok(Some(out))
        }
    }
}

/// Write `data` as a long value, choosing inline / other-page / other-pages
/// encoding per the write policy in §4.3. `remaining_row_length` is the
/// budget left in the referencing row for this column's LVAL definition.
pub fn write(
    data: &[u8],
    remaining_row_length: usize,
    format: &JetFormat,
    channel: &mut PageChannel,
    tdef_page: u32,
) -> Result<LvalDef, JetError> {
    let length = data.len() as i32;

    if data.len() + 12 <= remaining_row_length && data.len() <= format.max_inline_long_value_size {
        return Ok(LvalDef {
            length,
            kind: LvalKind::Inline { data: data.to_vec() },
        });
    }

    if data.len() <= format.max_long_value_row_size {
        let (row, page) = write_single_page_row(data, format, channel, tdef_page)?;
        return Ok(LvalDef {
            length,
            kind: LvalKind::OtherPage { row, page },
        });
    }

    let chunk_size = format.max_long_value_row_size - 4;
    let mut chunks: Vec<&[u8]> = data.chunks(chunk_size).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }

    // Allocate pages back-to-front so each chunk's next-pointer is known
    // before it is written.
    let mut next_row = 0u8;
    let mut next_page = 0u32;
    for (i, chunk) in chunks.iter().enumerate().rev() {
        let mut row_bytes = Vec::with_capacity(4 + chunk.len());
        if i == chunks.len() - 1 {
            row_bytes.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            row_bytes.push(next_row);
            let mut page_bytes = [0u8; 3];
            write_u24_le(&mut page_bytes, next_page);
            row_bytes.extend_from_slice(&page_bytes);
        }
        row_bytes.extend_from_slice(chunk);

        let page_number = channel.allocate_new_page()?;
        let mut buf = channel.create_page_buffer();
        init_data_page(&mut buf, format, tdef_page);
        let row_number = add_data_page_row(&mut buf, format, &row_bytes, 0)?;
        channel.write_page(&buf, page_number)?;

        next_row = row_number;
        next_page = page_number;
    }

    Ok(LvalDef {
        length,
        kind: LvalKind::OtherPages {
            row: next_row,
            page: next_page,
        },
    })
}

fn write_single_page_row(
    data: &[u8],
    format: &JetFormat,
    channel: &mut PageChannel,
    tdef_page: u32,
) -> Result<(u8, u32), JetError> {
    let page_number = channel.allocate_new_page()?;
    let mut buf = channel.create_page_buffer();
    init_data_page(&mut buf, format, tdef_page);
    let row_number = add_data_page_row(&mut buf, format, data, 0)?;
    channel.write_page(&buf, page_number)?;
    Ok((row_number, page_number))
}

/// Round-trip `def`'s byte representation through [`LvalDef::parse`], used
/// by the table manager when re-reading a just-written definition.
pub fn to_bytes(def: &LvalDef) -> Vec<u8> {
    def.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn open_channel(pages: usize, format: &JetFormat) -> (NamedTempFile, PageChannel) {
        let tmp = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp.as_file(), &vec![0u8; pages * format.page_size]).unwrap();
        let channel = PageChannel::open(tmp.path(), format, false, false).unwrap();
        (tmp, channel)
    }

    #[test]
    fn small_value_is_inlined() {
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        let def = write(b"hello", 4096, &format, &mut channel, 3).unwrap();
        assert!(matches!(def.kind, LvalKind::Inline { .. }));
        let read_back = read(&def, &mut channel).unwrap().unwrap();
        assert_eq!(read_back, b"hello");
    }

    #[test]
    fn medium_value_uses_other_page() {
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        let payload = vec![0xAB; 4000];
        let def = write(&payload, 20, &format, &mut channel, 3).unwrap();
        assert!(matches!(def.kind, LvalKind::OtherPage { .. }));
        let read_back = read(&def, &mut channel).unwrap().unwrap();
        assert_eq!(read_back, payload);
    }

    #[test]
    fn large_value_chains_other_pages() {
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let def = write(&payload, 20, &format, &mut channel, 3).unwrap();
        assert!(matches!(def.kind, LvalKind::OtherPages { .. }));
        let read_back = read(&def, &mut channel).unwrap().unwrap();
        assert_eq!(read_back, payload);
    }

    #[test]
    fn negative_length_reads_as_null() {
        let def = LvalDef {
            length: -1,
            kind: LvalKind::Inline { data: vec![] },
        };
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        assert_eq!(read(&def, &mut channel).unwrap(), None);
    }

    #[test]
    fn def_bytes_round_trip_through_parse() {
        let def = LvalDef {
            length: 42,
            kind: LvalKind::OtherPage { row: 3, page: 7 },
        };
        let bytes = to_bytes(&def);
        let parsed = LvalDef::parse(&bytes).unwrap();
        assert_eq!(parsed, def);
    }
}
