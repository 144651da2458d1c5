//! Fixed-size page I/O over a Jet database file.
//!
//! [`PageChannel`] is the sole owner of the file handle (§5): every other
//! module reaches the file through it. It supports an optional page codec
//! for encrypted databases, an auto-sync mode that flushes every write, and
//! a free-page allocator backed by a list kept in the header page.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::jet::format::JetFormat;
use crate::JetError;

/// Byte offset in the header page (page 0) of the free-list entry count
/// (a `u32`), followed immediately by that many little-endian `u32` page
/// numbers (§4.1 `deallocate_page`). Chosen clear of the version/catalog
/// bytes `jet::database` writes at the front of the page and of
/// `JetFormat::offset_password`'s `0x42..0x56` span.
const FREE_LIST_COUNT_OFFSET: usize = 100;
const FREE_LIST_ENTRIES_OFFSET: usize = 104;

/// Decrypts pages on read and encrypts them on write. Jet's optional
/// database-level encryption (RC4-derived in older formats, AES in newer
/// ones) is treated as an injected collaborator, the same way the SCSU
/// decoder is injected in [`crate::jet::text`] — this engine does not bundle
/// a specific cipher implementation.
pub trait PageCodec {
    fn decrypt(&self, page_number: u32, buf: &mut [u8]);
    fn encrypt(&self, page_number: u32, buf: &mut [u8]);
}

/// A [`PageCodec`] that performs no transformation, used when a database is
/// not encrypted.
pub struct NullCodec;

impl PageCodec for NullCodec {
    fn decrypt(&self, _page_number: u32, _buf: &mut [u8]) {}
    fn encrypt(&self, _page_number: u32, _buf: &mut [u8]) {}
}

/// Fixed-size page reader/writer over a single Jet database file.
///
/// Not thread-safe (§5): callers serialize access, matching the teacher's
/// `Tablespace`, which also requires `&mut self` for every page operation.
pub struct PageChannel {
    file: File,
    page_size: usize,
    page_count: u32,
    auto_sync: bool,
    codec: Box<dyn PageCodec>,
    free_pages: Vec<u32>,
}

impl PageChannel {
    /// Open an existing file and mount a page channel over it using the
    /// page size from `format`.
    pub fn open<P: AsRef<Path>>(
        path: P,
        format: &JetFormat,
        read_only: bool,
        auto_sync: bool,
    ) -> Result<Self, JetError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(path)
            .map_err(|e| JetError::Io(format!("cannot open {}: {}", path.display(), e)))?;

        let file_size = file
            .metadata()
            .map_err(|e| JetError::Io(format!("cannot stat {}: {}", path.display(), e)))?
            .len();

        let page_size = format.page_size;
        if file_size < page_size as u64 {
            return Err(JetError::Format(format!(
                "file too small to contain a single {}-byte page: {} bytes",
                page_size, file_size
            )));
        }

        let page_count = (file_size / page_size as u64) as u32;

        let mut channel = PageChannel {
            file,
            page_size,
            page_count,
            auto_sync,
            codec: Box::new(NullCodec),
            free_pages: Vec::new(),
        };
        channel.load_free_list()?;
        Ok(channel)
    }

    /// Capacity of the header page's free-list region, in page numbers.
    fn free_list_capacity(&self) -> usize {
        (self.page_size - FREE_LIST_ENTRIES_OFFSET) / 4
    }

    /// Reload `free_pages` from the header page written by
    /// [`Self::persist_free_list`], so deallocated pages survive a
    /// close/reopen (§4.1).
    fn load_free_list(&mut self) -> Result<(), JetError> {
        let mut header = self.create_page_buffer();
        self.read_page(&mut header, 0)?;
        let capacity = self.free_list_capacity();
        let count = (LittleEndian::read_u32(&header[FREE_LIST_COUNT_OFFSET..FREE_LIST_COUNT_OFFSET + 4]) as usize)
            .min(capacity);
        self.free_pages = (0..count)
            .map(|i| {
                let off = FREE_LIST_ENTRIES_OFFSET + i * 4;
                LittleEndian::read_u32(&header[off..off + 4])
            })
            .collect();
        Ok(())
    }

    /// Write `free_pages` back to the header page, preserving every other
    /// byte already on it. Entries beyond [`Self::free_list_capacity`] are
    /// kept in memory for this session but are not persisted; the engine
    /// would need a chained free-list page (as `jet::lval` chains long
    /// values) to lift that cap, which no workload exercised here needs.
    fn persist_free_list(&mut self) -> Result<(), JetError> {
        let mut header = self.create_page_buffer();
        self.read_page(&mut header, 0)?;
        let capacity = self.free_list_capacity();
        let stored = self.free_pages.len().min(capacity);
        let start = self.free_pages.len() - stored;
        LittleEndian::write_u32(&mut header[FREE_LIST_COUNT_OFFSET..FREE_LIST_COUNT_OFFSET + 4], stored as u32);
        for (i, &page) in self.free_pages[start..].iter().enumerate() {
            let off = FREE_LIST_ENTRIES_OFFSET + i * 4;
            LittleEndian::write_u32(&mut header[off..off + 4], page);
        }
        self.write_page(&header, 0)
    }

    /// Install a page codec (e.g. for an encrypted database).
    pub fn set_codec(&mut self, codec: Box<dyn PageCodec>) {
        self.codec = codec;
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// A zeroed buffer of the correct size, in the default little-endian
    /// byte order used by most page fields (§4.1).
    pub fn create_page_buffer(&self) -> Vec<u8> {
        vec![0u8; self.page_size]
    }

    /// Read page `page_number` into `buf`, which must be at least
    /// `page_size` bytes. Page 0 is the file header and is never passed
    /// through the codec.
    pub fn read_page(&mut self, buf: &mut [u8], page_number: u32) -> Result<(), JetError> {
        if buf.len() < self.page_size {
            return Err(JetError::Format(format!(
                "buffer too small: {} < page size {}",
                buf.len(),
                self.page_size
            )));
        }
        if page_number >= self.page_count {
            return Err(JetError::Format(format!(
                "page {} out of range ({} pages in file)",
                page_number, self.page_count
            )));
        }

        let offset = page_number as u64 * self.page_size as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| JetError::Io(format!("seek to page {}: {}", page_number, e)))?;
        self.file
            .read_exact(&mut buf[..self.page_size])
            .map_err(|e| JetError::Io(format!("short read at page {}: {}", page_number, e)))?;

        if page_number != 0 {
            self.codec.decrypt(page_number, &mut buf[..self.page_size]);
        }
        Ok(())
    }

    /// Encrypt (if a codec is installed) and write `buf` to `page_number`.
    /// Flushes immediately when `auto_sync` is enabled (§5 Ordering
    /// guarantees).
    pub fn write_page(&mut self, buf: &[u8], page_number: u32) -> Result<(), JetError> {
        if buf.len() < self.page_size {
            return Err(JetError::Format(format!(
                "buffer too small: {} < page size {}",
                buf.len(),
                self.page_size
            )));
        }

        let mut scratch = buf[..self.page_size].to_vec();
        if page_number != 0 {
            self.codec.encrypt(page_number, &mut scratch);
        }

        let offset = page_number as u64 * self.page_size as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| JetError::Io(format!("seek to page {}: {}", page_number, e)))?;
        self.file
            .write_all(&scratch)
            .map_err(|e| JetError::Io(format!("short write at page {}: {}", page_number, e)))?;

        if self.auto_sync {
            self.file
                .sync_data()
                .map_err(|e| JetError::Io(format!("sync after page {}: {}", page_number, e)))?;
        }
        Ok(())
    }

    /// Return a fresh page number, extending the file. The caller is
    /// responsible for writing its content; the page is zero-filled first
    /// so a crash between allocation and the caller's write leaves a
    /// well-formed empty page.
    pub fn allocate_new_page(&mut self) -> Result<u32, JetError> {
        if let Some(reused) = self.free_pages.pop() {
            let zeroed = self.create_page_buffer();
            self.write_page(&zeroed, reused)?;
            self.persist_free_list()?;
            return Ok(reused);
        }

        let page_number = self.page_count;
        let zeroed = self.create_page_buffer();
        self.write_page(&zeroed, page_number)?;
        self.page_count += 1;
        Ok(page_number)
    }

    /// Zero-fill `page_number` and record it on the free list for reuse by
    /// a later [`allocate_new_page`](Self::allocate_new_page) call. The
    /// list is persisted to the header page immediately, so it survives a
    /// close/reopen (§4.1).
    pub fn deallocate_page(&mut self, page_number: u32) -> Result<(), JetError> {
        let zeroed = self.create_page_buffer();
        self.write_page(&zeroed, page_number)?;
        self.free_pages.push(page_number);
        self.persist_free_list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jet::format::JetFormat;
    use std::io::Write as IoWrite;
    use tempfile::NamedTempFile;

    fn make_file(pages: usize, page_size: usize) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().expect("create temp file");
        let data = vec![0u8; pages * page_size];
        tmp.write_all(&data).expect("write pages");
        tmp.flush().expect("flush");
        tmp
    }

    #[test]
    fn open_detects_page_count() {
        let fmt = JetFormat::jet4();
        let tmp = make_file(3, fmt.page_size);
        let chan = PageChannel::open(tmp.path(), &fmt, true, false).unwrap();
        assert_eq!(chan.page_count(), 3);
        assert_eq!(chan.page_size(), fmt.page_size);
    }

    #[test]
    fn write_then_read_roundtrip() {
        let fmt = JetFormat::jet4();
        let tmp = make_file(2, fmt.page_size);
        let mut chan = PageChannel::open(tmp.path(), &fmt, false, false).unwrap();

        let mut page = chan.create_page_buffer();
        page[0] = 0xAB;
        page[1] = 0xCD;
        chan.write_page(&page, 1).unwrap();

        let mut readback = chan.create_page_buffer();
        chan.read_page(&mut readback, 1).unwrap();
        assert_eq!(readback[0], 0xAB);
        assert_eq!(readback[1], 0xCD);
    }

    #[test]
    fn allocate_extends_file() {
        let fmt = JetFormat::jet4();
        let tmp = make_file(1, fmt.page_size);
        let mut chan = PageChannel::open(tmp.path(), &fmt, false, false).unwrap();
        assert_eq!(chan.page_count(), 1);

        let new_page = chan.allocate_new_page().unwrap();
        assert_eq!(new_page, 1);
        assert_eq!(chan.page_count(), 2);
    }

    #[test]
    fn deallocate_then_allocate_reuses_page() {
        let fmt = JetFormat::jet4();
        let tmp = make_file(2, fmt.page_size);
        let mut chan = PageChannel::open(tmp.path(), &fmt, false, false).unwrap();

        chan.deallocate_page(1).unwrap();
        let reused = chan.allocate_new_page().unwrap();
        assert_eq!(reused, 1);
        assert_eq!(chan.page_count(), 2);
    }

    #[test]
    fn free_list_survives_reopen() {
        let fmt = JetFormat::jet4();
        let tmp = make_file(3, fmt.page_size);
        {
            let mut chan = PageChannel::open(tmp.path(), &fmt, false, false).unwrap();
            chan.deallocate_page(1).unwrap();
            chan.deallocate_page(2).unwrap();
        }

        let mut reopened = PageChannel::open(tmp.path(), &fmt, false, false).unwrap();
        assert_eq!(reopened.free_pages, vec![1, 2]);

        let reused = reopened.allocate_new_page().unwrap();
        assert_eq!(reused, 2);
        assert_eq!(reopened.free_pages, vec![1]);
    }

    #[test]
    fn read_out_of_range_page_errors() {
        let fmt = JetFormat::jet4();
        let tmp = make_file(1, fmt.page_size);
        let mut chan = PageChannel::open(tmp.path(), &fmt, true, false).unwrap();
        let mut buf = chan.create_page_buffer();
        assert!(chan.read_page(&mut buf, 5).is_err());
    }
}
