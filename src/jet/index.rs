//! B-tree index page cache (§4.6).
//!
//! `IndexPageCache` holds every touched index page in an arena keyed by
//! page number rather than the cyclic `Rc`/`RefCell` ownership the source
//! format's parent/child/sibling pointers would otherwise imply (§9):
//! every pointer here is an `Option<u32>` page number resolved back
//! through the arena.

use std::collections::{HashMap, HashSet};

use byteorder::{ByteOrder, LittleEndian};

use crate::jet::format::{JetFormat, PageType, INVALID_PAGE_NUMBER};
use crate::jet::page_channel::PageChannel;
use crate::JetError;

/// One entry in an index page: a sort-key plus either a `RowId` (leaf) or
/// a child page number (node), per §4.6.1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Leaf { key: Vec<u8>, page: u32, row: u8 },
    Node { key: Vec<u8>, child_page: u32 },
}

impl Entry {
    pub fn key(&self) -> &[u8] {
        match self {
            Entry::Leaf { key, .. } => key,
            Entry::Node { key, .. } => key,
        }
    }

    fn trailer(&self) -> Vec<u8> {
        match self {
            Entry::Leaf { page, row, .. } => {
                let mut t = vec![0u8; 5];
                t[0] = *row;
                crate::jet::bytes::write_u24_le(&mut t[1..4], *page);
                t
            }
            Entry::Node { child_page, .. } => child_page.to_le_bytes().to_vec(),
        }
    }

    /// On-disk size: key bytes plus trailer (§4.6.6 total_entry_size).
    pub fn size(&self) -> usize {
        self.key().len() + self.trailer().len()
    }

    fn cmp_full(&self, other: &Entry) -> std::cmp::Ordering {
        self.key()
            .cmp(other.key())
            .then_with(|| self.trailer().cmp(&other.trailer()))
    }
}

/// An index page's structural fields (§3 Index B-tree page, "main"
/// record).
#[derive(Debug, Clone)]
pub struct PageMain {
    pub page_number: u32,
    pub prev: Option<u32>,
    pub next: Option<u32>,
    pub parent: Option<u32>,
    pub child_tail_page: Option<u32>,
    pub is_leaf: bool,
}

/// An index page's entry list and derived bookkeeping (§3, "extra"
/// record).
#[derive(Debug, Clone, Default)]
pub struct PageExtra {
    pub entries: Vec<Entry>,
    /// `None` means "not computed yet" (§4.6.6 `EMPTY_PREFIX`).
    pub prefix: Option<Vec<u8>>,
    pub total_entry_size: usize,
}

impl PageExtra {
    fn recompute_total(&mut self) {
        self.total_entry_size = self.entries.iter().map(Entry::size).sum();
    }

    /// Common prefix of the first and last entries (§4.6.6); by
    /// sortedness every entry between them shares it too, so it can be
    /// dropped from each entry's stored key and kept once at the page
    /// level instead.
    fn recompute_prefix(&mut self) {
        self.prefix = Some(match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => common_prefix(first.key(), last.key()),
            _ => Vec::new(),
        });
    }

    /// On-disk size once the page's common prefix is stripped from every
    /// entry's key and stored once instead of per-entry (§4.6.5 step 2's
    /// split threshold). Requires `recompute_prefix` to have been called
    /// since the last entry-list change.
    fn compressed_entry_size(&self) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        let prefix_len = self.prefix.as_ref().map(Vec::len).unwrap_or(0);
        let stripped: usize = self.entries.iter().map(|e| e.size() - prefix_len).sum();
        stripped + prefix_len
    }
}

/// Longest shared leading byte run of `a` and `b`.
fn common_prefix(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter()
        .zip(b.iter())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| *x)
        .collect()
}

/// Whether duplicate keys are rejected on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    Unique,
    NonUnique,
}

/// The in-memory B-tree page cache for one physical index (§4.6.2).
pub struct IndexPageCache {
    root: u32,
    uniqueness: Uniqueness,
    mains: HashMap<u32, PageMain>,
    extras: HashMap<u32, PageExtra>,
    modified: HashSet<u32>,
    max_page_entry_size: usize,
}

impl IndexPageCache {
    /// Construct a brand-new, empty index rooted at `root_page` (already
    /// allocated and formatted as an empty leaf by the caller).
    pub fn new_empty(root_page: u32, uniqueness: Uniqueness, format: &JetFormat) -> Self {
        let mut mains = HashMap::new();
        mains.insert(
            root_page,
            PageMain {
                page_number: root_page,
                prev: None,
                next: None,
                parent: None,
                child_tail_page: None,
                is_leaf: true,
            },
        );
        let mut extras = HashMap::new();
        extras.insert(root_page, PageExtra::default());

        IndexPageCache {
            root: root_page,
            uniqueness,
            mains,
            extras,
            modified: HashSet::new(),
            max_page_entry_size: format.page_size - format.size_tdef_trailer - 64,
        }
    }

    fn load_page(&mut self, page_number: u32, channel: &mut PageChannel) -> Result<(), JetError> {
        if self.mains.contains_key(&page_number) {
            return Ok(());
        }
        let mut buf = channel.create_page_buffer();
        channel.read_page(&mut buf, page_number)?;
        let page_type = PageType::from_u8(buf[0]);
        let is_leaf = matches!(page_type, Some(PageType::IndexLeaf));

        let prev = optional_page(LittleEndian::read_u32(&buf[4..8]));
        let next = optional_page(LittleEndian::read_u32(&buf[8..12]));
        let child_tail_page = optional_page(LittleEndian::read_u32(&buf[12..16]));
        let entry_count = LittleEndian::read_u16(&buf[16..18]) as usize;

        let mut entries = Vec::with_capacity(entry_count);
        let mut pos = 18;
        for _ in 0..entry_count {
            let key_len = buf[pos] as usize;
            pos += 1;
            let key = buf[pos..pos + key_len].to_vec();
            pos += key_len;
            if is_leaf {
                let row = buf[pos];
                let page = crate::jet::bytes::read_u24_le(&buf[pos + 1..pos + 4]);
                pos += 4;
                entries.push(Entry::Leaf { key, page, row });
            } else {
                let child_page = LittleEndian::read_u32(&buf[pos..pos + 4]);
                pos += 4;
                entries.push(Entry::Node { key, child_page });
            }
        }

        self.mains.insert(
            page_number,
            PageMain {
                page_number,
                prev,
                next,
                parent: None,
                child_tail_page,
                is_leaf,
            },
        );
        let mut extra = PageExtra {
            entries,
            prefix: None,
            total_entry_size: 0,
        };
        extra.recompute_total();
        self.extras.insert(page_number, extra);
        Ok(())
    }

    fn mark_modified(&mut self, page_number: u32) {
        self.modified.insert(page_number);
        if let Some(extra) = self.extras.get_mut(&page_number) {
            extra.prefix = None;
        }
    }

    /// Binary-search `page_number`'s entries for `target`'s position.
    fn search_page(&self, page_number: u32, target: &Entry) -> Result<usize, usize> {
        let entries = &self.extras[&page_number].entries;
        entries.binary_search_by(|probe| probe.cmp_full(target))
    }

    /// Descend from the root to the leaf page that should contain `entry`
    /// (§4.6.3 step 1).
    fn find_leaf(&mut self, entry: &Entry, channel: &mut PageChannel) -> Result<u32, JetError> {
        let mut current = self.root;
        loop {
            self.load_page(current, channel)?;
            if self.mains[&current].is_leaf {
                return Ok(current);
            }
            let entries = &self.extras[&current].entries;
            let child = match entries.binary_search_by(|probe| probe.key().cmp(entry.key())) {
                Ok(i) | Err(i) => {
                    let idx = i.min(entries.len().saturating_sub(1));
                    match entries.get(idx) {
                        Some(Entry::Node { child_page, .. }) => *child_page,
                        _ => self.mains[&current]
                            .child_tail_page
                            .ok_or_else(|| JetError::Format("node page has no child to descend into".into()))?,
                    }
                }
            };
            current = child;
        }
    }

    /// Insert a leaf entry (§4.6.3).
    pub fn insert(
        &mut self,
        key: Vec<u8>,
        page: u32,
        row: u8,
        channel: &mut PageChannel,
    ) -> Result<(), JetError> {
        let entry = Entry::Leaf { key, page, row };
        let leaf = self.find_leaf(&entry, channel)?;

        match self.search_page(leaf, &entry) {
            Ok(_) if self.uniqueness == Uniqueness::Unique => {
                return Err(JetError::Value("duplicate key rejected by unique index".into()))
            }
            Ok(pos) | Err(pos) => {
                let was_last = pos == self.extras[&leaf].entries.len();
                self.extras.get_mut(&leaf).unwrap().entries.insert(pos, entry.clone());
                self.extras.get_mut(&leaf).unwrap().recompute_total();
                self.mark_modified(leaf);
                if was_last {
                    self.propagate_last_entry_change(leaf, channel)?;
                }
            }
        }
        Ok(())
    }

    /// Remove a leaf entry matching `key`/`page`/`row` exactly.
    pub fn remove(
        &mut self,
        key: &[u8],
        page: u32,
        row: u8,
        channel: &mut PageChannel,
    ) -> Result<(), JetError> {
        let target = Entry::Leaf {
            key: key.to_vec(),
            page,
            row,
        };
        let leaf = self.find_leaf(&target, channel)?;
        let pos = self
            .search_page(leaf, &target)
            .map_err(|_| JetError::Lookup("index entry not found for removal".into()))?;

        let was_last = pos == self.extras[&leaf].entries.len() - 1;
        self.extras.get_mut(&leaf).unwrap().entries.remove(pos);
        self.extras.get_mut(&leaf).unwrap().recompute_total();
        self.mark_modified(leaf);

        if was_last {
            self.propagate_last_entry_change(leaf, channel)?;
        }
        Ok(())
    }

    /// When a page's last entry changes, its parent's node entry pointing
    /// at it must be updated to match (§4.6.3 step 3, §4.6.4).
    fn propagate_last_entry_change(
        &mut self,
        page_number: u32,
        channel: &mut PageChannel,
    ) -> Result<(), JetError> {
        let Some(parent) = self.mains[&page_number].parent else {
            return Ok(());
        };
        self.load_page(parent, channel)?;
        let new_last_key = self.extras[&page_number].entries.last().map(|e| e.key().to_vec());

        let parent_entries = &mut self.extras.get_mut(&parent).unwrap().entries;
        if let Some(pos) = parent_entries.iter().position(|e| matches!(e, Entry::Node { child_page, .. } if *child_page == page_number))
        {
            if let Some(new_key) = new_last_key {
                if let Entry::Node { key, .. } = &mut parent_entries[pos] {
                    *key = new_key;
                }
            }
        }
        self.mark_modified(parent);
        Ok(())
    }

    /// Flush modified pages to disk (§4.6.5). A simplified three-pass
    /// implementation: drop empty non-root pages, split any page whose
    /// entries would no longer fit, then persist every modified page.
    pub fn flush(&mut self, channel: &mut PageChannel, format: &JetFormat) -> Result<(), JetError> {
        self.drop_empty_pages(channel)?;
        self.split_pass(channel, format)?;
        self.persist_modified(channel, format)
    }

    fn drop_empty_pages(&mut self, channel: &mut PageChannel) -> Result<(), JetError> {
        let empties: Vec<u32> = self
            .modified
            .iter()
            .copied()
            .filter(|p| self.extras[p].entries.is_empty() && *p != self.root)
            .collect();
        for page in empties {
            if let Some(main) = self.mains.get(&page).cloned() {
                if let Some(prev) = main.prev {
                    if let Some(p) = self.mains.get_mut(&prev) {
                        p.next = main.next;
                    }
                }
                if let Some(next) = main.next {
                    if let Some(n) = self.mains.get_mut(&next) {
                        n.prev = main.prev;
                    }
                }
                if let Some(parent) = main.parent {
                    self.load_page(parent, channel)?;
                    self.extras
                        .get_mut(&parent)
                        .unwrap()
                        .entries
                        .retain(|e| !matches!(e, Entry::Node { child_page, .. } if *child_page == page));
                    self.extras.get_mut(&parent).unwrap().recompute_total();
                    self.mark_modified(parent);
                }
            }
            channel.deallocate_page(page)?;
            self.mains.remove(&page);
            self.extras.remove(&page);
            self.modified.remove(&page);
        }
        Ok(())
    }

    fn split_pass(&mut self, channel: &mut PageChannel, format: &JetFormat) -> Result<(), JetError> {
        self.fix_tail_shape(channel)?;
        loop {
            self.recompute_prefixes();
            let candidate = self.modified.iter().copied().find(|p| {
                self.extras.get(p).map(|e| e.compressed_entry_size()).unwrap_or(0) > self.max_page_entry_size
            });
            let Some(page_number) = candidate else {
                return Ok(());
            };
            self.split_page(page_number, channel, format)?;
            self.fix_tail_shape(channel)?;
        }
    }

    fn recompute_prefixes(&mut self) {
        for page in self.modified.clone() {
            if let Some(extra) = self.extras.get_mut(&page) {
                extra.recompute_prefix();
            }
        }
    }

    /// §4.6.5 step 2's non-split corrective step: a modified non-leaf page
    /// with exactly one entry and a child-tail gets the tail demoted to a
    /// regular last entry; one with multiple entries and no child-tail
    /// gets its last entry promoted into the child-tail. Both conditions
    /// can only arise from a just-completed split or nest, so one sweep
    /// per call is enough — it doesn't loop to a fixed point, since the
    /// two corrections would otherwise toggle a stable two-child page
    /// back and forth between its two representations forever.
    fn fix_tail_shape(&mut self, channel: &mut PageChannel) -> Result<(), JetError> {
        let candidates: Vec<u32> = self.modified.iter().copied().collect();
        for page_number in candidates {
            let Some(main) = self.mains.get(&page_number).cloned() else {
                continue;
            };
            if main.is_leaf {
                continue;
            }
            let entry_count = self.extras[&page_number].entries.len();
            if entry_count == 1 && main.child_tail_page.is_some() {
                let tail = main.child_tail_page.unwrap();
                self.load_page(tail, channel)?;
                let key = self.extras[&tail].entries.last().map(|e| e.key().to_vec()).unwrap_or_default();
                let extra = self.extras.get_mut(&page_number).unwrap();
                extra.entries.push(Entry::Node { key, child_page: tail });
                extra.recompute_total();
                self.mains.get_mut(&page_number).unwrap().child_tail_page = None;
                self.mark_modified(page_number);
            } else if entry_count > 1 && main.child_tail_page.is_none() {
                let extra = self.extras.get_mut(&page_number).unwrap();
                match extra.entries.pop() {
                    Some(Entry::Node { child_page, .. }) => {
                        extra.recompute_total();
                        self.mains.get_mut(&page_number).unwrap().child_tail_page = Some(child_page);
                        self.mark_modified(page_number);
                    }
                    Some(leaf_entry) => extra.entries.push(leaf_entry),
                    None => {}
                }
            }
        }
        Ok(())
    }

    fn split_page(&mut self, page_number: u32, channel: &mut PageChannel, format: &JetFormat) -> Result<(), JetError> {
        if page_number == self.root {
            self.nest_root(channel, format)?;
            let new_child = *self.mains[&self.root]
                .child_tail_page
                .as_ref()
                .expect("nest_root sets a child-tail");
            return self.split_page(new_child, channel, format);
        }

        let entries = self.extras[&page_number].entries.clone();
        let mid = entries.len().div_ceil(2);
        let (left_entries, right_entries) = entries.split_at(mid);

        let new_page_number = channel.allocate_new_page()?;
        let is_leaf = self.mains[&page_number].is_leaf;
        let parent = self.mains[&page_number].parent;
        let prev = self.mains[&page_number].prev;

        self.mains.insert(
            new_page_number,
            PageMain {
                page_number: new_page_number,
                prev,
                next: Some(page_number),
                parent,
                child_tail_page: None,
                is_leaf,
            },
        );
        if let Some(prev_page) = prev {
            if let Some(p) = self.mains.get_mut(&prev_page) {
                p.next = Some(new_page_number);
            }
        }
        self.mains.get_mut(&page_number).unwrap().prev = Some(new_page_number);

        if !is_leaf {
            for entry in left_entries {
                if let Entry::Node { child_page, .. } = entry {
                    if let Some(child) = self.mains.get_mut(child_page) {
                        child.parent = Some(new_page_number);
                    }
                }
            }
        }

        self.extras.insert(
            new_page_number,
            PageExtra {
                entries: left_entries.to_vec(),
                prefix: None,
                total_entry_size: left_entries.iter().map(Entry::size).sum(),
            },
        );
        self.extras.get_mut(&page_number).unwrap().entries = right_entries.to_vec();
        self.extras.get_mut(&page_number).unwrap().recompute_total();

        self.mark_modified(new_page_number);
        self.mark_modified(page_number);

        if let Some(parent_page) = parent {
            self.load_page(parent_page, channel)?;
            let new_key = left_entries
                .last()
                .map(|e| e.key().to_vec())
                .unwrap_or_default();
            let pos = self.extras[&parent_page]
                .entries
                .iter()
                .position(|e| matches!(e, Entry::Node { child_page, .. } if *child_page == page_number))
                .unwrap_or(self.extras[&parent_page].entries.len());
            self.extras.get_mut(&parent_page).unwrap().entries.insert(
                pos,
                Entry::Node {
                    key: new_key,
                    child_page: new_page_number,
                },
            );
            self.extras.get_mut(&parent_page).unwrap().recompute_total();
            self.mark_modified(parent_page);
        }
        Ok(())
    }

    /// Copy the root's entries into a new child page, leaving the root as
    /// a single-entry node whose child-tail is that new page (§4.6.5,
    /// "nest").
    fn nest_root(&mut self, channel: &mut PageChannel, format: &JetFormat) -> Result<(), JetError> {
        let _ = format;
        let new_child = channel.allocate_new_page()?;
        let root = self.root;
        let root_main = self.mains[&root].clone();
        let root_extra = self.extras[&root].clone();

        self.mains.insert(
            new_child,
            PageMain {
                page_number: new_child,
                prev: None,
                next: None,
                parent: Some(root),
                child_tail_page: root_main.child_tail_page,
                is_leaf: root_main.is_leaf,
            },
        );
        if !root_main.is_leaf {
            for entry in &root_extra.entries {
                if let Entry::Node { child_page, .. } = entry {
                    if let Some(child) = self.mains.get_mut(child_page) {
                        child.parent = Some(new_child);
                    }
                }
            }
        }
        self.extras.insert(new_child, root_extra);

        let root_main_mut = self.mains.get_mut(&root).unwrap();
        root_main_mut.is_leaf = false;
        root_main_mut.child_tail_page = Some(new_child);
        self.extras.get_mut(&root).unwrap().entries.clear();
        self.extras.get_mut(&root).unwrap().total_entry_size = 0;

        self.mark_modified(root);
        self.mark_modified(new_child);
        Ok(())
    }

    fn persist_modified(&mut self, channel: &mut PageChannel, format: &JetFormat) -> Result<(), JetError> {
        let pages: Vec<u32> = self.modified.drain().collect();
        for page_number in pages {
            self.write_page(page_number, channel, format)?;
        }
        Ok(())
    }

    /// Serializes entries at full key length; `compressed_entry_size`
    /// governs only the split threshold (§4.6.5 step 2), not this page's
    /// physical layout.
    fn write_page(&mut self, page_number: u32, channel: &mut PageChannel, format: &JetFormat) -> Result<(), JetError> {
        let main = self.mains[&page_number].clone();
        let extra = self.extras[&page_number].clone();

        let mut buf = channel.create_page_buffer();
        buf[0] = if main.is_leaf {
            PageType::IndexLeaf as u8
        } else {
            PageType::IndexRoot as u8
        };
        LittleEndian::write_u32(&mut buf[4..8], main.prev.unwrap_or(INVALID_PAGE_NUMBER));
        LittleEndian::write_u32(&mut buf[8..12], main.next.unwrap_or(INVALID_PAGE_NUMBER));
        LittleEndian::write_u32(
            &mut buf[12..16],
            main.child_tail_page.unwrap_or(INVALID_PAGE_NUMBER),
        );
        LittleEndian::write_u16(&mut buf[16..18], extra.entries.len() as u16);

        let mut pos = 18;
        for entry in &extra.entries {
            let key = entry.key();
            buf[pos] = key.len() as u8;
            pos += 1;
            buf[pos..pos + key.len()].copy_from_slice(key);
            pos += key.len();
            match entry {
                Entry::Leaf { page, row, .. } => {
                    buf[pos] = *row;
                    crate::jet::bytes::write_u24_le(&mut buf[pos + 1..pos + 4], *page);
                    pos += 4;
                }
                Entry::Node { child_page, .. } => {
                    LittleEndian::write_u32(&mut buf[pos..pos + 4], *child_page);
                    pos += 4;
                }
            }
        }
        channel.write_page(&buf, page_number)?;
        let _ = format;
        Ok(())
    }

    /// Validate every cached page's invariants (§4.6.7, test-only).
    pub fn validate(&self) -> Result<(), JetError> {
        for (page_number, extra) in &self.extras {
            for window in extra.entries.windows(2) {
                if window[0].cmp_full(&window[1]) != std::cmp::Ordering::Less {
                    return Err(JetError::InvalidState(format!(
                        "page {} has out-of-order or duplicate entries",
                        page_number
                    )));
                }
            }
            let summed: usize = extra.entries.iter().map(Entry::size).sum();
            if summed != extra.total_entry_size {
                return Err(JetError::InvalidState(format!(
                    "page {} total_entry_size mismatch: cached {} vs summed {}",
                    page_number, extra.total_entry_size, summed
                )));
            }
            let main = &self.mains[page_number];
            if main.is_leaf && main.child_tail_page.is_some() {
                return Err(JetError::InvalidState(format!(
                    "leaf page {} has a child-tail",
                    page_number
                )));
            }
            if !main.is_leaf {
                if extra.entries.len() == 1 && main.child_tail_page.is_some() {
                    return Err(JetError::InvalidState(format!(
                        "node page {} has one entry and an undemoted child-tail",
                        page_number
                    )));
                }
                if extra.entries.len() > 1 && main.child_tail_page.is_none() {
                    return Err(JetError::InvalidState(format!(
                        "node page {} has multiple entries and no promoted child-tail",
                        page_number
                    )));
                }
            }
        }
        Ok(())
    }

    /// Collect every leaf `RowId` in ascending key order, by walking the
    /// leftmost leaf's next-pointers (§8 invariant 4).
    pub fn leaf_row_ids_in_order(&mut self, channel: &mut PageChannel) -> Result<Vec<(u32, u8)>, JetError> {
        let mut current = self.root;
        loop {
            self.load_page(current, channel)?;
            if self.mains[&current].is_leaf {
                break;
            }
            current = self.extras[&current]
                .entries
                .first()
                .map(|e| match e {
                    Entry::Node { child_page, .. } => *child_page,
                    _ => unreachable!(),
                })
                .or(self.mains[&current].child_tail_page)
                .ok_or_else(|| JetError::Format("node page has no children".into()))?;
        }

        let mut out = Vec::new();
        let mut leftmost = current;
        while let Some(prev) = self.mains.get(&leftmost).and_then(|m| m.prev) {
            self.load_page(prev, channel)?;
            leftmost = prev;
        }
        let mut cursor = Some(leftmost);
        while let Some(page) = cursor {
            self.load_page(page, channel)?;
            for entry in &self.extras[&page].entries {
                if let Entry::Leaf { page: p, row, .. } = entry {
                    out.push((*p, *row));
                }
            }
            cursor = self.mains[&page].next;
        }
        Ok(out)
    }
}

fn optional_page(raw: u32) -> Option<u32> {
    if raw == INVALID_PAGE_NUMBER {
        None
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn open_channel(pages: usize, format: &JetFormat) -> (NamedTempFile, PageChannel) {
        let tmp = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp.as_file(), &vec![0u8; pages * format.page_size]).unwrap();
        (tmp, PageChannel::open(tmp.path(), format, false, false).unwrap())
    }

    #[test]
    fn insert_and_lookup_round_trip() {
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        let root = channel.allocate_new_page().unwrap();
        let mut cache = IndexPageCache::new_empty(root, Uniqueness::NonUnique, &format);

        cache.insert(vec![1], 10, 0, &mut channel).unwrap();
        cache.insert(vec![2], 10, 1, &mut channel).unwrap();
        cache.flush(&mut channel, &format).unwrap();
        cache.validate().unwrap();

        let ids = cache.leaf_row_ids_in_order(&mut channel).unwrap();
        assert_eq!(ids, vec![(10, 0), (10, 1)]);
    }

    #[test]
    fn unique_index_rejects_duplicate_key() {
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        let root = channel.allocate_new_page().unwrap();
        let mut cache = IndexPageCache::new_empty(root, Uniqueness::Unique, &format);

        cache.insert(vec![5], 1, 0, &mut channel).unwrap();
        assert!(cache.insert(vec![5], 1, 1, &mut channel).is_err());
    }

    #[test]
    fn remove_then_validate_leaves_sorted_entries() {
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        let root = channel.allocate_new_page().unwrap();
        let mut cache = IndexPageCache::new_empty(root, Uniqueness::NonUnique, &format);

        for i in 0..10u8 {
            cache.insert(vec![i], 1, i, &mut channel).unwrap();
        }
        for i in (0..10u8).step_by(2) {
            cache.remove(&[i], 1, i, &mut channel).unwrap();
        }
        cache.flush(&mut channel, &format).unwrap();
        cache.validate().unwrap();

        let ids = cache.leaf_row_ids_in_order(&mut channel).unwrap();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn large_insert_volume_splits_and_stays_valid() {
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        let root = channel.allocate_new_page().unwrap();
        let mut cache = IndexPageCache::new_empty(root, Uniqueness::Unique, &format);

        for i in 0..2000u32 {
            let key = i.to_be_bytes().to_vec();
            cache.insert(key, 1, (i % 255) as u8, &mut channel).unwrap();
        }
        cache.flush(&mut channel, &format).unwrap();
        cache.validate().unwrap();

        let ids = cache.leaf_row_ids_in_order(&mut channel).unwrap();
        assert_eq!(ids.len(), 2000);
    }
}
