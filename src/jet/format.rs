//! Per-version `JetFormat` descriptors.
//!
//! Every structural offset inside a table-definition page, the row-location
//! size, the maximum row size, and a handful of other constants differ
//! across Jet file-format versions (Jet3/Access 97 through Jet14/Access
//! 2010's `.accdb`). Rather than hard-code one layout, this module treats
//! the constants as a small parameter table keyed by [`JetVersion`], the
//! same way the teacher's `constants.rs` holds fixed InnoDB offsets but
//! parameterized per spec §6.2 ("an implementation MUST treat them as a
//! parameter table keyed by file-format version").

/// Jet file-format version, detected from the database header (page 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JetVersion {
    /// Access 97 (`.mdb`).
    Jet3,
    /// Access 2000/2002/2003 (`.mdb`).
    Jet4,
    /// Access 2007 (`.accdb`).
    Jet12,
    /// Access 2010+ (`.accdb`).
    Jet14,
}

/// Row-location table entry size, in bytes (§3 RowId).
pub const SIZE_ROW_LOCATION: usize = 2;

/// Row-location deleted-row flag bit (§3 RowId, §8 invariant 2).
pub const ROW_LOCATION_DELETED_MASK: u16 = 0x8000;
/// Row-location overflow-row flag bit.
pub const ROW_LOCATION_OVERFLOW_MASK: u16 = 0x4000;
/// Mask isolating the clean row-start offset (clears both flag bits).
pub const ROW_LOCATION_OFFSET_MASK: u16 = 0x1FFF;

/// Sentinel page number meaning "no such page" (§3 RowId).
pub const INVALID_PAGE_NUMBER: u32 = 0xFFFF_FFFF;

/// Returns `true` if the row-location value has its deleted flag set.
pub fn is_deleted_row(row_location: u16) -> bool {
    row_location & ROW_LOCATION_DELETED_MASK != 0
}

/// Returns `true` if the row-location value has its overflow flag set.
pub fn is_overflow_row(row_location: u16) -> bool {
    row_location & ROW_LOCATION_OVERFLOW_MASK != 0
}

/// Strips the deleted/overflow flag bits, returning the clean row-start
/// byte offset within the page (§8 invariant 2).
pub fn clean_row_start(row_location: u16) -> u16 {
    row_location & ROW_LOCATION_OFFSET_MASK
}

/// Page-type discriminant byte (offset 0 of every page, §3 Page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageType {
    Data = 0x01,
    TableDef = 0x02,
    IndexRoot = 0x03,
    IndexLeaf = 0x04,
    UsageMap = 0x05,
    LongValue = 0x06,
}

impl PageType {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(PageType::Data),
            0x02 => Some(PageType::TableDef),
            0x03 => Some(PageType::IndexRoot),
            0x04 => Some(PageType::IndexLeaf),
            0x05 => Some(PageType::UsageMap),
            0x06 => Some(PageType::LongValue),
            _ => None,
        }
    }
}

/// Variable-length column offset-table layout used within a data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowVarColLayout {
    /// Two-byte offsets, one `u16` per variable column (Jet3/Jet4).
    ShortOffsets,
    /// Single-byte relative offsets with periodic jump markers (Jet12/Jet14).
    JumpTable,
}

/// Concrete structural parameters for one Jet file-format version.
///
/// §6.2 enumerates the offsets this struct carries; all are relative to
/// the start of the table-definition page (or, for the column/index
/// per-entry fields, relative to the start of that entry's block).
#[derive(Debug, Clone)]
pub struct JetFormat {
    pub version: JetVersion,

    pub page_size: usize,
    pub row_var_col_layout: RowVarColLayout,

    // Table-definition page layout.
    pub offset_num_rows: usize,
    pub offset_next_auto_number: usize,
    pub offset_table_type: usize,
    pub offset_max_cols: usize,
    pub offset_num_var_cols: usize,
    pub offset_num_cols: usize,
    pub offset_num_index_slots: usize,
    pub offset_num_indexes: usize,
    pub offset_owned_pages: usize,
    pub offset_free_space_pages: usize,
    pub offset_index_def_block: usize,

    // Column header layout (relative to the start of one column entry).
    pub offset_column_type: usize,
    pub offset_column_number: usize,
    pub offset_column_length: usize,
    pub offset_column_precision: usize,
    pub offset_column_scale: usize,
    pub offset_column_flags: usize,
    pub offset_column_compressed_unicode: usize,
    pub offset_column_variable_table_index: usize,
    pub offset_column_fixed_data_offset: usize,
    pub size_column_header: usize,

    // Index layout.
    pub size_index_definition: usize,
    pub size_index_column_block: usize,
    pub size_index_info_block: usize,

    pub size_tdef_header: usize,
    pub size_tdef_trailer: usize,

    // Long-value storage.
    pub size_long_value_def: usize,
    pub max_inline_long_value_size: usize,
    pub max_long_value_row_size: usize,

    // Row/page limits.
    pub max_row_size: usize,
    pub max_num_rows_on_data_page: usize,
    pub max_column_name_length: usize,
    pub max_table_name_length: usize,

    pub usage_map_table_byte_length: usize,
    pub data_page_initial_free_space: usize,
    pub page_initial_free_space: usize,

    /// Offset, within page 0, of the encrypted database password field.
    /// `None` for formats with no documented password offset.
    pub offset_password: Option<usize>,
    pub size_password: usize,

    pub default_charset: &'static str,
}

impl JetFormat {
    /// Jet3 (Access 97), 2 KiB pages, short var-column offset table.
    pub fn jet3() -> Self {
        JetFormat {
            version: JetVersion::Jet3,
            page_size: 2048,
            row_var_col_layout: RowVarColLayout::ShortOffsets,

            offset_num_rows: 12,
            offset_next_auto_number: 16,
            offset_table_type: 20,
            offset_max_cols: 21,
            offset_num_var_cols: 23,
            offset_num_cols: 25,
            offset_num_index_slots: 27,
            offset_num_indexes: 31,
            offset_owned_pages: 35,
            offset_free_space_pages: 39,
            offset_index_def_block: 43,

            offset_column_type: 0,
            offset_column_number: 1,
            offset_column_length: 16,
            offset_column_precision: 11,
            offset_column_scale: 12,
            offset_column_flags: 13,
            offset_column_compressed_unicode: 14,
            offset_column_variable_table_index: 3,
            offset_column_fixed_data_offset: 18,
            size_column_header: 18,

            size_index_definition: 8,
            size_index_column_block: 24,
            size_index_info_block: 20,

            size_tdef_header: 63,
            size_tdef_trailer: 2,

            size_long_value_def: 12,
            max_inline_long_value_size: 2048 - 256,
            max_long_value_row_size: 2048 - 100,

            max_row_size: 2048 - 36,
            max_num_rows_on_data_page: 255,
            max_column_name_length: 64,
            max_table_name_length: 64,

            usage_map_table_byte_length: 128,
            data_page_initial_free_space: 2048 - 36,
            page_initial_free_space: 2048 - 36,

            offset_password: Some(0x42),
            size_password: 20,

            default_charset: "windows-1252",
        }
    }

    /// Jet4 (Access 2000/2002/2003), 4 KiB pages, short var-column offsets.
    pub fn jet4() -> Self {
        JetFormat {
            version: JetVersion::Jet4,
            page_size: 4096,
            row_var_col_layout: RowVarColLayout::ShortOffsets,

            offset_num_rows: 12,
            offset_next_auto_number: 16,
            offset_table_type: 20,
            offset_max_cols: 21,
            offset_num_var_cols: 23,
            offset_num_cols: 25,
            offset_num_index_slots: 27,
            offset_num_indexes: 31,
            offset_owned_pages: 35,
            offset_free_space_pages: 39,
            offset_index_def_block: 43,

            offset_column_type: 0,
            offset_column_number: 5,
            offset_column_length: 23,
            offset_column_precision: 11,
            offset_column_scale: 12,
            offset_column_flags: 15,
            offset_column_compressed_unicode: 16,
            offset_column_variable_table_index: 7,
            offset_column_fixed_data_offset: 21,
            size_column_header: 25,

            size_index_definition: 12,
            size_index_column_block: 24,
            size_index_info_block: 28,

            size_tdef_header: 63,
            size_tdef_trailer: 4,

            size_long_value_def: 12,
            max_inline_long_value_size: 4096 - 256,
            max_long_value_row_size: 4096 - 100,

            max_row_size: 4096 - 36,
            max_num_rows_on_data_page: 255,
            max_column_name_length: 64,
            max_table_name_length: 64,

            usage_map_table_byte_length: 128,
            data_page_initial_free_space: 4096 - 36,
            page_initial_free_space: 4096 - 36,

            offset_password: Some(0x42),
            size_password: 20,

            default_charset: "UTF-16LE",
        }
    }

    /// Jet12 (Access 2007 `.accdb`), 4 KiB pages, jump-table var-column offsets.
    pub fn jet12() -> Self {
        let mut fmt = Self::jet4();
        fmt.version = JetVersion::Jet12;
        fmt.row_var_col_layout = RowVarColLayout::JumpTable;
        fmt
    }

    /// Jet14 (Access 2010+ `.accdb`), 4 KiB pages, jump-table var-column offsets.
    pub fn jet14() -> Self {
        let mut fmt = Self::jet12();
        fmt.version = JetVersion::Jet14;
        fmt
    }

    pub fn for_version(version: JetVersion) -> Self {
        match version {
            JetVersion::Jet3 => Self::jet3(),
            JetVersion::Jet4 => Self::jet4(),
            JetVersion::Jet12 => Self::jet12(),
            JetVersion::Jet14 => Self::jet14(),
        }
    }

    /// NULL-mask size in bytes for a row with `column_count` columns.
    pub fn null_mask_size(column_count: usize) -> usize {
        column_count.div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_location_flags() {
        assert_eq!(clean_row_start(0x9234), 0x1234);
        assert!(is_deleted_row(0x8000));
        assert!(!is_deleted_row(0x4000));
        assert!(is_overflow_row(0x4000));
        assert!(!is_overflow_row(0x8000));
    }

    #[test]
    fn page_size_by_version() {
        assert_eq!(JetFormat::jet3().page_size, 2048);
        assert_eq!(JetFormat::jet4().page_size, 4096);
        assert_eq!(JetFormat::jet12().page_size, 4096);
    }

    #[test]
    fn null_mask_size_rounds_up() {
        assert_eq!(JetFormat::null_mask_size(1), 1);
        assert_eq!(JetFormat::null_mask_size(8), 1);
        assert_eq!(JetFormat::null_mask_size(9), 2);
    }

    #[test]
    fn jump_table_layout_only_on_accdb() {
        assert_eq!(
            JetFormat::jet4().row_var_col_layout,
            RowVarColLayout::ShortOffsets
        );
        assert_eq!(
            JetFormat::jet12().row_var_col_layout,
            RowVarColLayout::JumpTable
        );
    }
}
