//! The record codec (§4.2) and the data-page row-slot primitives it sits on.
//!
//! Two layers live here, bottom-up:
//!   - **Data-page row slots** (§4.2.3): the row-location table at the end
//!     of a page, free-space bookkeeping, and locating a row's raw bytes.
//!   - **Row codec** (§4.2.1/§4.2.2): translating a raw row buffer to and
//!     from a [`Value`] per [`Column`], including the two variable-length
//!     offset-table layouts.

use byteorder::{ByteOrder, LittleEndian};

use crate::jet::column::{Column, ColumnStorage, DataType, Value, Write};
use crate::jet::format::{
    clean_row_start, is_deleted_row, is_overflow_row, JetFormat, RowVarColLayout,
    ROW_LOCATION_DELETED_MASK, ROW_LOCATION_OVERFLOW_MASK, SIZE_ROW_LOCATION,
};
use crate::jet::table::{ErrorHandler, RowId};
use crate::JetError;

/// Data-page header offsets, relative to the start of the page (after the
/// one-byte page-type discriminant at offset 0).
const OFFSET_FREE_SPACE: usize = 2;
const OFFSET_TDEF_PAGE: usize = 4;
const OFFSET_NUM_ROWS: usize = 8;
/// First byte of row data on a freshly formatted data page.
const DATA_START: usize = 9;

/// Read a data page's free-space counter, owning table-def page number,
/// and row count.
pub fn read_page_header(buf: &[u8]) -> (u16, u32, u8) {
    let free_space = LittleEndian::read_u16(&buf[OFFSET_FREE_SPACE..]);
    let tdef_page = LittleEndian::read_u32(&buf[OFFSET_TDEF_PAGE..]);
    let row_count = buf[OFFSET_NUM_ROWS];
    (free_space, tdef_page, row_count)
}

/// Initialize a freshly allocated data page's header: full free space, an
/// owning table-def page, and zero rows.
pub fn init_data_page(buf: &mut [u8], format: &JetFormat, tdef_page: u32) {
    buf[0] = crate::jet::format::PageType::Data as u8;
    LittleEndian::write_u16(
        &mut buf[OFFSET_FREE_SPACE..],
        format.data_page_initial_free_space as u16,
    );
    LittleEndian::write_u32(&mut buf[OFFSET_TDEF_PAGE..], tdef_page);
    buf[OFFSET_NUM_ROWS] = 0;
}

fn row_location_entry(buf: &[u8], row_number: u8) -> u16 {
    let offset = buf.len() - SIZE_ROW_LOCATION * (row_number as usize + 1);
    LittleEndian::read_u16(&buf[offset..offset + SIZE_ROW_LOCATION])
}

fn set_row_location_entry(buf: &mut [u8], row_number: u8, value: u16) {
    let len = buf.len();
    let offset = len - SIZE_ROW_LOCATION * (row_number as usize + 1);
    LittleEndian::write_u16(&mut buf[offset..offset + SIZE_ROW_LOCATION], value);
}

/// Returns `true` when a row of `row_size` bytes still fits on a page with
/// `free_space` bytes remaining and `row_count` existing rows (§4.2.3).
pub fn row_fits(free_space: u16, row_count: u8, row_size: usize, format: &JetFormat) -> bool {
    (row_size + SIZE_ROW_LOCATION) as u16 <= free_space
        && (row_count as usize) < format.max_num_rows_on_data_page
}

/// Append `row_bytes` to `buf` as a new row, recording its slot in the
/// row-location table with `extra_flags` OR'd into the location entry
/// (§4.2.3). Returns the new row's row-number.
pub fn add_data_page_row(
    buf: &mut [u8],
    format: &JetFormat,
    row_bytes: &[u8],
    extra_flags: u16,
) -> Result<u8, JetError> {
    let (free_space, _tdef_page, row_count) = read_page_header(buf);
    if !row_fits(free_space, row_count, row_bytes.len(), format) {
        return Err(JetError::Format(format!(
            "row of {} bytes does not fit on page ({} bytes free, {} rows)",
            row_bytes.len(),
            free_space,
            row_count
        )));
    }

    let row_start = data_end(buf, row_count);
    buf[row_start..row_start + row_bytes.len()].copy_from_slice(row_bytes);

    let new_row_number = row_count;
    set_row_location_entry(buf, new_row_number, row_start as u16 | extra_flags);

    LittleEndian::write_u16(
        &mut buf[OFFSET_FREE_SPACE..],
        free_space - (row_bytes.len() + SIZE_ROW_LOCATION) as u16,
    );
    buf[OFFSET_NUM_ROWS] = row_count + 1;
    Ok(new_row_number)
}

/// The first free byte offset for new row data, i.e. one past the highest
/// currently occupied row's last byte. Deleted rows still occupy their
/// bytes until the page is rewritten, so they count too (§3 Lifecycle).
fn data_end(buf: &[u8], row_count: u8) -> usize {
    let mut end = DATA_START;
    for row_number in 0..row_count {
        let row_end = row_bounds(buf, row_number, row_count).1;
        if row_end > end {
            end = row_end;
        }
    }
    end
}

/// The `[start, end)` byte range of row `row_number`'s data, including its
/// deleted/overflow flags resolved separately via [`row_flags`].
fn row_bounds(buf: &[u8], row_number: u8, row_count: u8) -> (usize, usize) {
    let loc = row_location_entry(buf, row_number);
    let start = clean_row_start(loc) as usize;
    // A row's end is the start of the next-lower row in the row-location
    // table order (rows are appended in increasing start-offset order), or
    // the row-location table's own start if this is the last physical row.
    let mut end = buf.len() - SIZE_ROW_LOCATION * (row_count as usize);
    for other in 0..row_count {
        if other == row_number {
            continue;
        }
        let other_loc = row_location_entry(buf, other);
        let other_start = clean_row_start(other_loc) as usize;
        if other_start > start && other_start < end {
            end = other_start;
        }
    }
    (start, end)
}

/// Resolve row `row_number`'s deleted/overflow flags and raw byte range.
pub fn row_flags(buf: &[u8], row_number: u8) -> (bool, bool) {
    let loc = row_location_entry(buf, row_number);
    (is_deleted_row(loc), is_overflow_row(loc))
}

/// Borrow row `row_number`'s raw bytes (§4.2.3).
pub fn row_data<'a>(buf: &'a [u8], row_number: u8) -> Result<&'a [u8], JetError> {
    let (_, _, row_count) = read_page_header(buf);
    if row_number >= row_count {
        return Err(JetError::Format(format!(
            "row {} does not exist (page has {} rows)",
            row_number, row_count
        )));
    }
    let (start, end) = row_bounds(buf, row_number, row_count);
    Ok(&buf[start..end])
}

/// Set the deleted flag on row `row_number`'s location entry (§4.7
/// `delete_row`: the bytes themselves are left untouched).
pub fn mark_row_deleted(buf: &mut [u8], row_number: u8) {
    let loc = row_location_entry(buf, row_number);
    set_row_location_entry(buf, row_number, loc | ROW_LOCATION_DELETED_MASK);
}

/// Rewrite row `row_number`'s header bytes to a 4-byte overflow pointer
/// `[u8 row][u24 page]` and set its overflow flag (§4.7 `update_row`).
pub fn rewrite_as_overflow_pointer(buf: &mut [u8], row_number: u8, dest_row: u8, dest_page: u32) {
    let (start, _end) = row_bounds(buf, row_number, read_page_header(buf).2);
    buf[start] = dest_row;
    crate::jet::bytes::write_u24_le(&mut buf[start + 1..start + 4], dest_page);
    let loc = row_location_entry(buf, row_number);
    set_row_location_entry(buf, row_number, loc | ROW_LOCATION_OVERFLOW_MASK);
}

/// Follow an overflow pointer row's bytes back to `(row, page)`.
pub fn read_overflow_pointer(row_bytes: &[u8]) -> (u8, u32) {
    let row = row_bytes[0];
    let page = crate::jet::bytes::read_u24_le(&row_bytes[1..4]);
    (row, page)
}

// ---------------------------------------------------------------------
// Record codec (§4.2.1 / §4.2.2)
// ---------------------------------------------------------------------

/// Decode `row` (already narrowed to `[row_start, row_end)`) into one
/// [`Value`] per entry of `columns`, which MUST be given in column-number
/// order matching how the row was written.
///
/// Long-value columns (OLE/MEMO) decode to [`Value::LValRef`]; callers
/// resolve the actual bytes via [`crate::jet::lval`].
pub fn decode_row(row: &[u8], columns: &[Column], format: &JetFormat) -> Result<Vec<Value>, JetError> {
    decode_row_with_handler(row, columns, format, None)
}

/// Decode a row, substituting a placeholder for any column a `handler`
/// rejects rather than failing the whole row (§7 row-level error hook).
/// With `error_handler: None` this behaves exactly like [`decode_row`].
pub fn decode_row_with_handler(
    row: &[u8],
    columns: &[Column],
    format: &JetFormat,
    error_handler: Option<(RowId, &dyn ErrorHandler)>,
) -> Result<Vec<Value>, JetError> {
    if row.len() < 2 {
        return Err(JetError::Format("row shorter than column-count header".into()));
    }
    let column_count = LittleEndian::read_u16(row) as usize;
    let null_mask_size = JetFormat::null_mask_size(column_count);
    if row.len() < null_mask_size {
        return Err(JetError::Format("row shorter than its NULL mask".into()));
    }
    let null_mask = &row[row.len() - null_mask_size..];
    let is_null = |col_index: usize| -> bool {
        if col_index >= column_count {
            return true;
        }
        null_mask[col_index / 8] & (1 << (col_index % 8)) == 0
    };

    let var_offsets = read_var_col_offsets(row, columns, null_mask_size, format)?;

    let mut values = Vec::with_capacity(columns.len());
    for column in columns {
        if column.data_type == DataType::Boolean {
            values.push(Value::Bool(!is_null(column.column_number as usize)));
            continue;
        }
        if is_null(column.column_number as usize) {
            values.push(Value::Null);
            continue;
        }
        let decoded: Result<Value, JetError> = match column.storage {
            ColumnStorage::Fixed { offset } => (|| {
                let start = 2 + offset;
                let size = column
                    .data_type
                    .fixed_size()
                    .ok_or_else(|| JetError::Format(format!("column {} has no fixed size", column.name)))?;
                if row.len() < start + size {
                    return Err(JetError::Format(format!(
                        "row too short for fixed column {}",
                        column.name
                    )));
                }
                decode_fixed_value(&row[start..start + size], column)
            })(),
            ColumnStorage::Variable { table_index } => (|| {
                let (start, end) = var_offsets
                    .get(table_index)
                    .copied()
                    .ok_or_else(|| JetError::Format(format!("missing var-column slot for {}", column.name)))?;
                decode_variable_value(&row[start..end], column)
            })(),
        };
        match decoded {
            Ok(value) => values.push(value),
            Err(err) => match error_handler {
                Some((row_id, handler)) => values.push(handler.handle(row_id, &column.name, err)?),
                None => return Err(err),
            },
        }
    }
    Ok(values)
}

fn decode_fixed_value(bytes: &[u8], column: &Column) -> Result<Value, JetError> {
    Ok(match column.data_type {
        DataType::Byte => Value::Byte(bytes[0]),
        DataType::Int => Value::I16(LittleEndian::read_i16(bytes)),
        DataType::Long => Value::I32(LittleEndian::read_i32(bytes)),
        DataType::Float => Value::F32(LittleEndian::read_f32(bytes)),
        DataType::Double => Value::F64(LittleEndian::read_f64(bytes)),
        DataType::Money => Value::Money(LittleEndian::read_i64(bytes)),
        DataType::ShortDateTime => Value::Date(LittleEndian::read_f64(bytes)),
        DataType::Guid => {
            let mut arr = [0u8; 16];
            arr.copy_from_slice(bytes);
            Value::Guid(crate::jet::column::read_guid_value(&arr))
        }
        DataType::Numeric => crate::jet::column::read_numeric(bytes, column.scale),
        other => {
            return Err(JetError::Format(format!(
                "{:?} is not a fixed-length type",
                other
            )))
        }
    })
}

fn decode_variable_value(bytes: &[u8], column: &Column) -> Result<Value, JetError> {
    Ok(match column.data_type {
        DataType::Text => {
            let mut decoder = crate::jet::text::UnavailableScsuDecoder;
            if crate::jet::text::is_compressed(bytes) {
                // Compressed TEXT requires an injected SCSU decoder; callers
                // needing compressed-text support provide one through the
                // table/database layer rather than through this codec path.
                let _ = &mut decoder;
                Value::Bytes(bytes.to_vec())
            } else {
                Value::Text(crate::jet::text::decode(bytes, &mut decoder)?)
            }
        }
        DataType::Binary | DataType::Unknown0D | DataType::Unknown11 => Value::Bytes(bytes.to_vec()),
        DataType::Ole | DataType::Memo => {
            if bytes.len() < 4 {
                return Err(JetError::Format("long-value reference too short".into()));
            }
            let row = bytes[3];
            let page = crate::jet::bytes::read_u24_le(&bytes[0..3]);
            Value::LValRef { page, row }
        }
        other => {
            return Err(JetError::Format(format!(
                "{:?} is not a variable-length type",
                other
            )))
        }
    })
}

/// Reconstruct `[start, end)` byte ranges for every variable-length
/// column, indexed by var-column-table index.
///
/// Short-layout position formula per §9 Open questions: the offset table
/// entry for column `k` sits at `row_end - null_mask_size - 4 - k*2`; this
/// reproduces documented source behavior but its exact placement across
/// Jet versions is the open question recorded in `DESIGN.md`.
fn read_var_col_offsets(
    row: &[u8],
    columns: &[Column],
    null_mask_size: usize,
    format: &JetFormat,
) -> Result<Vec<(usize, usize)>, JetError> {
    let var_count = columns
        .iter()
        .filter(|c| matches!(c.storage, ColumnStorage::Variable { .. }))
        .count();
    if var_count == 0 {
        return Ok(Vec::new());
    }

    match format.row_var_col_layout {
        RowVarColLayout::ShortOffsets => {
            let table_start = row.len() - null_mask_size - (var_count + 1) * 2;
            let mut offsets = Vec::with_capacity(var_count);
            for k in 0..var_count {
                let start_pos = table_start + (var_count - k) * 2;
                let start = LittleEndian::read_u16(&row[start_pos..start_pos + 2]) as usize;
                let end_pos = table_start + (var_count - k - 1) * 2;
                let end = LittleEndian::read_u16(&row[end_pos..end_pos + 2]) as usize;
                offsets.push((start, end));
            }
            Ok(offsets)
        }
        RowVarColLayout::JumpTable => read_jump_table_offsets(row, null_mask_size, var_count),
    }
}

/// Reconstruct jump-table offsets (§4.2.1). A single byte at
/// `row_end - null_mask_size` gives the variable-column count; single-byte
/// relative offsets follow, with a jump marker consumed every 256 bytes of
/// cumulative offset. Reconstruction happens once per call; callers that
/// decode the same row repeatedly should cache the result (§4.2.1
/// requires this at the `RowState` layer, see [`crate::jet::table`]).
fn read_jump_table_offsets(
    row: &[u8],
    null_mask_size: usize,
    var_count: usize,
) -> Result<Vec<(usize, usize)>, JetError> {
    let count_pos = row.len() - null_mask_size - 1;
    let stored_count = row[count_pos] as usize;
    if stored_count != var_count {
        return Err(JetError::Format(format!(
            "jump-table var-column count mismatch: row says {}, schema says {}",
            stored_count, var_count
        )));
    }

    // Groups are emitted left-to-right as zero-or-more 0xFF jump markers
    // followed by exactly one non-0xFF final byte. Walking backward, the
    // final byte of a group is always the first (rightmost) unread byte;
    // any 0xFF bytes further left belong to the SAME group and are
    // consumed next, stopping at the first non-0xFF byte, which is the
    // next group's final byte.
    let mut raw_offsets = Vec::with_capacity(var_count + 1);
    let mut pos = count_pos;
    for _ in 0..=var_count {
        if pos == 0 {
            return Err(JetError::Format("jump table ran past start of row".into()));
        }
        pos -= 1;
        let base_value = row[pos] as usize;
        let mut jump_base = 0usize;
        while pos > 0 && row[pos - 1] == 0xFF {
            jump_base += 256;
            pos -= 1;
        }
        raw_offsets.push(jump_base + base_value);
    }
    raw_offsets.reverse();

    let mut offsets = Vec::with_capacity(var_count);
    for k in 0..var_count {
        offsets.push((raw_offsets[k], raw_offsets[k + 1]));
    }
    Ok(offsets)
}

/// Encode a row given `columns` (in column-number order) and a matching
/// `values` slice of write intents (§4.2.2, §9 `Write` enum).
pub fn encode_row(
    values: &[Write],
    columns: &[Column],
    format: &JetFormat,
) -> Result<Vec<u8>, JetError> {
    if values.len() != columns.len() {
        return Err(JetError::Format(
            "value count does not match column count".into(),
        ));
    }

    let max_column_count = columns.len();
    let null_mask_size = JetFormat::null_mask_size(max_column_count);
    let mut null_mask = vec![0u8; null_mask_size];

    let fixed_len = columns
        .iter()
        .filter_map(|c| match c.storage {
            ColumnStorage::Fixed { offset } => {
                Some(offset + c.data_type.fixed_size().unwrap_or(0))
            }
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let mut fixed_zone = vec![0u8; fixed_len];
    let mut var_chunks: Vec<Vec<u8>> = vec![Vec::new(); columns.len()];

    for (column, value) in columns.iter().zip(values) {
        let resolved = match value {
            Write::Keep => {
                return Err(JetError::Format(
                    "Write::Keep requires the previous row bytes; encode_row cannot resolve it".into(),
                ))
            }
            Write::Auto => {
                return Err(JetError::Format(
                    "Write::Auto must be resolved to a concrete value before encoding".into(),
                ))
            }
            Write::Value(v) => v,
        };

        let col_index = column.column_number as usize;
        match (column.data_type, resolved) {
            (DataType::Boolean, Value::Bool(true)) => {
                null_mask[col_index / 8] |= 1 << (col_index % 8);
            }
            (DataType::Boolean, Value::Bool(false)) => {}
            (_, Value::Null) => {}
            (_, other) => {
                null_mask[col_index / 8] |= 1 << (col_index % 8);
                match column.storage {
                    ColumnStorage::Fixed { offset } => {
                        let bytes = encode_fixed_value(column, other)?;
                        fixed_zone[offset..offset + bytes.len()].copy_from_slice(&bytes);
                    }
                    ColumnStorage::Variable { table_index } => {
                        var_chunks[table_index] = encode_variable_value(column, other)?;
                    }
                }
            }
        }
    }

    let var_columns: Vec<&Vec<u8>> = columns
        .iter()
        .enumerate()
        .filter_map(|(i, c)| match c.storage {
            ColumnStorage::Variable { .. } => Some(&var_chunks[i]),
            _ => None,
        })
        .collect();

    let mut out = Vec::new();
    out.extend_from_slice(&(max_column_count as u16).to_le_bytes());
    out.extend_from_slice(&fixed_zone);

    let mut var_start_offsets = Vec::with_capacity(var_columns.len() + 1);
    var_start_offsets.push(out.len());
    for chunk in &var_columns {
        out.extend_from_slice(chunk);
        var_start_offsets.push(out.len());
    }

    match format.row_var_col_layout {
        RowVarColLayout::ShortOffsets => {
            for offset in var_start_offsets.iter().rev() {
                out.extend_from_slice(&(*offset as u16).to_le_bytes());
            }
        }
        RowVarColLayout::JumpTable => {
            // Offset groups in ascending column order, then the count byte,
            // so the count byte sits immediately before the NULL mask and
            // the decoder can walk backward from a fixed anchor.
            for offset in &var_start_offsets {
                let mut relative = *offset;
                while relative > 0xFE {
                    out.push(0xFF);
                    relative -= 256;
                }
                out.push(relative as u8);
            }
            out.push(var_columns.len() as u8);
        }
    }

    out.extend_from_slice(&null_mask);

    if out.len() < format.max_row_size && out.len() < 4 {
        // never exercised in practice; kept for the unlikely zero-column case
        out.resize(4, 0);
    }
    Ok(out)
}

fn encode_fixed_value(column: &Column, value: &Value) -> Result<Vec<u8>, JetError> {
    Ok(match (column.data_type, value) {
        (DataType::Byte, Value::Byte(b)) => vec![*b],
        (DataType::Int, Value::I16(v)) => v.to_le_bytes().to_vec(),
        (DataType::Long, Value::I32(v)) => v.to_le_bytes().to_vec(),
        (DataType::Float, Value::F32(v)) => v.to_le_bytes().to_vec(),
        (DataType::Double, Value::F64(v)) => v.to_le_bytes().to_vec(),
        // A Value::Money is already a valid i64; the representable-range
        // check lives in column::money_from_decimal_str, the one place a
        // currency value can actually overflow during construction.
        (DataType::Money, Value::Money(v)) => v.to_le_bytes().to_vec(),
        (DataType::ShortDateTime, Value::Date(v)) => v.to_le_bytes().to_vec(),
        (DataType::Guid, Value::Guid(s)) => crate::jet::column::write_guid_value(s)?.to_vec(),
        (DataType::Numeric, Value::Numeric { sign, digits, .. }) => {
            crate::jet::column::write_numeric(*sign, digits).to_vec()
        }
        (ty, v) => {
            return Err(JetError::Value(format!(
                "value {:?} does not match column type {:?}",
                v, ty
            )))
        }
    })
}

pub(crate) fn encode_variable_value(column: &Column, value: &Value) -> Result<Vec<u8>, JetError> {
    Ok(match (column.data_type, value) {
        (DataType::Text, Value::Text(s)) => {
            column.check_text_length(s.chars().count())?;
            crate::jet::text::encode(s, column.is_compressed_unicode())
        }
        (DataType::Binary | DataType::Unknown0D | DataType::Unknown11, Value::Bytes(b)) => b.clone(),
        (DataType::Ole | DataType::Memo, Value::LValRef { page, row }) => {
            let mut out = vec![0u8; 4];
            crate::jet::bytes::write_u24_le(&mut out[0..3], *page);
            out[3] = *row;
            out
        }
        (ty, v) => {
            return Err(JetError::Value(format!(
                "value {:?} does not match column type {:?}",
                v, ty
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jet::column::ColumnFlags;

    fn long_column(name: &str, number: u16, offset: usize) -> Column {
        Column {
            name: name.into(),
            column_index: number as usize,
            column_number: number,
            data_type: DataType::Long,
            length: 4,
            scale: 0,
            precision: 0,
            flags: ColumnFlags::FIXED_LENGTH,
            storage: ColumnStorage::Fixed { offset },
        }
    }

    fn text_column(name: &str, number: u16, table_index: usize) -> Column {
        Column {
            name: name.into(),
            column_index: number as usize,
            column_number: number,
            data_type: DataType::Text,
            length: 100,
            scale: 0,
            precision: 0,
            flags: ColumnFlags(0),
            storage: ColumnStorage::Variable { table_index },
        }
    }

    #[test]
    fn encode_decode_round_trip_short_layout() {
        let format = JetFormat::jet4();
        let columns = vec![long_column("Id", 0, 0), text_column("Name", 1, 0)];
        let values = vec![
            Write::Value(Value::I32(42)),
            Write::Value(Value::Text("Alice".into())),
        ];
        let encoded = encode_row(&values, &columns, &format).unwrap();
        let decoded = decode_row(&encoded, &columns, &format).unwrap();
        assert_eq!(decoded[0], Value::I32(42));
        assert_eq!(decoded[1], Value::Text("Alice".into()));
    }

    #[test]
    fn encode_decode_round_trip_jump_table_layout() {
        let format = JetFormat::jet12();
        let columns = vec![long_column("Id", 0, 0), text_column("Name", 1, 0)];
        let values = vec![
            Write::Value(Value::I32(7)),
            Write::Value(Value::Text("Bob".into())),
        ];
        let encoded = encode_row(&values, &columns, &format).unwrap();
        let decoded = decode_row(&encoded, &columns, &format).unwrap();
        assert_eq!(decoded[0], Value::I32(7));
        assert_eq!(decoded[1], Value::Text("Bob".into()));
    }

    #[test]
    fn null_value_round_trips_to_null() {
        let format = JetFormat::jet4();
        let columns = vec![long_column("Id", 0, 0)];
        let values = vec![Write::Value(Value::Null)];
        let encoded = encode_row(&values, &columns, &format).unwrap();
        let decoded = decode_row(&encoded, &columns, &format).unwrap();
        assert_eq!(decoded[0], Value::Null);
    }

    #[test]
    fn boolean_column_uses_null_mask_bit() {
        let format = JetFormat::jet4();
        let columns = vec![Column {
            name: "Active".into(),
            column_index: 0,
            column_number: 0,
            data_type: DataType::Boolean,
            length: 0,
            scale: 0,
            precision: 0,
            flags: ColumnFlags::FIXED_LENGTH,
            storage: ColumnStorage::Fixed { offset: 0 },
        }];
        let encoded = encode_row(&[Write::Value(Value::Bool(true))], &columns, &format).unwrap();
        let decoded = decode_row(&encoded, &columns, &format).unwrap();
        assert_eq!(decoded[0], Value::Bool(true));
    }

    #[test]
    fn data_page_add_and_read_row() {
        let format = JetFormat::jet4();
        let mut buf = vec![0u8; format.page_size];
        init_data_page(&mut buf, &format, 5);
        let row_number = add_data_page_row(&mut buf, &format, b"hello", 0).unwrap();
        assert_eq!(row_number, 0);
        assert_eq!(row_data(&buf, 0).unwrap(), b"hello");
    }

    #[test]
    fn mark_deleted_sets_flag_without_erasing_bytes() {
        let format = JetFormat::jet4();
        let mut buf = vec![0u8; format.page_size];
        init_data_page(&mut buf, &format, 5);
        add_data_page_row(&mut buf, &format, b"row-data", 0).unwrap();
        mark_row_deleted(&mut buf, 0);
        let (deleted, _) = row_flags(&buf, 0);
        assert!(deleted);
        assert_eq!(row_data(&buf, 0).unwrap(), b"row-data");
    }

    #[test]
    fn row_too_large_for_page_is_rejected() {
        let format = JetFormat::jet4();
        let mut buf = vec![0u8; format.page_size];
        init_data_page(&mut buf, &format, 5);
        let huge = vec![0u8; format.page_size];
        assert!(add_data_page_row(&mut buf, &format, &huge, 0).is_err());
    }
}
