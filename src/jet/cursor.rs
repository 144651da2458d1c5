//! Cursors and joiners: ordered traversal over a table's rows, either in
//! physical page/row order or via one of its indexes (§4).

use crate::jet::column::Value;
use crate::jet::format::JetFormat;
use crate::jet::page_channel::PageChannel;
use crate::jet::table::{RowId, Table};
use crate::JetError;

/// A resumable position over a table's rows, either walking physical row
/// order or an index's key order. Built once up front from a snapshot of
/// row ids; `next`/`previous` just walk that snapshot and re-read each row.
pub struct Cursor<'t> {
    table: &'t Table,
    format: &'t JetFormat,
    row_ids: Vec<RowId>,
    position: Option<usize>,
}

impl<'t> Cursor<'t> {
    /// A cursor over every row in physical page/row order.
    pub fn over_table(table: &'t Table, format: &'t JetFormat, channel: &mut PageChannel) -> Result<Self, JetError> {
        let row_ids = table.iter_row_ids(channel)?;
        Ok(Cursor {
            table,
            format,
            row_ids,
            position: None,
        })
    }

    /// A cursor over every row in the named index's key order. Takes the
    /// table mutably because walking an index page cache loads pages into
    /// it on demand.
    pub fn over_index(
        table: &'t mut Table,
        index_name: &str,
        format: &'t JetFormat,
        channel: &mut PageChannel,
    ) -> Result<Self, JetError> {
        let idx = table
            .indexes
            .iter()
            .position(|i| i.name.eq_ignore_ascii_case(index_name))
            .ok_or_else(|| JetError::Lookup(format!("no such index {:?}", index_name)))?;

        let row_ids: Vec<RowId> = table.indexes[idx]
            .cache
            .leaf_row_ids_in_order(channel)?
            .into_iter()
            .map(|(page, row)| RowId { page, row })
            .collect();

        Ok(Cursor {
            table: &*table,
            format,
            row_ids,
            position: None,
        })
    }

    /// Advance to and return the next row, or `None` at end of cursor.
    pub fn next(&mut self, channel: &mut PageChannel) -> Option<Result<(RowId, Vec<Value>), JetError>> {
        let next_pos = match self.position {
            None => 0,
            Some(p) => p + 1,
        };
        let row_id = *self.row_ids.get(next_pos)?;
        self.position = Some(next_pos);
        Some(self.table.get_row(row_id, self.format, channel).map(|v| (row_id, v)))
    }

    /// Step back to and return the previous row, or `None` if already at
    /// the first row (or the cursor has not been advanced yet).
    pub fn previous(&mut self, channel: &mut PageChannel) -> Option<Result<(RowId, Vec<Value>), JetError>> {
        let pos = self.position?;
        if pos == 0 {
            self.position = None;
            return None;
        }
        let prev_pos = pos - 1;
        let row_id = self.row_ids[prev_pos];
        self.position = Some(prev_pos);
        Some(self.table.get_row(row_id, self.format, channel).map(|v| (row_id, v)))
    }

    /// Reset to before the first row.
    pub fn reset(&mut self) {
        self.position = None;
    }

    /// Total number of rows this cursor will walk.
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }
}

/// Follows a single-column foreign-key reference from a row in one table to
/// its matching row(s) in another, via the referenced table's index (§4.5:
/// relationships/joins are resolved by looking up the foreign key value in
/// the child table's index on that column, there being no separate join
/// executor in this engine).
pub struct Joiner<'t> {
    child: &'t mut Table,
    child_index_name: String,
}

impl<'t> Joiner<'t> {
    pub fn new(child: &'t mut Table, child_index_name: impl Into<String>) -> Self {
        Joiner {
            child,
            child_index_name: child_index_name.into(),
        }
    }

    /// Rows in `child` whose indexed column(s) produce exactly `key`, per
    /// `Table::index_key_for_row`'s encoding of `key_values`.
    pub fn matching_rows(
        &mut self,
        key_values: &[Value],
        format: &JetFormat,
        channel: &mut PageChannel,
    ) -> Result<Vec<(RowId, Vec<Value>)>, JetError> {
        let idx = self
            .child
            .indexes
            .iter()
            .position(|i| i.name.eq_ignore_ascii_case(&self.child_index_name))
            .ok_or_else(|| JetError::Lookup(format!("no such index {:?}", self.child_index_name)))?;

        let target_key = self.child.index_key_for_row(&self.child.indexes[idx], key_values);

        let mut out = Vec::new();
        for (page, row) in self.child.indexes[idx].cache.leaf_row_ids_in_order(channel)? {
            let row_id = RowId { page, row };
            let values = self.child.get_row(row_id, format, channel)?;
            let row_key = self.child.index_key_for_row(&self.child.indexes[idx], &values);
            if row_key == target_key {
                out.push((row_id, values));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jet::column::{Column, ColumnFlags, ColumnStorage, DataType, Write};
    use tempfile::NamedTempFile;

    fn open_channel(pages: usize, format: &JetFormat) -> (NamedTempFile, PageChannel) {
        let tmp = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp.as_file(), &vec![0u8; pages * format.page_size]).unwrap();
        (tmp, PageChannel::open(tmp.path(), format, false, false).unwrap())
    }

    fn id_column() -> Column {
        Column {
            name: "Id".into(),
            column_index: 0,
            column_number: 0,
            data_type: DataType::Long,
            length: 4,
            scale: 0,
            precision: 0,
            flags: ColumnFlags::FIXED_LENGTH | ColumnFlags::AUTO_NUMBER,
            storage: ColumnStorage::Fixed { offset: 0 },
        }
    }

    #[test]
    fn table_order_cursor_visits_every_row_once() {
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        let mut table = Table::create("T".into(), vec![id_column()], &format, &mut channel).unwrap();
        for _ in 0..5 {
            table.add_row(vec![Write::Auto], &format, &mut channel).unwrap();
        }

        let mut cursor = Cursor::over_table(&table, &format, &mut channel).unwrap();
        let mut seen = Vec::new();
        while let Some(row) = cursor.next(&mut channel) {
            let (_, values) = row.unwrap();
            seen.push(values[0].clone());
        }
        assert_eq!(seen.len(), 5);
        assert_eq!(cursor.len(), 5);
    }

    #[test]
    fn index_cursor_visits_rows_in_key_order() {
        let format = JetFormat::jet4();
        let (_tmp, mut channel) = open_channel(1, &format);
        let mut table = Table::create("T".into(), vec![id_column()], &format, &mut channel).unwrap();
        table
            .add_index("PK".into(), vec![(0, false)], true, &format, &mut channel)
            .unwrap();
        for _ in 0..3 {
            table.add_row(vec![Write::Auto], &format, &mut channel).unwrap();
        }
        table.flush_indexes(&mut channel, &format).unwrap();

        let mut cursor = Cursor::over_index(&mut table, "PK", &format, &mut channel).unwrap();
        let mut ids = Vec::new();
        while let Some(row) = cursor.next(&mut channel) {
            let (_, values) = row.unwrap();
            if let Value::I32(v) = values[0] {
                ids.push(v);
            }
        }
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
