//! Deletion, iteration over survivors, and post-delete index validation.

use tempfile::NamedTempFile;

use jet::jet::column::{Column, ColumnFlags, ColumnStorage, DataType, Value, Write};
use jet::jet::database::{Database, DatabaseConfig};
use jet::jet::format::JetVersion;

fn value_column() -> Vec<Column> {
    vec![Column {
        name: "Value".into(),
        column_index: 0,
        column_number: 0,
        data_type: DataType::Long,
        length: 4,
        scale: 0,
        precision: 0,
        flags: ColumnFlags::FIXED_LENGTH,
        storage: ColumnStorage::Fixed { offset: 0 },
    }]
}

#[test]
fn deleting_odd_rows_leaves_only_even_rows() {
    let tmp = NamedTempFile::new().unwrap();
    let mut db = Database::create(tmp.path(), JetVersion::Jet4, DatabaseConfig::default()).unwrap();
    db.create_table("T", value_column()).unwrap();
    db.add_index("T", "Value_idx", vec![(0, false)], false).unwrap();

    let mut row_ids = Vec::with_capacity(100);
    for i in 0..100i32 {
        let row_id = db.add_row("T", vec![Write::Value(Value::I32(i))]).unwrap();
        row_ids.push(row_id);
    }

    for (i, row_id) in row_ids.iter().enumerate() {
        if i % 2 == 1 {
            db.delete_row("T", *row_id).unwrap();
        }
    }

    let remaining = db.iter_row_ids("T").unwrap();
    let mut values: Vec<i32> = remaining
        .iter()
        .map(|id| {
            let row = db.get_row("T", *id).unwrap();
            let Value::I32(v) = row[0] else { panic!("expected I32") };
            v
        })
        .collect();
    values.sort_unstable();

    let expected: Vec<i32> = (0..100).step_by(2).collect();
    assert_eq!(values, expected);

    let table = db.table("T").unwrap();
    table.indexes[0].cache.validate().unwrap();
}
