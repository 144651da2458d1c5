//! End-to-end auto-number persistence across a close/reopen cycle.

use tempfile::NamedTempFile;

use jet::jet::column::{Column, ColumnFlags, ColumnStorage, DataType, Value, Write};
use jet::jet::database::{Database, DatabaseConfig};
use jet::jet::format::JetVersion;

fn id_name_columns() -> Vec<Column> {
    vec![
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
        },
        Column {
            name: "Name".into(),
            column_index: 1,
            column_number: 1,
            data_type: DataType::Text,
            length: 50,
            scale: 0,
            precision: 0,
            flags: ColumnFlags::default(),
            storage: ColumnStorage::Variable { table_index: 0 },
        },
    ]
}

#[test]
fn reopen_preserves_auto_numbers_and_rows() {
    let tmp = NamedTempFile::new().unwrap();
    let path = tmp.path().to_path_buf();

    {
        let mut db = Database::create(&path, JetVersion::Jet4, DatabaseConfig::default()).unwrap();
        db.create_table("T", id_name_columns()).unwrap();
        db.add_row("T", vec![Write::Auto, Write::Value(Value::Text("Alice".into()))])
            .unwrap();
        db.add_row("T", vec![Write::Auto, Write::Value(Value::Text("Bob".into()))])
            .unwrap();
    }

    let mut db = Database::open(&path, DatabaseConfig::default()).unwrap();
    assert_eq!(db.table_names(), vec!["T".to_string()]);

    let row_ids = db.iter_row_ids("T").unwrap();
    let mut rows: Vec<(i32, String)> = row_ids
        .iter()
        .map(|id| {
            let values = db.get_row("T", *id).unwrap();
            let Value::I32(id_val) = values[0] else { panic!("expected I32 id") };
            let Value::Text(name) = &values[1] else { panic!("expected Text name") };
            (id_val, name.clone())
        })
        .collect();
    rows.sort_by_key(|(id, _)| *id);

    assert_eq!(
        rows,
        vec![(1, "Alice".to_string()), (2, "Bob".to_string())]
    );

    db.add_row("T", vec![Write::Auto, Write::Value(Value::Text("Carol".into()))])
        .unwrap();
    let row_ids = db.iter_row_ids("T").unwrap();
    assert_eq!(row_ids.len(), 3);
}
