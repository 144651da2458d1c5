//! Long-value (MEMO) round trips across inline, single-page, and
//! multi-page LVAL chains (the boundary itself is exercised directly in
//! `jet::lval`'s own unit tests; this confirms the table manager carries
//! values through that boundary transparently).

use tempfile::NamedTempFile;

use jet::jet::column::{Column, ColumnFlags, ColumnStorage, DataType, Value, Write};
use jet::jet::database::{Database, DatabaseConfig};
use jet::jet::format::JetVersion;

fn memo_column() -> Vec<Column> {
    vec![Column {
        name: "Notes".into(),
        column_index: 0,
        column_number: 0,
        data_type: DataType::Memo,
        length: 0,
        scale: 0,
        precision: 0,
        flags: ColumnFlags::default(),
        storage: ColumnStorage::Variable { table_index: 0 },
    }]
}

fn round_trip(len: usize) {
    let tmp = NamedTempFile::new().unwrap();
    let mut db = Database::create(tmp.path(), JetVersion::Jet4, DatabaseConfig::default()).unwrap();
    db.create_table("Memos", memo_column()).unwrap();

    let text: String = "x".repeat(len);
    let row_id = db
        .add_row("Memos", vec![Write::Value(Value::Text(text.clone()))])
        .unwrap();

    let values = db.get_row("Memos", row_id).unwrap();
    match &values[0] {
        Value::Text(s) => assert_eq!(s, &text, "memo of length {} did not round-trip", len),
        other => panic!("expected Text, got {:?}", other),
    }
}

#[test]
fn inline_memo_round_trips() {
    round_trip(10);
}

#[test]
fn single_page_memo_round_trips() {
    round_trip(4_000);
}

#[test]
fn multi_page_memo_round_trips() {
    round_trip(100_000);
}
