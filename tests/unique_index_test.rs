//! Unique index insertion, bulk load, and duplicate-key rejection.

use std::collections::HashSet;

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

/// Deterministic pseudo-random distinct values, avoiding a `rand` dependency
/// for what only needs to be "spread out", not cryptographically random.
fn distinct_values(count: usize) -> Vec<i32> {
    let mut seen = HashSet::new();
    let mut state: u64 = 0x9E3779B97F4A7C15;
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let candidate = (state >> 33) as i32;
        if seen.insert(candidate) {
            out.push(candidate);
        }
    }
    out
}

#[test]
fn unique_index_bulk_insert_and_validate() {
    let tmp = NamedTempFile::new().unwrap();
    let mut db = Database::create(tmp.path(), JetVersion::Jet4, DatabaseConfig::default()).unwrap();
    db.create_table("T", value_column()).unwrap();
    db.add_index("T", "Value_unique", vec![(0, true)], true).unwrap();

    for value in distinct_values(2_000) {
        db.add_row("T", vec![Write::Value(Value::I32(value))]).unwrap();
    }

    let table = db.table("T").unwrap();
    assert_eq!(table.indexes.len(), 1);
    table.indexes[0].cache.validate().unwrap();
}

#[test]
fn unique_index_rejects_duplicate_key() {
    let tmp = NamedTempFile::new().unwrap();
    let mut db = Database::create(tmp.path(), JetVersion::Jet4, DatabaseConfig::default()).unwrap();
    db.create_table("T", value_column()).unwrap();
    db.add_index("T", "Value_unique", vec![(0, true)], true).unwrap();

    db.add_row("T", vec![Write::Value(Value::I32(42))]).unwrap();
    let result = db.add_row("T", vec![Write::Value(Value::I32(42))]);
    assert!(result.is_err(), "duplicate key was not rejected");
}
