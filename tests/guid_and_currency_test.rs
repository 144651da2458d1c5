//! GUID round trip and currency (MONEY) scale/overflow behavior through
//! the full `Database` row path, not just the column codec directly.

use tempfile::NamedTempFile;

use jet::jet::column::{money_from_decimal_str, Column, ColumnFlags, ColumnStorage, DataType, Value, Write};
use jet::jet::database::{Database, DatabaseConfig};
use jet::jet::format::JetVersion;

fn guid_column() -> Vec<Column> {
    vec![Column {
        name: "Key".into(),
        column_index: 0,
        column_number: 0,
        data_type: DataType::Guid,
        length: 16,
        scale: 0,
        precision: 0,
        flags: ColumnFlags::FIXED_LENGTH,
        storage: ColumnStorage::Fixed { offset: 0 },
    }]
}

fn money_column() -> Vec<Column> {
    vec![Column {
        name: "Amount".into(),
        column_index: 0,
        column_number: 0,
        data_type: DataType::Money,
        length: 8,
        scale: 4,
        precision: 0,
        flags: ColumnFlags::FIXED_LENGTH,
        storage: ColumnStorage::Fixed { offset: 0 },
    }]
}

#[test]
fn guid_round_trips_through_a_real_table() {
    let tmp = NamedTempFile::new().unwrap();
    let mut db = Database::create(tmp.path(), JetVersion::Jet4, DatabaseConfig::default()).unwrap();
    db.create_table("T", guid_column()).unwrap();

    let guid = "{3F2504E0-4F89-11D3-9A0C-0305E82C3301}";
    let row_id = db
        .add_row("T", vec![Write::Value(Value::Guid(guid.to_string()))])
        .unwrap();

    let values = db.get_row("T", row_id).unwrap();
    match &values[0] {
        Value::Guid(g) => assert_eq!(g.to_uppercase(), guid.to_uppercase()),
        other => panic!("expected Guid, got {:?}", other),
    }
}

#[test]
fn money_round_trips_at_scale_four() {
    let tmp = NamedTempFile::new().unwrap();
    let mut db = Database::create(tmp.path(), JetVersion::Jet4, DatabaseConfig::default()).unwrap();
    db.create_table("T", money_column()).unwrap();

    // -12345.6789 at scale 4 is the integer -123456789 ten-thousandths.
    let row_id = db
        .add_row("T", vec![Write::Value(Value::Money(-123_456_789))])
        .unwrap();

    let values = db.get_row("T", row_id).unwrap();
    match values[0] {
        Value::Money(cents) => assert_eq!(cents, -123_456_789),
        ref other => panic!("expected Money, got {:?}", other),
    }
}

#[test]
fn decimal_currency_string_writes_through_a_real_table() {
    let tmp = NamedTempFile::new().unwrap();
    let mut db = Database::create(tmp.path(), JetVersion::Jet4, DatabaseConfig::default()).unwrap();
    db.create_table("T", money_column()).unwrap();

    let parsed = money_from_decimal_str("-12345.6789").unwrap();
    let row_id = db.add_row("T", vec![Write::Value(parsed)]).unwrap();

    let values = db.get_row("T", row_id).unwrap();
    match values[0] {
        Value::Money(cents) => assert_eq!(cents, -123_456_789),
        ref other => panic!("expected Money, got {:?}", other),
    }
}

#[test]
fn decimal_currency_string_with_too_many_decimals_is_rejected() {
    let err = money_from_decimal_str("0.12345").unwrap_err();
    assert!(matches!(err, jet::JetError::Value(_)));
}

#[test]
fn text_longer_than_column_limit_is_rejected() {
    let tmp = NamedTempFile::new().unwrap();
    let mut db = Database::create(tmp.path(), JetVersion::Jet4, DatabaseConfig::default()).unwrap();
    let columns = vec![Column {
        name: "Name".into(),
        column_index: 0,
        column_number: 0,
        data_type: DataType::Text,
        length: 5,
        scale: 0,
        precision: 0,
        flags: ColumnFlags::COMPRESSED_UNICODE,
        storage: ColumnStorage::Variable { table_index: 0 },
    }];
    db.create_table("T", columns).unwrap();

    let err = db
        .add_row("T", vec![Write::Value(Value::Text("TooLong".into()))])
        .unwrap_err();
    assert!(matches!(err, jet::JetError::Value(_)));
}
