//! The column/type model (§4.4 Data-type semantics, §3 Column).
//!
//! A [`Column`] carries everything the record codec needs to place and
//! decode one field of a row: its [`DataType`], fixed/variable storage
//! location, and scale/precision for NUMERIC and MONEY. [`Value`] is the
//! tagged union every decoded field becomes, replacing the reflection-style
//! `Object[]` row the source format suggests (§9).

use chrono::{Duration, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jet::bytes::{fix_numeric_byte_order, swap_guid_bytes};
use crate::JetError;

/// Access column data type, one byte on disk (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    Boolean = 0x01,
    Byte = 0x02,
    Int = 0x03,
    Long = 0x04,
    Money = 0x05,
    Float = 0x06,
    Double = 0x07,
    ShortDateTime = 0x08,
    Binary = 0x09,
    Text = 0x0A,
    Ole = 0x0B,
    Memo = 0x0C,
    Unknown0D = 0x0D,
    Guid = 0x0F,
    Numeric = 0x10,
    Unknown11 = 0x11,
}

impl DataType {
    pub fn from_u8(b: u8) -> Result<Self, JetError> {
        Ok(match b {
            0x01 => DataType::Boolean,
            0x02 => DataType::Byte,
            0x03 => DataType::Int,
            0x04 => DataType::Long,
            0x05 => DataType::Money,
            0x06 => DataType::Float,
            0x07 => DataType::Double,
            0x08 => DataType::ShortDateTime,
            0x09 => DataType::Binary,
            0x0A => DataType::Text,
            0x0B => DataType::Ole,
            0x0C => DataType::Memo,
            0x0D => DataType::Unknown0D,
            0x0F => DataType::Guid,
            0x10 => DataType::Numeric,
            0x11 => DataType::Unknown11,
            other => return Err(JetError::Format(format!("unknown column type byte 0x{:02x}", other))),
        })
    }

    /// Fixed on-disk size in bytes, or `None` for variable-length types
    /// (§4.4 table).
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            DataType::Boolean => Some(0),
            DataType::Byte => Some(1),
            DataType::Int => Some(2),
            DataType::Long | DataType::Float => Some(4),
            DataType::Money | DataType::Double | DataType::ShortDateTime => Some(8),
            DataType::Numeric => Some(17),
            DataType::Guid => Some(16),
            DataType::Text
            | DataType::Binary
            | DataType::Ole
            | DataType::Memo
            | DataType::Unknown0D
            | DataType::Unknown11 => None,
        }
    }

    pub fn is_variable_length(self) -> bool {
        self.fixed_size().is_none()
    }

    /// Long-value types are always stored via an LVAL reference, never
    /// inline in the row's variable-data zone directly (§4.3).
    pub fn is_long_value(self) -> bool {
        matches!(self, DataType::Ole | DataType::Memo)
    }
}

/// Column flag bits (§3 Column), stored as the raw on-disk byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnFlags(pub u8);

impl ColumnFlags {
    pub const FIXED_LENGTH: ColumnFlags = ColumnFlags(0x01);
    pub const AUTO_NUMBER: ColumnFlags = ColumnFlags(0x04);
    pub const AUTO_NUMBER_GUID: ColumnFlags = ColumnFlags(0x40);
    pub const COMPRESSED_UNICODE: ColumnFlags = ColumnFlags(0x80);

    pub fn contains(self, other: ColumnFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ColumnFlags {
    type Output = ColumnFlags;
    fn bitor(self, rhs: ColumnFlags) -> ColumnFlags {
        ColumnFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ColumnFlags {
    fn bitor_assign(&mut self, rhs: ColumnFlags) {
        self.0 |= rhs.0;
    }
}

/// Where a column's bytes live within a row's physical layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ColumnStorage {
    /// Offset within the fixed-data zone.
    Fixed { offset: usize },
    /// Index into the row's variable-length offset table.
    Variable { table_index: usize },
}

/// A table column definition (§3 Column).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Zero-based position in the table's logical column list.
    pub column_index: usize,
    /// Position as physically stored in the table definition.
    pub column_number: u16,
    pub data_type: DataType,
    /// Declared length: fixed size for fixed-length types, else the
    /// maximum byte length for variable-length types.
    pub length: u16,
    pub scale: u8,
    pub precision: u8,
    pub flags: ColumnFlags,
    pub storage: ColumnStorage,
}

impl Column {
    pub fn is_fixed_length(&self) -> bool {
        self.flags.contains(ColumnFlags::FIXED_LENGTH)
    }

    pub fn is_auto_number(&self) -> bool {
        self.flags.contains(ColumnFlags::AUTO_NUMBER)
    }

    pub fn is_auto_number_guid(&self) -> bool {
        self.flags.contains(ColumnFlags::AUTO_NUMBER_GUID)
    }

    pub fn is_compressed_unicode(&self) -> bool {
        self.flags.contains(ColumnFlags::COMPRESSED_UNICODE)
    }

    /// Validate the invariants listed in §3 Column.
    pub fn validate(&self) -> Result<(), JetError> {
        if self.is_fixed_length() != !self.data_type.is_variable_length() {
            return Err(JetError::Value(format!(
                "column {}: fixed-length flag disagrees with data type {:?}",
                self.name, self.data_type
            )));
        }
        if let Some(fixed) = self.data_type.fixed_size() {
            if self.is_fixed_length() && self.length as usize != fixed {
                return Err(JetError::Value(format!(
                    "column {}: declared length {} does not match fixed size {} for {:?}",
                    self.name, self.length, fixed, self.data_type
                )));
            }
        }
        if self.is_auto_number() && !matches!(self.data_type, DataType::Long | DataType::Guid) {
            return Err(JetError::Value(format!(
                "column {}: auto-number column must be LONG or GUID, found {:?}",
                self.name, self.data_type
            )));
        }
        if self.is_compressed_unicode() && !matches!(self.data_type, DataType::Text | DataType::Memo) {
            return Err(JetError::Value(format!(
                "column {}: compressed-unicode flag only valid on TEXT/MEMO, found {:?}",
                self.name, self.data_type
            )));
        }
        if self.data_type == DataType::Numeric && self.scale as usize > 28 {
            return Err(JetError::Value(format!(
                "column {}: NUMERIC scale {} out of range",
                self.name, self.scale
            )));
        }
        Ok(())
    }

    /// Reject a TEXT value whose character count falls outside
    /// `[min_chars, max_chars]` (§4.4 "text longer than `max_chars` or
    /// shorter than `min_chars` raises `TextLengthError`"). This engine's
    /// column schema only records an upper bound (`length`); `min_chars`
    /// is always 0, so only the long side of the check can ever fire.
    pub fn check_text_length(&self, char_count: usize) -> Result<(), JetError> {
        let max_chars = self.length as usize;
        if char_count > max_chars {
            return Err(JetError::Value(format!(
                "column {}: text is {} characters, longer than the column's {} character limit",
                self.name, char_count, max_chars
            )));
        }
        Ok(())
    }
}

/// A decoded row field (§9: replaces reflection-style `Object[]` rows).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(u8),
    I16(i16),
    I32(i32),
    F32(f32),
    F64(f64),
    /// Days since the Access epoch (1899-12-30), as read from an 8-byte
    /// `f64`; kept as the raw day count to preserve bit-exact round trips.
    Date(f64),
    /// Fixed-point currency value at scale 4, i.e. ten-thousandths.
    Money(i64),
    Guid(String),
    /// `digits` is the 16-byte big-endian magnitude; `sign` is `true` for
    /// negative.
    Numeric { sign: bool, scale: u8, digits: [u8; 16] },
    Text(String),
    Bytes(Vec<u8>),
    /// Reference to an LVAL chain not yet materialized (§4.3); resolved by
    /// [`crate::jet::lval`] on demand.
    LValRef { page: u32, row: u8 },
}

/// Write-time intent for one column, replacing the source's
/// `AUTO_NUMBER`/`KEEP_VALUE` sentinel objects (§9).
#[derive(Debug, Clone)]
pub enum Write {
    /// Let the table manager generate the next auto-number value.
    Auto,
    /// Preserve whatever bytes are already on disk for this column
    /// (used by `update_row` to avoid rewriting unread long values).
    Keep,
    Value(Value),
}

/// Access epoch: days before 1899-12-30 are negative.
fn access_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid calendar date")
}

/// Convert a Jet SHORT_DATE_TIME day count into a `chrono` naive date-time.
pub fn date_from_days(days: f64) -> Option<chrono::NaiveDateTime> {
    let whole_days = days.trunc() as i64;
    let frac = days.fract().abs();
    let date = access_epoch().checked_add_signed(Duration::days(whole_days))?;
    let seconds_in_day = (frac * 86_400.0).round() as i64;
    date.and_hms_opt(0, 0, 0)?.checked_add_signed(Duration::seconds(seconds_in_day))
}

/// Convert a `chrono` naive date-time into a Jet SHORT_DATE_TIME day count.
pub fn days_from_date(dt: chrono::NaiveDateTime) -> f64 {
    let delta = dt.date().signed_duration_since(access_epoch());
    let whole = delta.num_days() as f64;
    let seconds = dt.time().num_seconds_from_midnight() as f64;
    whole + seconds / 86_400.0
}

/// Encode a GUID value, accepting the braced or unbraced string form, into
/// the on-disk `[u32 LE][u16 LE][u16 LE][u16 BE][6 bytes BE]` layout.
pub fn write_guid_value(s: &str) -> Result<[u8; 16], JetError> {
    let trimmed = s.trim_start_matches('{').trim_end_matches('}');
    let uuid = Uuid::parse_str(trimmed)
        .map_err(|e| JetError::Value(format!("malformed GUID {:?}: {}", s, e)))?;
    let mut bytes = *uuid.as_bytes();
    swap_guid_bytes(&mut bytes);
    Ok(bytes)
}

/// Decode the on-disk GUID bytes back into `{xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx}`.
pub fn read_guid_value(bytes: &[u8; 16]) -> String {
    let mut swapped = *bytes;
    swap_guid_bytes(&mut swapped);
    let uuid = Uuid::from_bytes(swapped);
    format!("{{{}}}", uuid.hyphenated())
}

/// Decode 17 on-disk NUMERIC bytes (`[u8 sign][16 bytes integer]`, §4.4).
pub fn read_numeric(bytes: &[u8], scale: u8) -> Value {
    let sign = bytes[0] != 0;
    let mut words = [0u8; 16];
    words.copy_from_slice(&bytes[1..17]);
    let digits = fix_numeric_byte_order(&words);
    Value::Numeric { sign, scale, digits }
}

/// Parse a decimal currency string (e.g. `"-12345.6789"`) into a
/// [`Value::Money`] at MONEY's fixed scale of 4 (§4.4, §8 scenario F).
/// More than 4 fractional digits is rejected outright rather than rounded
/// ("too many decimals"); an integer part that would overflow the scaled
/// `i64` raises the same currency-out-of-range error the fixed-size MONEY
/// encoding itself can never trigger (a `Value::Money` is already a valid
/// `i64` by construction, so this is the one place the check applies).
pub fn money_from_decimal_str(s: &str) -> Result<Value, JetError> {
    let trimmed = s.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    let malformed = || JetError::Value(format!("{:?} is not a valid currency value", s));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    if frac_part.len() > 4 {
        return Err(JetError::Value(format!(
            "currency value {:?} has {} digits after the decimal point, more than the 4 a MONEY column stores",
            s,
            frac_part.len()
        )));
    }

    let int_value: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| malformed())?
    };
    let frac_value: i64 = format!("{:0<4}", frac_part).parse().map_err(|_| malformed())?;

    let scaled = int_value
        .checked_mul(10_000)
        .and_then(|whole| whole.checked_add(frac_value))
        .ok_or_else(|| JetError::Value(format!("currency value {:?} is out of the representable range", s)))?;

    Ok(Value::Money(if negative { -scaled } else { scaled }))
}

/// Encode a NUMERIC value back into its 17-byte on-disk form.
pub fn write_numeric(sign: bool, digits: &[u8; 16]) -> [u8; 17] {
    let mut out = [0u8; 17];
    out[0] = if sign { 1 } else { 0 };
    let swapped = fix_numeric_byte_order(digits);
    out[1..17].copy_from_slice(&swapped);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_column() -> Column {
        Column {
            name: "Name".into(),
            column_index: 0,
            column_number: 0,
            data_type: DataType::Text,
            length: 100,
            scale: 0,
            precision: 0,
            flags: ColumnFlags::COMPRESSED_UNICODE,
            storage: ColumnStorage::Variable { table_index: 0 },
        }
    }

    #[test]
    fn validate_accepts_well_formed_text_column() {
        assert!(text_column().validate().is_ok());
    }

    #[test]
    fn validate_rejects_auto_number_on_text() {
        let mut col = text_column();
        col.flags |= ColumnFlags::AUTO_NUMBER;
        assert!(col.validate().is_err());
    }

    #[test]
    fn validate_rejects_compressed_unicode_on_long() {
        let col = Column {
            name: "Id".into(),
            column_index: 0,
            column_number: 0,
            data_type: DataType::Long,
            length: 4,
            scale: 0,
            precision: 0,
            flags: ColumnFlags::FIXED_LENGTH | ColumnFlags::COMPRESSED_UNICODE,
            storage: ColumnStorage::Fixed { offset: 0 },
        };
        assert!(col.validate().is_err());
    }

    #[test]
    fn guid_round_trips_through_byte_swap() {
        let s = "{3F2504E0-4F89-11D3-9A0C-0305E82C3301}";
        let bytes = write_guid_value(s).unwrap();
        let back = read_guid_value(&bytes);
        assert_eq!(back.to_uppercase(), s.to_uppercase());
    }

    #[test]
    fn guid_without_braces_round_trips() {
        let s = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";
        let bytes = write_guid_value(s).unwrap();
        let back = read_guid_value(&bytes);
        assert_eq!(back, format!("{{{}}}", s.to_uppercase()));
    }

    #[test]
    fn numeric_round_trips() {
        let digits: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 48, 57];
        let encoded = write_numeric(true, &digits);
        let decoded = read_numeric(&encoded, 4);
        match decoded {
            Value::Numeric { sign, digits: d, .. } => {
                assert!(sign);
                assert_eq!(d, digits);
            }
            _ => panic!("expected Numeric"),
        }
    }

    #[test]
    fn money_from_decimal_str_parses_scale_four() {
        let value = money_from_decimal_str("-12345.6789").unwrap();
        assert_eq!(value, Value::Money(-123_456_789));
    }

    #[test]
    fn money_from_decimal_str_rejects_too_many_decimals() {
        let err = money_from_decimal_str("0.12345").unwrap_err();
        assert!(matches!(err, JetError::Value(_)));
    }

    #[test]
    fn money_from_decimal_str_rejects_overflow() {
        assert!(money_from_decimal_str("99999999999999999999.0").is_err());
    }

    #[test]
    fn check_text_length_rejects_text_past_the_limit() {
        let col = Column {
            name: "Name".into(),
            column_index: 0,
            column_number: 0,
            data_type: DataType::Text,
            length: 5,
            scale: 0,
            precision: 0,
            flags: ColumnFlags(0),
            storage: ColumnStorage::Variable { table_index: 0 },
        };
        assert!(col.check_text_length(5).is_ok());
        assert!(col.check_text_length(6).is_err());
    }

    #[test]
    fn date_round_trips_through_day_count() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let days = days_from_date(dt);
        let back = date_from_days(days).unwrap();
        assert_eq!(back, dt);
    }
}
