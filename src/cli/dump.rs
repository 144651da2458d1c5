use std::io::Write;

use serde_json::{Map, Number, Value as Json};

use crate::cli::wprintln;
use crate::jet::column::{date_from_days, Value};
use crate::jet::database::{Database, DatabaseConfig};
use crate::JetError;

/// Options for the `jet dump` subcommand.
pub struct DumpOptions {
    /// Path to a Jet database file (.mdb/.accdb).
    pub file: String,
    /// Table name.
    pub table: String,
    /// Limit the number of rows printed.
    pub limit: Option<usize>,
    /// Emit output as JSON.
    pub json: bool,
}

/// Iterate and print a table's rows.
pub fn execute(opts: &DumpOptions, writer: &mut dyn Write) -> Result<(), JetError> {
    let mut db = Database::open(&opts.file, DatabaseConfig::default())?;
    let row_ids = db.iter_row_ids(&opts.table)?;

    let iter = row_ids.iter().take(opts.limit.unwrap_or(usize::MAX));

    if opts.json {
        let mut rows_json = Vec::new();
        for row_id in iter {
            let values = db.get_row(&opts.table, *row_id)?;
            let mut entry = Map::new();
            entry.insert("page".to_string(), Json::from(row_id.page));
            entry.insert("row".to_string(), Json::from(row_id.row));
            entry.insert(
                "values".to_string(),
                Json::Array(values.iter().map(value_to_json).collect()),
            );
            rows_json.push(Json::Object(entry));
        }
        let json = serde_json::to_string_pretty(&rows_json)
            .map_err(|e| JetError::Format(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    for row_id in iter {
        let values = db.get_row(&opts.table, *row_id)?;
        let rendered: Vec<String> = values.iter().map(format_value).collect();
        wprintln!(
            writer,
            "[{}:{}] {}",
            row_id.page,
            row_id.row,
            rendered.join(", ")
        )?;
    }
    Ok(())
}

/// Convert a decoded column value to a JSON value. `Value` does not derive
/// `Serialize` since `Numeric`'s big-endian digit buffer and `LValRef`'s
/// unresolved page pointer have no natural JSON shape; this maps each
/// variant to the closest JSON representation by hand.
fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Byte(b) => Json::from(*b),
        Value::I16(n) => Json::from(*n),
        Value::I32(n) => Json::from(*n),
        Value::F32(f) => Number::from_f64(*f as f64).map(Json::Number).unwrap_or(Json::Null),
        Value::F64(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Date(days) => Json::String(
            date_from_days(*days)
                .map(|d| d.to_string())
                .unwrap_or_else(|| format!("{}", days)),
        ),
        Value::Money(cents) => Json::String(format!("{}", *cents as f64 / 10_000.0)),
        Value::Guid(g) => Json::String(g.clone()),
        Value::Numeric { sign, scale, digits } => {
            Json::String(format_numeric(*sign, *scale, digits))
        }
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(crate::util::hex::format_bytes(b)),
        Value::LValRef { page, row } => {
            let mut entry = Map::new();
            entry.insert("lval_page".to_string(), Json::from(*page));
            entry.insert("lval_row".to_string(), Json::from(*row));
            Json::Object(entry)
        }
    }
}

/// Render a column value for human-readable terminal output.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Byte(b) => b.to_string(),
        Value::I16(n) => n.to_string(),
        Value::I32(n) => n.to_string(),
        Value::F32(f) => f.to_string(),
        Value::F64(f) => f.to_string(),
        Value::Date(days) => date_from_days(*days)
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("{}", days)),
        Value::Money(cents) => format!("{:.4}", *cents as f64 / 10_000.0),
        Value::Guid(g) => g.clone(),
        Value::Numeric { sign, scale, digits } => format_numeric(*sign, *scale, digits),
        Value::Text(s) => s.clone(),
        Value::Bytes(b) => crate::util::hex::format_bytes(b),
        Value::LValRef { page, row } => format!("<lval {}:{}>", page, row),
    }
}

fn format_numeric(sign: bool, scale: u8, digits: &[u8; 16]) -> String {
    let magnitude = digits
        .iter()
        .fold(0u128, |acc, &b| acc.wrapping_mul(256).wrapping_add(b as u128));
    let text = magnitude.to_string();
    let scale = scale as usize;
    let body = if scale == 0 {
        text
    } else if text.len() > scale {
        let (whole, frac) = text.split_at(text.len() - scale);
        format!("{}.{}", whole, frac)
    } else {
        format!("0.{:0>width$}", text, width = scale)
    };
    if sign {
        format!("-{}", body)
    } else {
        body
    }
}
