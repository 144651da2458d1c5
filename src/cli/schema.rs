use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::wprintln;
use crate::jet::database::{Database, DatabaseConfig};
use crate::jet::table::ColumnOrder;
use crate::JetError;

/// Options for the `jet schema` subcommand.
pub struct SchemaOptions {
    /// Path to a Jet database file (.mdb/.accdb).
    pub file: String,
    /// Table name.
    pub table: String,
    /// Emit output as JSON.
    pub json: bool,
}

#[derive(Serialize)]
struct ColumnJson {
    name: String,
    data_type: String,
    length: u16,
}

#[derive(Serialize)]
struct IndexJson {
    name: String,
    unique: bool,
    column_count: usize,
}

#[derive(Serialize)]
struct SchemaJson {
    table: String,
    columns: Vec<ColumnJson>,
    indexes: Vec<IndexJson>,
}

/// Dump a table's columns and indexes.
pub fn execute(opts: &SchemaOptions, writer: &mut dyn Write) -> Result<(), JetError> {
    let db = Database::open(&opts.file, DatabaseConfig::default())?;
    let table = db.table(&opts.table)?;

    let columns: Vec<ColumnJson> = table
        .columns(ColumnOrder::Display)
        .into_iter()
        .map(|c| ColumnJson {
            name: c.name.clone(),
            data_type: format!("{:?}", c.data_type),
            length: c.length,
        })
        .collect();

    let indexes: Vec<IndexJson> = table
        .indexes
        .iter()
        .map(|i| IndexJson {
            name: i.name.clone(),
            unique: i.unique,
            column_count: i.columns.len(),
        })
        .collect();

    if opts.json {
        let schema = SchemaJson {
            table: opts.table.clone(),
            columns,
            indexes,
        };
        let json = serde_json::to_string_pretty(&schema)
            .map_err(|e| JetError::Format(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    wprintln!(writer, "{} {}", "Table:".bold(), opts.table)?;
    wprintln!(writer, "{}", "  Columns:".bold())?;
    for col in &columns {
        wprintln!(writer, "    {} {} ({})", col.name, col.data_type, col.length)?;
    }
    wprintln!(writer, "{}", "  Indexes:".bold())?;
    for idx in &indexes {
        let unique = if idx.unique { "unique" } else { "non-unique" };
        wprintln!(
            writer,
            "    {} [{}] {} columns",
            idx.name,
            unique,
            idx.column_count
        )?;
    }
    Ok(())
}
