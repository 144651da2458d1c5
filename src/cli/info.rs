use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::wprintln;
use crate::jet::database::{Database, DatabaseConfig};
use crate::JetError;

/// Options for the `jet info` subcommand.
pub struct InfoOptions {
    /// Path to a Jet database file (.mdb/.accdb).
    pub file: String,
    /// Emit output as JSON.
    pub json: bool,
}

#[derive(Serialize)]
struct InfoJson {
    file: String,
    version: String,
    table_count: usize,
    tables: Vec<String>,
}

/// Show a Jet database's detected format version and its table list.
pub fn execute(opts: &InfoOptions, writer: &mut dyn Write) -> Result<(), JetError> {
    let db = Database::open(&opts.file, DatabaseConfig::default())?;
    let tables = db.table_names();

    if opts.json {
        let info = InfoJson {
            file: opts.file.clone(),
            version: format!("{:?}", db.version()),
            table_count: tables.len(),
            tables,
        };
        let json = serde_json::to_string_pretty(&info)
            .map_err(|e| JetError::Format(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    wprintln!(writer, "{}", "Jet Database".bold())?;
    wprintln!(writer, "  File:    {}", opts.file)?;
    wprintln!(writer, "  Version: {:?}", db.version())?;
    wprintln!(writer, "  Tables:  {}", tables.len())?;
    for name in &tables {
        wprintln!(writer, "    {}", name)?;
    }
    Ok(())
}
