//! Jet (Microsoft Access `.mdb`/`.accdb`) storage engine.
//!
//! The `jetdb` crate (library name `jet`) provides Rust types and functions
//! for opening, reading, and writing Jet-format database files: schema
//! discovery (tables, columns, indexes), row iteration, and row insertion/
//! update/deletion, with transparent management of the on-disk page
//! allocation, index B-trees, and long-value ("LVAL") overflow chains.
//!
//! # CLI Reference
//!
//! Install the `jet` binary and use its subcommands to inspect Jet files
//! from the command line.
//!
//! ## Subcommands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`jet info`](cli::app::Commands::Info) | Show format/version and table list |
//! | [`jet schema`](cli::app::Commands::Schema) | Dump a table's columns and indexes |
//! | [`jet dump`](cli::app::Commands::Dump) | Iterate and print a table's rows |
//!
//! ## Global options
//!
//! All subcommands accept `--color <auto|always|never>` and `--output <file>`.
//! `dump` additionally accepts `--json` for machine-readable output.
//!
//! # Library API
//!
//! ```no_run
//! use jet::jet::database::{Database, DatabaseConfig};
//!
//! let mut db = Database::open("db.accdb", DatabaseConfig::default()).unwrap();
//! for row_id in db.iter_row_ids("Customers").unwrap() {
//!     let row = db.get_row("Customers", row_id).unwrap();
//!     println!("{:?}", row);
//! }
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`jet::format`] | Per-version `JetFormat` constants (page size, offsets) |
//! | [`jet::bytes`] | Little/big-endian integer helpers, GUID byte-swap |
//! | [`jet::page_channel`] | Fixed-size page I/O, allocation, optional codec |
//! | [`jet::usage_map`] | Inline and reference-style page ownership bitmaps |
//! | [`jet::row`] | Row/record codec (NULL mask, fixed/variable zones) |
//! | [`jet::lval`] | Long-value ("LVAL") overflow storage |
//! | [`jet::column`] | Column model and per-type value (de)serialization |
//! | [`jet::text`] | TEXT/MEMO (un)compression (SCSU interface) |
//! | [`jet::names`] | Reserved identifier detection/escaping |
//! | [`jet::index`] | B-tree index page cache, split/merge, entries |
//! | [`jet::table`] | Table definition parsing, row cursor, CRUD |
//! | [`jet::cursor`] | Cursor/joiner abstractions for keyed traversal |
//! | [`jet::database`] | Database facade: catalog, table lookup, config |

pub mod cli;
pub mod jet;
pub mod util;

use thiserror::Error;

/// Errors returned by `jet` operations.
#[derive(Error, Debug)]
pub enum JetError {
    /// Underlying file I/O failure (open, read, seek, write).
    #[error("I/O error: {0}")]
    Io(String),

    /// Page magic mismatch, out-of-range offset, unknown LVAL type, or
    /// missing system table.
    #[error("Format error: {0}")]
    Format(String),

    /// Currency overflow, numeric precision overflow, text too long/short,
    /// GUID pattern mismatch, or scale/precision out of range.
    #[error("Value error: {0}")]
    Value(String),

    /// SCSU decoder failure.
    #[error("Text decode error: {0}")]
    TextDecode(String),

    /// Identifier missing or duplicate.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Row state used against a stale table, deleted row accessed, or
    /// write attempted against a read-only database.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Convenience alias used throughout the crate.
pub type JetResult<T> = Result<T, JetError>;
