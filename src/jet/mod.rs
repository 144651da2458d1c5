//! Jet binary format parsing and mutation.
//!
//! This module contains the on-disk storage engine: page I/O, usage maps,
//! the row/record codec, long-value overflow chains, the column/type model,
//! the B-tree index page cache, the table manager, cursors, and the
//! database facade.
//!
//! Start with [`database::Database`] to open a `.mdb`/`.accdb` file, then
//! use [`database::Database::table`] to reach a [`table::Table`].

pub mod bytes;
pub mod column;
pub mod cursor;
pub mod database;
pub mod format;
pub mod index;
pub mod lval;
pub mod names;
pub mod page_channel;
pub mod row;
pub mod table;
pub mod text;
pub mod usage_map;
