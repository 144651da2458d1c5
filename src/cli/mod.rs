//! CLI subcommand implementations for the `jet` binary.
//!
//! The `jet` binary provides three subcommands for inspecting Jet database
//! files. CLI argument parsing uses clap derive macros, with the top-level
//! [`app::Cli`] struct and [`app::Commands`] enum defined in [`app`] and
//! shared between `main.rs` and `build.rs` (for man page generation) via
//! `include!()`.
//!
//! Each subcommand module follows the same pattern: an `Options` struct
//! holding the parsed arguments and a `pub fn execute(opts, writer) ->
//! Result<(), JetError>` entry point. The `writer: &mut dyn Write` parameter
//! allows output to be captured in tests or redirected to a file via the
//! global `--output` flag.
//!
//! # Subcommands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `jet info` | [`info`] | Show format/version and the table list |
//! | `jet schema` | [`schema`] | Dump a table's columns and indexes |
//! | `jet dump` | [`dump`] | Iterate and print a table's rows |
//!
//! # Common patterns
//!
//! - **`--json`** — Every subcommand supports structured JSON output via
//!   `#[derive(Serialize)]` structs and `serde_json`.
//! - **`--color`** (global) — Control colored terminal output (`auto`,
//!   `always`, `never`).
//! - **`--output` / `-o`** (global) — Redirect output to a file instead of
//!   stdout.

pub mod app;
pub mod dump;
pub mod info;
pub mod schema;

/// Write a line to the given writer, converting io::Error to JetError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::JetError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::JetError::Io(e.to_string()))
    };
}

pub(crate) use wprintln;
