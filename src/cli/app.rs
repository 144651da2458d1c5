use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "jet")]
#[command(about = "Read/write storage engine for Microsoft Access Jet database files")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show format/version and the table list
    Info {
        /// Path to a Jet database file (.mdb/.accdb)
        #[arg(short, long)]
        file: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Dump a table's columns and indexes
    Schema {
        /// Path to a Jet database file (.mdb/.accdb)
        #[arg(short, long)]
        file: String,

        /// Table name
        #[arg(short, long)]
        table: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Iterate and print a table's rows
    Dump {
        /// Path to a Jet database file (.mdb/.accdb)
        #[arg(short, long)]
        file: String,

        /// Table name
        #[arg(short, long)]
        table: String,

        /// Limit the number of rows printed
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
