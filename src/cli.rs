use std::path::PathBuf;

use clap::Parser;

/// Terminal library catalog: books, authors, publishers, subjects and shelf
/// locations in a local SQLite database.
#[derive(Debug, Clone, Parser)]
#[command(name = "verbax", version, about)]
pub struct Cli {
    /// Configuration file (defaults to ~/.verbax/config.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite catalog file, overriding the configured path
    #[arg(short, long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Log filter directive such as `info` or `verbax=debug`
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}
