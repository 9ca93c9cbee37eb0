use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::config::DatabaseConfig;

/// Open the configured catalog file, run lazy migrations, and return a live
/// connection. Foreign keys are switched on per connection so a book can never
/// point at a missing author, subject, publisher or location.
pub fn open_catalog(config: &DatabaseConfig) -> Result<Connection> {
    let db_path = config.resolved_path()?;

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(&db_path).context("failed to open SQLite database")?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .context("failed to set busy timeout")?;
    prepare(&conn)?;

    info!(path = %db_path.display(), "catalog database ready");
    Ok(conn)
}

/// Same schema on a throwaway in-memory database.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;
    ensure_schema(conn)
}

/// Create the five catalog tables when they are missing.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS autor (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nome TEXT NOT NULL,
            nacionalidade TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create autor table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS editora (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nome TEXT NOT NULL,
            cidade TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create editora table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tema (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nome TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create tema table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS localizacao (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            setor TEXT NOT NULL,
            prateleira TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create localizacao table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS livro (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titulo TEXT NOT NULL,
            ano_publicacao INTEGER NOT NULL,
            isbn TEXT NOT NULL,
            id_autor INTEGER NOT NULL,
            id_tema INTEGER NOT NULL,
            id_editora INTEGER NOT NULL,
            id_localizacao INTEGER NOT NULL,
            FOREIGN KEY(id_autor) REFERENCES autor(id),
            FOREIGN KEY(id_tema) REFERENCES tema(id),
            FOREIGN KEY(id_editora) REFERENCES editora(id),
            FOREIGN KEY(id_localizacao) REFERENCES localizacao(id)
        )",
        [],
    )
    .context("failed to create livro table")?;

    Ok(())
}
