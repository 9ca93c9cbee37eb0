use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::models::{EntityKind, Publisher, PublisherInput};

use super::{expect_affected, map_in_use, sort_key};

fn publisher_from_row(row: &Row<'_>) -> rusqlite::Result<Publisher> {
    Ok(Publisher {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
    })
}

pub fn fetch_publishers(conn: &Connection) -> Result<Vec<Publisher>> {
    let mut stmt = conn
        .prepare("SELECT id, nome, cidade FROM editora ORDER BY id")
        .context("failed to prepare publisher query")?;

    let mut publishers = stmt
        .query_map([], publisher_from_row)
        .context("failed to load publishers")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect publishers")?;
    publishers.sort_by_cached_key(|publisher| sort_key(&publisher.name));

    Ok(publishers)
}

pub fn find_publisher(conn: &Connection, id: i64) -> Result<Option<Publisher>> {
    conn.query_row(
        "SELECT id, nome, cidade FROM editora WHERE id = ?1",
        params![id],
        publisher_from_row,
    )
    .optional()
    .context("failed to look up publisher")
}

pub fn create_publisher(conn: &Connection, input: &PublisherInput) -> Result<Publisher> {
    conn.execute(
        "INSERT INTO editora (nome, cidade) VALUES (?1, ?2)",
        params![input.name, input.city],
    )
    .context("failed to insert publisher")?;

    let id = conn.last_insert_rowid();
    debug!(id, "inserted publisher");
    Ok(Publisher {
        id,
        name: input.name.clone(),
        city: input.city.clone(),
    })
}

pub fn update_publisher(conn: &Connection, id: i64, input: &PublisherInput) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE editora SET nome = ?1, cidade = ?2 WHERE id = ?3",
            params![input.name, input.city, id],
        )
        .context("failed to update publisher")?;

    debug!(id, updated, "updated publisher");
    expect_affected(updated, EntityKind::Publisher, id)
}

pub fn delete_publisher(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM editora WHERE id = ?1", params![id])
        .map_err(|err| map_in_use(conn, err, EntityKind::Publisher, id))
        .context("failed to delete publisher")?;

    debug!(id, deleted, "deleted publisher");
    expect_affected(deleted, EntityKind::Publisher, id)
}
