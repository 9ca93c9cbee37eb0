use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::models::{EntityKind, Location, LocationInput};

use super::{expect_affected, map_in_use, sort_key};

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        sector: row.get(1)?,
        shelf: row.get(2)?,
    })
}

/// Shelf positions ordered by sector, then shelf, so a walk through the list
/// follows the room.
pub fn fetch_locations(conn: &Connection) -> Result<Vec<Location>> {
    let mut stmt = conn
        .prepare("SELECT id, setor, prateleira FROM localizacao ORDER BY id")
        .context("failed to prepare location query")?;

    let mut locations = stmt
        .query_map([], location_from_row)
        .context("failed to load locations")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect locations")?;
    locations
        .sort_by_cached_key(|location| (sort_key(&location.sector), sort_key(&location.shelf)));

    Ok(locations)
}

pub fn find_location(conn: &Connection, id: i64) -> Result<Option<Location>> {
    conn.query_row(
        "SELECT id, setor, prateleira FROM localizacao WHERE id = ?1",
        params![id],
        location_from_row,
    )
    .optional()
    .context("failed to look up location")
}

pub fn create_location(conn: &Connection, input: &LocationInput) -> Result<Location> {
    conn.execute(
        "INSERT INTO localizacao (setor, prateleira) VALUES (?1, ?2)",
        params![input.sector, input.shelf],
    )
    .context("failed to insert location")?;

    let id = conn.last_insert_rowid();
    debug!(id, "inserted location");
    Ok(Location {
        id,
        sector: input.sector.clone(),
        shelf: input.shelf.clone(),
    })
}

pub fn update_location(conn: &Connection, id: i64, input: &LocationInput) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE localizacao SET setor = ?1, prateleira = ?2 WHERE id = ?3",
            params![input.sector, input.shelf, id],
        )
        .context("failed to update location")?;

    debug!(id, updated, "updated location");
    expect_affected(updated, EntityKind::Location, id)
}

pub fn delete_location(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM localizacao WHERE id = ?1", params![id])
        .map_err(|err| map_in_use(conn, err, EntityKind::Location, id))
        .context("failed to delete location")?;

    debug!(id, deleted, "deleted location");
    expect_affected(deleted, EntityKind::Location, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn shelf(sector: &str, shelf: &str) -> LocationInput {
        LocationInput {
            sector: sector.to_string(),
            shelf: shelf.to_string(),
        }
    }

    #[test]
    fn lists_in_room_order() {
        let conn = open_in_memory().unwrap();
        create_location(&conn, &shelf("B", "1")).unwrap();
        create_location(&conn, &shelf("A", "2")).unwrap();
        create_location(&conn, &shelf("A", "1")).unwrap();

        let labels: Vec<String> = fetch_locations(&conn)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(labels, ["A - 1", "A - 2", "B - 1"]);
    }

    #[test]
    fn update_and_delete() {
        let conn = open_in_memory().unwrap();
        let created = create_location(&conn, &shelf("C", "4")).unwrap();

        update_location(&conn, created.id, &shelf("C", "5")).unwrap();
        assert_eq!(find_location(&conn, created.id).unwrap().unwrap().shelf, "5");

        delete_location(&conn, created.id).unwrap();
        assert!(find_location(&conn, created.id).unwrap().is_none());
    }
}
