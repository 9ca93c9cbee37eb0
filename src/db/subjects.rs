use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::models::{EntityKind, Subject, SubjectInput};

use super::{expect_affected, map_in_use, sort_key};

fn subject_from_row(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

pub fn fetch_subjects(conn: &Connection) -> Result<Vec<Subject>> {
    let mut stmt = conn
        .prepare("SELECT id, nome FROM tema ORDER BY id")
        .context("failed to prepare subject query")?;

    let mut subjects = stmt
        .query_map([], subject_from_row)
        .context("failed to load subjects")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect subjects")?;
    subjects.sort_by_cached_key(|subject| sort_key(&subject.name));

    Ok(subjects)
}

pub fn find_subject(conn: &Connection, id: i64) -> Result<Option<Subject>> {
    conn.query_row(
        "SELECT id, nome FROM tema WHERE id = ?1",
        params![id],
        subject_from_row,
    )
    .optional()
    .context("failed to look up subject")
}

pub fn create_subject(conn: &Connection, input: &SubjectInput) -> Result<Subject> {
    conn.execute("INSERT INTO tema (nome) VALUES (?1)", params![input.name])
        .context("failed to insert subject")?;

    let id = conn.last_insert_rowid();
    debug!(id, "inserted subject");
    Ok(Subject {
        id,
        name: input.name.clone(),
    })
}

pub fn update_subject(conn: &Connection, id: i64, input: &SubjectInput) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE tema SET nome = ?1 WHERE id = ?2",
            params![input.name, id],
        )
        .context("failed to update subject")?;

    debug!(id, updated, "updated subject");
    expect_affected(updated, EntityKind::Subject, id)
}

pub fn delete_subject(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM tema WHERE id = ?1", params![id])
        .map_err(|err| map_in_use(conn, err, EntityKind::Subject, id))
        .context("failed to delete subject")?;

    debug!(id, deleted, "deleted subject");
    expect_affected(deleted, EntityKind::Subject, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn named(name: &str) -> SubjectInput {
        SubjectInput {
            name: name.to_string(),
        }
    }

    #[test]
    fn crud_round_trip() {
        let conn = open_in_memory().unwrap();
        let poetry = create_subject(&conn, &named("Poetry")).unwrap();
        let history = create_subject(&conn, &named("History")).unwrap();

        let names: Vec<String> = fetch_subjects(&conn)
            .unwrap()
            .into_iter()
            .map(|subject| subject.name)
            .collect();
        assert_eq!(names, ["History", "Poetry"]);

        update_subject(&conn, poetry.id, &named("Lyric poetry")).unwrap();
        assert_eq!(
            find_subject(&conn, poetry.id).unwrap().unwrap().name,
            "Lyric poetry"
        );
        assert_eq!(find_subject(&conn, history.id).unwrap().unwrap(), history);

        delete_subject(&conn, poetry.id).unwrap();
        assert!(find_subject(&conn, poetry.id).unwrap().is_none());
    }
}
