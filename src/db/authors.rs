use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::models::{Author, AuthorInput, EntityKind};

use super::{expect_affected, map_in_use, sort_key};

fn author_from_row(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
        nationality: row.get(2)?,
    })
}

/// Every author, alphabetical regardless of case.
pub fn fetch_authors(conn: &Connection) -> Result<Vec<Author>> {
    let mut stmt = conn
        .prepare("SELECT id, nome, nacionalidade FROM autor ORDER BY id")
        .context("failed to prepare author query")?;

    let mut authors = stmt
        .query_map([], author_from_row)
        .context("failed to load authors")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect authors")?;
    authors.sort_by_cached_key(|author| sort_key(&author.name));

    Ok(authors)
}

pub fn find_author(conn: &Connection, id: i64) -> Result<Option<Author>> {
    conn.query_row(
        "SELECT id, nome, nacionalidade FROM autor WHERE id = ?1",
        params![id],
        author_from_row,
    )
    .optional()
    .context("failed to look up author")
}

/// Insert a new author, returning the hydrated struct so the caller can
/// focus it in the list.
pub fn create_author(conn: &Connection, input: &AuthorInput) -> Result<Author> {
    conn.execute(
        "INSERT INTO autor (nome, nacionalidade) VALUES (?1, ?2)",
        params![input.name, input.nationality],
    )
    .context("failed to insert author")?;

    let id = conn.last_insert_rowid();
    debug!(id, "inserted author");
    Ok(Author {
        id,
        name: input.name.clone(),
        nationality: input.nationality.clone(),
    })
}

pub fn update_author(conn: &Connection, id: i64, input: &AuthorInput) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE autor SET nome = ?1, nacionalidade = ?2 WHERE id = ?3",
            params![input.name, input.nationality, id],
        )
        .context("failed to update author")?;

    debug!(id, updated, "updated author");
    expect_affected(updated, EntityKind::Author, id)
}

/// Remove an author. Rejected while any book still references it.
pub fn delete_author(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM autor WHERE id = ?1", params![id])
        .map_err(|err| map_in_use(conn, err, EntityKind::Author, id))
        .context("failed to delete author")?;

    debug!(id, deleted, "deleted author");
    expect_affected(deleted, EntityKind::Author, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::error::CatalogError;

    fn input(name: &str, nationality: &str) -> AuthorInput {
        AuthorInput {
            name: name.to_string(),
            nationality: nationality.to_string(),
        }
    }

    #[test]
    fn insert_then_find_returns_inserted_values() {
        let conn = open_in_memory().unwrap();
        let created = create_author(&conn, &input("José Saramago", "Portuguese")).unwrap();

        let found = find_author(&conn, created.id).unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.nationality, "Portuguese");
    }

    #[test]
    fn listing_is_case_insensitive_alphabetical() {
        let conn = open_in_memory().unwrap();
        create_author(&conn, &input("eça de Queirós", "Portuguese")).unwrap();
        create_author(&conn, &input("Clarice Lispector", "Brazilian")).unwrap();
        create_author(&conn, &input("Fernando Pessoa", "Portuguese")).unwrap();

        let names: Vec<String> = fetch_authors(&conn)
            .unwrap()
            .into_iter()
            .map(|author| author.name)
            .collect();
        assert_eq!(
            names,
            ["Clarice Lispector", "eça de Queirós", "Fernando Pessoa"]
        );
    }

    #[test]
    fn listing_folds_accented_capitals() {
        let conn = open_in_memory().unwrap();
        for name in ["érico", "Zola", "Érico B", "eça"] {
            create_author(&conn, &input(name, "Brazilian")).unwrap();
        }

        let names: Vec<String> = fetch_authors(&conn)
            .unwrap()
            .into_iter()
            .map(|author| author.name)
            .collect();
        assert_eq!(names, ["eça", "Zola", "érico", "Érico B"]);
    }

    #[test]
    fn update_touches_only_the_targeted_row() {
        let conn = open_in_memory().unwrap();
        let first = create_author(&conn, &input("Machado de Assis", "Brazilian")).unwrap();
        let second = create_author(&conn, &input("Jorge Amado", "Brazilian")).unwrap();

        update_author(&conn, first.id, &input("Machado de Assis", "Brasileiro")).unwrap();

        assert_eq!(
            find_author(&conn, first.id).unwrap().unwrap().nationality,
            "Brasileiro"
        );
        assert_eq!(find_author(&conn, second.id).unwrap().unwrap(), second);
    }

    #[test]
    fn update_of_missing_row_is_not_found() {
        let conn = open_in_memory().unwrap();
        let err = update_author(&conn, 42, &input("Nobody", "None")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CatalogError>(),
            Some(&CatalogError::NotFound {
                entity: EntityKind::Author,
                id: 42
            })
        );
    }

    #[test]
    fn delete_then_find_is_absent() {
        let conn = open_in_memory().unwrap();
        let created = create_author(&conn, &input("Sophia de Mello Breyner", "Portuguese")).unwrap();

        delete_author(&conn, created.id).unwrap();
        assert!(find_author(&conn, created.id).unwrap().is_none());
        assert!(delete_author(&conn, created.id).is_err());
    }
}
