//! Persistence module split into one data-access submodule per table.

mod authors;
mod books;
mod connection;
mod locations;
mod publishers;
mod subjects;

use anyhow::Result;
use rusqlite::{Connection, Error as SqlError, ErrorCode};
use tracing::warn;

use crate::error::CatalogError;
use crate::models::EntityKind;

pub use authors::{create_author, delete_author, fetch_authors, find_author, update_author};
pub use books::{
    count_books_referencing, create_book, delete_book, fetch_books, find_book, update_book,
};
pub use connection::{ensure_schema, open_catalog, open_in_memory};
pub use locations::{
    create_location, delete_location, fetch_locations, find_location, update_location,
};
pub use publishers::{
    create_publisher, delete_publisher, fetch_publishers, find_publisher, update_publisher,
};
pub use subjects::{create_subject, delete_subject, fetch_subjects, find_subject, update_subject};

fn is_constraint_violation(err: &SqlError) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    )
}

/// Turn an affected-row count of zero into a `NotFound` error.
fn expect_affected(affected: usize, entity: EntityKind, id: i64) -> Result<()> {
    if affected == 0 {
        Err(CatalogError::NotFound { entity, id }.into())
    } else {
        Ok(())
    }
}

/// Coerce a foreign-key rejection on delete into a message naming how many
/// books still point at the row. Any other error passes through untouched.
fn map_in_use(conn: &Connection, err: SqlError, entity: EntityKind, id: i64) -> anyhow::Error {
    if !is_constraint_violation(&err) {
        return err.into();
    }
    match count_books_referencing(conn, entity, id) {
        Ok(books) => CatalogError::InUse { entity, id, books }.into(),
        Err(count_err) => {
            warn!(
                %entity,
                id,
                error = %format!("{count_err:#}"),
                "could not count referencing books"
            );
            CatalogError::Referenced { entity, id }.into()
        }
    }
}

/// Case-insensitive sort key for list ordering. SQLite's `NOCASE` only folds
/// ASCII, so listings are ordered here instead.
fn sort_key(text: &str) -> String {
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use rusqlite::params;

    use super::*;

    #[test]
    fn in_use_without_a_count_drops_the_number() {
        let conn = open_in_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO autor (id, nome, nacionalidade) VALUES (1, 'Mia Couto', 'Mozambican');
             INSERT INTO tema (id, nome) VALUES (1, 'Novel');
             INSERT INTO editora (id, nome, cidade) VALUES (1, 'Caminho', 'Lisboa');
             INSERT INTO localizacao (id, setor, prateleira) VALUES (1, 'A', '1');
             INSERT INTO livro
                (titulo, ano_publicacao, isbn, id_autor, id_tema, id_editora, id_localizacao)
             VALUES ('Terra Sonâmbula', 1992, '972-21-0867-2', 1, 1, 1, 1);",
        )
        .unwrap();
        let err = conn
            .execute("DELETE FROM autor WHERE id = ?1", params![1])
            .unwrap_err();
        assert!(is_constraint_violation(&err));

        // no `livro` table here, so counting fails
        let bare = Connection::open_in_memory().unwrap();
        let mapped = map_in_use(&bare, err, EntityKind::Author, 1);
        assert_eq!(
            mapped.downcast_ref::<CatalogError>(),
            Some(&CatalogError::Referenced {
                entity: EntityKind::Author,
                id: 1,
            })
        );
        assert_eq!(mapped.to_string(), "Author 1 is still used by at least one book.");
    }

    #[test]
    fn sort_key_folds_non_ascii_case() {
        assert_eq!(sort_key("Érico"), sort_key("érico"));
        assert_eq!(sort_key("ÇA"), "ça");
    }
}
