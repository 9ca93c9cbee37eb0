use anyhow::{Context, Result};
use rusqlite::{params, Connection, Error as SqlError, OptionalExtension, Row};
use tracing::debug;

use crate::error::CatalogError;
use crate::models::{Author, Book, BookInput, EntityKind, Location, Publisher, Subject};

use super::{expect_affected, is_constraint_violation, sort_key};

/// Every book read goes through this join so callers always receive complete
/// referenced rows.
const BOOK_SELECT: &str = "SELECT
        l.id, l.titulo, l.ano_publicacao, l.isbn,
        a.id, a.nome, a.nacionalidade,
        t.id, t.nome,
        e.id, e.nome, e.cidade,
        loc.id, loc.setor, loc.prateleira
    FROM livro l
    JOIN autor a ON l.id_autor = a.id
    JOIN tema t ON l.id_tema = t.id
    JOIN editora e ON l.id_editora = e.id
    JOIN localizacao loc ON l.id_localizacao = loc.id";

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        publication_year: row.get(2)?,
        isbn: row.get(3)?,
        author: Author {
            id: row.get(4)?,
            name: row.get(5)?,
            nationality: row.get(6)?,
        },
        subject: Subject {
            id: row.get(7)?,
            name: row.get(8)?,
        },
        publisher: Publisher {
            id: row.get(9)?,
            name: row.get(10)?,
            city: row.get(11)?,
        },
        location: Location {
            id: row.get(12)?,
            sector: row.get(13)?,
            shelf: row.get(14)?,
        },
    })
}

fn map_missing_reference(err: SqlError) -> anyhow::Error {
    if is_constraint_violation(&err) {
        CatalogError::MissingReference.into()
    } else {
        err.into()
    }
}

/// All books with their references resolved, ordered by title.
pub fn fetch_books(conn: &Connection) -> Result<Vec<Book>> {
    let mut stmt = conn
        .prepare(&format!("{BOOK_SELECT} ORDER BY l.id"))
        .context("failed to prepare book query")?;

    let mut books = stmt
        .query_map([], book_from_row)
        .context("failed to load books")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect books")?;
    books.sort_by_cached_key(|book| sort_key(&book.title));

    Ok(books)
}

pub fn find_book(conn: &Connection, id: i64) -> Result<Option<Book>> {
    conn.query_row(
        &format!("{BOOK_SELECT} WHERE l.id = ?1"),
        params![id],
        book_from_row,
    )
    .optional()
    .context("failed to look up book")
}

/// Insert a book and read it back through the join, so the returned value
/// carries the referenced author, subject, publisher and location.
pub fn create_book(conn: &Connection, input: &BookInput) -> Result<Book> {
    conn.execute(
        "INSERT INTO livro
            (titulo, ano_publicacao, isbn, id_autor, id_tema, id_editora, id_localizacao)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            input.title,
            input.publication_year,
            input.isbn,
            input.author_id,
            input.subject_id,
            input.publisher_id,
            input.location_id,
        ],
    )
    .map_err(map_missing_reference)
    .context("failed to insert book")?;

    let id = conn.last_insert_rowid();
    debug!(id, "inserted book");
    find_book(conn, id)?.ok_or_else(|| {
        CatalogError::NotFound {
            entity: EntityKind::Book,
            id,
        }
        .into()
    })
}

pub fn update_book(conn: &Connection, id: i64, input: &BookInput) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE livro SET
                titulo = ?1, ano_publicacao = ?2, isbn = ?3,
                id_autor = ?4, id_tema = ?5, id_editora = ?6, id_localizacao = ?7
             WHERE id = ?8",
            params![
                input.title,
                input.publication_year,
                input.isbn,
                input.author_id,
                input.subject_id,
                input.publisher_id,
                input.location_id,
                id,
            ],
        )
        .map_err(map_missing_reference)
        .context("failed to update book")?;

    debug!(id, updated, "updated book");
    expect_affected(updated, EntityKind::Book, id)
}

pub fn delete_book(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM livro WHERE id = ?1", params![id])
        .context("failed to delete book")?;

    debug!(id, deleted, "deleted book");
    expect_affected(deleted, EntityKind::Book, id)
}

/// Number of books pointing at the given author, subject, publisher or
/// location. Books reference nothing of their own kind, so `Book` counts zero.
pub fn count_books_referencing(conn: &Connection, entity: EntityKind, id: i64) -> Result<i64> {
    let column = match entity {
        EntityKind::Author => "id_autor",
        EntityKind::Subject => "id_tema",
        EntityKind::Publisher => "id_editora",
        EntityKind::Location => "id_localizacao",
        EntityKind::Book => return Ok(0),
    };

    conn.query_row(
        &format!("SELECT COUNT(*) FROM livro WHERE {column} = ?1"),
        params![id],
        |row| row.get(0),
    )
    .context("failed to count referencing books")
}
