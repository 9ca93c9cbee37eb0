//! Domain failures the interface reports to the user verbatim. Database
//! plumbing errors stay as `anyhow` chains; these are the cases a librarian
//! can act on.

use thiserror::Error;

use crate::models::EntityKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{field} is required.")]
    MissingField { field: &'static str },

    #[error("{field} must be an integer.")]
    InvalidNumber { field: &'static str },

    #[error("ID must be an integer.")]
    InvalidId,

    #[error("{entity} with ID {id} not found.")]
    NotFound { entity: EntityKind, id: i64 },

    #[error("{entity} {id} is still used by {books} book(s).")]
    InUse {
        entity: EntityKind,
        id: i64,
        books: i64,
    },

    /// Same rejection as `InUse` when the referencing books could not be
    /// counted.
    #[error("{entity} {id} is still used by at least one book.")]
    Referenced { entity: EntityKind, id: i64 },

    #[error("Book refers to an author, subject, publisher or location that does not exist.")]
    MissingReference,
}
