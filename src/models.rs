//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. These types stay light-weight data holders so the persistence layer
//! can focus on SQL and the UI layer on presentation.

use std::fmt;

/// The five catalog entities. Used to label screens, messages and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Book,
    Author,
    Publisher,
    Subject,
    Location,
}

impl EntityKind {
    /// Tab order used by the interface.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Book,
        EntityKind::Author,
        EntityKind::Publisher,
        EntityKind::Subject,
        EntityKind::Location,
    ];

    /// Singular, capitalized name.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Book => "Book",
            EntityKind::Author => "Author",
            EntityKind::Publisher => "Publisher",
            EntityKind::Subject => "Subject",
            EntityKind::Location => "Location",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Book => "Books",
            EntityKind::Author => "Authors",
            EntityKind::Publisher => "Publishers",
            EntityKind::Subject => "Subjects",
            EntityKind::Location => "Locations",
        }
    }

    /// Position of this entity in [`EntityKind::ALL`].
    pub fn index(self) -> usize {
        match self {
            EntityKind::Book => 0,
            EntityKind::Author => 1,
            EntityKind::Publisher => 2,
            EntityKind::Subject => 3,
            EntityKind::Location => 4,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shared behavior of every row type shown in a list screen.
pub trait Record: Clone + fmt::Display {
    const KIND: EntityKind;

    /// Primary key from the database.
    fn id(&self) -> i64;

    /// One-line description used by the list screens.
    fn detail(&self) -> String;

    /// Case-insensitive containment test against an already lowercased needle.
    fn matches(&self, needle: &str) -> bool {
        self.detail().to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub nationality: String,
}

/// Editable author fields, used for inserts and updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorInput {
    pub name: String,
    pub nationality: String,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Record for Author {
    const KIND: EntityKind = EntityKind::Author;

    fn id(&self) -> i64 {
        self.id
    }

    fn detail(&self) -> String {
        format!("{} ({})", self.name, self.nationality)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publisher {
    pub id: i64,
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherInput {
    pub name: String,
    pub city: String,
}

impl fmt::Display for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Record for Publisher {
    const KIND: EntityKind = EntityKind::Publisher;

    fn id(&self) -> i64 {
        self.id
    }

    fn detail(&self) -> String {
        format!("{} ({})", self.name, self.city)
    }
}

/// A subject (theme) books are filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectInput {
    pub name: String,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Record for Subject {
    const KIND: EntityKind = EntityKind::Subject;

    fn id(&self) -> i64 {
        self.id
    }

    fn detail(&self) -> String {
        self.name.clone()
    }
}

/// Physical shelf position. Both parts are free text because libraries label
/// sectors and shelves with letters as often as with numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: i64,
    pub sector: String,
    pub shelf: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInput {
    pub sector: String,
    pub shelf: String,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.sector, self.shelf)
    }
}

impl Record for Location {
    const KIND: EntityKind = EntityKind::Location;

    fn id(&self) -> i64 {
        self.id
    }

    fn detail(&self) -> String {
        format!("Sector {} / Shelf {}", self.sector, self.shelf)
    }
}

/// A catalogued book. Reads always join the referenced rows, so the nested
/// structs are complete rather than bare ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
    pub isbn: String,
    pub author: Author,
    pub subject: Subject,
    pub publisher: Publisher,
    pub location: Location,
}

/// Editable book fields. References are plain ids; the database enforces
/// that they exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInput {
    pub title: String,
    pub publication_year: i32,
    pub isbn: String,
    pub author_id: i64,
    pub subject_id: i64,
    pub publisher_id: i64,
    pub location_id: i64,
}

impl Book {
    /// Author, year and ISBN on one line for list cards.
    pub fn byline(&self) -> String {
        format!(
            "{}  •  {}  •  ISBN {}",
            self.author.name, self.publication_year, self.isbn
        )
    }

    /// Subject, publisher and shelf position on one line for list cards.
    pub fn shelving(&self) -> String {
        format!(
            "{}  •  {}, {}  •  {}",
            self.subject.name, self.publisher.name, self.publisher.city, self.location
        )
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

impl Record for Book {
    const KIND: EntityKind = EntityKind::Book;

    fn id(&self) -> i64 {
        self.id
    }

    fn detail(&self) -> String {
        format!("{} - {}", self.title, self.author.name)
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.isbn.to_lowercase().contains(needle)
            || self.author.name.to_lowercase().contains(needle)
            || self.subject.name.to_lowercase().contains(needle)
            || self.publisher.name.to_lowercase().contains(needle)
    }
}
