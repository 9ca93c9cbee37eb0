use rstest::{fixture, rstest};
use tempfile::TempDir;

use verbax::config::DatabaseConfig;
use verbax::db::{
    create_author, create_book, create_location, create_publisher, create_subject, delete_book,
    delete_subject, fetch_books, fetch_subjects, find_book, update_book, update_publisher,
};
use verbax::{
    open_catalog, AuthorInput, BookInput, CatalogError, EntityKind, LocationInput,
    PublisherInput, SubjectInput,
};

struct Catalog {
    _dir: TempDir,
    config: DatabaseConfig,
}

#[fixture]
fn catalog() -> Catalog {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig::at(dir.path().join("nested").join("catalog.sqlite"));
    Catalog { _dir: dir, config }
}

fn seed_book(config: &DatabaseConfig) -> (i64, BookInput) {
    let conn = open_catalog(config).unwrap();
    let author = create_author(
        &conn,
        &AuthorInput {
            name: "Machado de Assis".into(),
            nationality: "Brazilian".into(),
        },
    )
    .unwrap();
    let subject = create_subject(
        &conn,
        &SubjectInput {
            name: "Realism".into(),
        },
    )
    .unwrap();
    let publisher = create_publisher(
        &conn,
        &PublisherInput {
            name: "Garnier".into(),
            city: "Rio de Janeiro".into(),
        },
    )
    .unwrap();
    let location = create_location(
        &conn,
        &LocationInput {
            sector: "C".into(),
            shelf: "4".into(),
        },
    )
    .unwrap();

    let input = BookInput {
        title: "Dom Casmurro".into(),
        publication_year: 1899,
        isbn: "978-85-359-0277-1".into(),
        author_id: author.id,
        subject_id: subject.id,
        publisher_id: publisher.id,
        location_id: location.id,
    };
    let book = create_book(&conn, &input).unwrap();
    (book.id, input)
}

#[rstest]
fn rows_survive_reopening_the_file(catalog: Catalog) {
    let (id, _) = seed_book(&catalog.config);
    assert!(catalog.config.path.as_ref().unwrap().exists());

    let conn = open_catalog(&catalog.config).unwrap();
    let book = find_book(&conn, id).unwrap().unwrap();
    assert_eq!(book.title, "Dom Casmurro");
    assert_eq!(book.author.nationality, "Brazilian");
    assert_eq!(book.location.to_string(), "C - 4");
}

#[rstest]
fn update_and_delete_round_trip_through_the_file(catalog: Catalog) {
    let (id, mut input) = seed_book(&catalog.config);
    let conn = open_catalog(&catalog.config).unwrap();

    input.title = "Memórias Póstumas de Brás Cubas".into();
    input.publication_year = 1881;
    update_book(&conn, id, &input).unwrap();
    update_publisher(
        &conn,
        input.publisher_id,
        &PublisherInput {
            name: "Typographia Nacional".into(),
            city: "Rio de Janeiro".into(),
        },
    )
    .unwrap();

    let books = fetch_books(&conn).unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].publication_year, 1881);
    assert_eq!(books[0].publisher.name, "Typographia Nacional");

    delete_book(&conn, id).unwrap();
    let err = delete_book(&conn, id).unwrap_err();
    assert_eq!(
        err.downcast_ref::<CatalogError>(),
        Some(&CatalogError::NotFound {
            entity: EntityKind::Book,
            id,
        })
    );
}

#[rstest]
fn foreign_keys_are_enforced_on_reopened_connections(catalog: Catalog) {
    let (_, input) = seed_book(&catalog.config);
    let conn = open_catalog(&catalog.config).unwrap();

    let err = delete_subject(&conn, input.subject_id).unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to delete subject",
        "context should wrap the constraint error"
    );
    assert!(matches!(
        err.downcast_ref::<CatalogError>(),
        Some(CatalogError::InUse { books: 1, .. })
    ));
    assert_eq!(fetch_subjects(&conn).unwrap().len(), 1);

    let mut orphan = input.clone();
    orphan.location_id = 404;
    let err = create_book(&conn, &orphan).unwrap_err();
    assert_eq!(
        err.downcast_ref::<CatalogError>(),
        Some(&CatalogError::MissingReference)
    );
}
