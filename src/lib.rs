//! Core library surface for the Verbax library catalog.
//!
//! The binary only wires configuration, logging and the terminal loop
//! together; everything it touches is re-exported here so integration tests
//! can drive the same persistence layer.
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod ui;

/// Opening and preparing the SQLite catalog.
pub use db::{ensure_schema, open_catalog, open_in_memory};

pub use error::CatalogError;

/// Row types plus the inputs accepted by the insert and update functions.
pub use models::{
    Author, AuthorInput, Book, BookInput, EntityKind, Location, LocationInput, Publisher,
    PublisherInput, Record, Subject, SubjectInput,
};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
