//! Glossa Schema Store
//!
//! Reference implementation of the `SchemaContextProvider` trait using SQLite.
//!
//! # Architecture
//!
//! - SQLite for tables, columns, glossary terms, term mappings and relationships
//! - Every row partitioned by tenant id
//! - Append-only `usage_events` table; usage counts are derived, never updated in place
//! - Join paths found by breadth-first search over declared relationships
//! - Catalogs loaded from TOML files
//!
//! # Examples
//!
//! ```no_run
//! use glossa_schema::{SchemaCatalog, SqliteSchemaStore};
//!
//! let store = SqliteSchemaStore::new(":memory:").unwrap();
//! let catalog = SchemaCatalog::from_file("catalog.toml").unwrap();
//! store.load_catalog("acme", &catalog).unwrap();
//! ```

#![warn(missing_docs)]

pub mod catalog;
pub mod join;
mod store;

use glossa_domain::SchemaError;
use thiserror::Error;

pub use catalog::{CatalogTable, CatalogTerm, Relationship, SchemaCatalog};
pub use store::SqliteSchemaStore;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Referenced record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Catalog could not be read or is inconsistent
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<StoreError> for SchemaError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(what) => SchemaError::NotFound(what),
            other => SchemaError::Backend(other.to_string()),
        }
    }
}
