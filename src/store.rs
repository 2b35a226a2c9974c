//! Stores consulted during translation.
//!
//! The [`TableCatalog`] maps table names to PipeQL expressions and is
//! immutable after construction; the [`ViewStore`] persists named query
//! fragments on disk. Both are bundled into [`Stores`] and injected into
//! the statement router, never reached through global state.

mod error;
mod tables;
mod views;

pub use error::StoreError;
pub use tables::TableCatalog;
pub use views::{ViewOptions, ViewStore};

/// The catalog and view store a translation runs against.
#[derive(Debug, Default)]
pub struct Stores {
    tables: TableCatalog,
    views: Option<ViewStore>,
}

impl Stores {
    /// Bundles a table catalog with an optional view store.
    pub fn new(tables: TableCatalog, views: Option<ViewStore>) -> Self {
        Self { tables, views }
    }

    /// The table catalog.
    pub fn tables(&self) -> &TableCatalog {
        &self.tables
    }

    /// The view store, when a views directory is configured.
    pub fn views(&self) -> Option<&ViewStore> {
        self.views.as_ref()
    }
}
