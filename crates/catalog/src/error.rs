//! Error types for the catalog crate.

use store::StoreError;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while loading the catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The product source could not be reached.
    #[error("Failed to fetch products: {0}")]
    Fetch(String),

    /// The product source answered with a non-success status.
    #[error("Product source returned status {0}")]
    Status(u16),

    /// The product source answered with something other than a product list.
    #[error("Invalid product data: {0}")]
    Decode(String),

    /// The local cache could not be read or written.
    #[error("Catalog cache error: {0}")]
    Store(#[from] StoreError),

    /// A blocking cache task did not complete.
    #[error("Catalog cache task failed: {0}")]
    Task(String),
}
