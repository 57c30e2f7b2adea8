//! Catalog products

use crate::Price;
use serde::{Deserialize, Serialize};

/// Identifier of a catalog product
pub type ProductId = u64;

/// A product as produced by the catalog.
///
/// Read-only from the cart's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub category: String,
    #[serde(default)]
    pub image: String,
}

impl Product {
    /// Create a new product
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Price,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            category: category.into(),
            image: String::new(),
        }
    }

    /// Set the image URL
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }
}
