//! Cart lines and their identifiers

use crate::{ModelError, Price, Product, ProductId, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a cart line.
/// Uses UUID v4 so ids stay unique across restarts and devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineId(Uuid);

impl LineId {
    /// Create a new random LineId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parse a LineId from its string representation
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ModelError::InvalidLineId(e.to_string()))
    }
}

impl Default for LineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One product entry in a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: LineId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub image: String,
}

impl CartLine {
    /// Create a line for `quantity` units of a product
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: LineId::new(),
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            quantity,
            image: product.image.clone(),
        }
    }

    /// Create a line from raw parts
    pub fn new(product_id: ProductId, name: impl Into<String>, price: Price, quantity: u32) -> Self {
        Self {
            id: LineId::new(),
            product_id,
            name: name.into(),
            price,
            quantity,
            image: String::new(),
        }
    }

    /// Price of this line (`price x quantity`)
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}
