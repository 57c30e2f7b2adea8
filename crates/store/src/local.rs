//! Local record store abstraction.
//!
//! This module defines the `LocalStore` trait: two key-addressed record sets
//! (catalog products and cart lines) supporting clear-all, bulk-insert and
//! read-all. The store has no policy and no authority of its own; callers
//! decide what to write and when.

use crate::{Result, StoreError};
use model::{CartLine, Product};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The record sets held by a local store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSet {
    /// Catalog products
    Products,
    /// Cart lines
    Cart,
}

impl RecordSet {
    /// All record sets
    pub const ALL: [RecordSet; 2] = [RecordSet::Products, RecordSet::Cart];

    /// Stable name used for keys and file names
    pub fn name(&self) -> &'static str {
        match self {
            RecordSet::Products => "products",
            RecordSet::Cart => "cart",
        }
    }
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for local storage backends
///
/// Records are raw JSON values so backends stay independent of the model
/// types; the provided methods add the typed product and cart views.
///
/// # Thread Safety
///
/// Methods take `&self`; implementations use interior locking so a store can
/// be shared behind an `Arc` between the cart writer and the catalog.
pub trait LocalStore: Send + Sync {
    /// Remove every record from a set
    fn clear(&self, set: RecordSet) -> Result<()>;

    /// Append records to a set
    fn bulk_insert(&self, set: RecordSet, records: Vec<Value>) -> Result<()>;

    /// Read every record of a set, in insertion order
    fn read_all(&self, set: RecordSet) -> Result<Vec<Value>>;

    /// Swap the whole content of a set for `records`
    ///
    /// The default clears then inserts. Backends that can swap the set in a
    /// single step override this so a failed write keeps the previous copy.
    fn replace(&self, set: RecordSet, records: Vec<Value>) -> Result<()> {
        self.clear(set)?;
        if records.is_empty() {
            return Ok(());
        }
        self.bulk_insert(set, records)
    }

    /// Replace the cached catalog
    fn save_products(&self, products: &[Product]) -> Result<()> {
        self.replace(RecordSet::Products, to_records(products)?)
    }

    /// Read the cached catalog
    fn load_products(&self) -> Result<Vec<Product>> {
        from_records(RecordSet::Products, self.read_all(RecordSet::Products)?)
    }

    /// Replace the mirrored cart
    fn save_cart(&self, lines: &[CartLine]) -> Result<()> {
        self.replace(RecordSet::Cart, to_records(lines)?)
    }

    /// Read the mirrored cart
    fn load_cart(&self) -> Result<Vec<CartLine>> {
        from_records(RecordSet::Cart, self.read_all(RecordSet::Cart)?)
    }

    /// Check whether a non-empty cart is waiting to be synchronized
    fn has_pending_cart(&self) -> Result<bool> {
        Ok(!self.read_all(RecordSet::Cart)?.is_empty())
    }
}

fn to_records<T: Serialize>(items: &[T]) -> Result<Vec<Value>> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(StoreError::from))
        .collect()
}

fn from_records<T: DeserializeOwned>(set: RecordSet, records: Vec<Value>) -> Result<Vec<T>> {
    records
        .into_iter()
        .map(|record| {
            serde_json::from_value(record).map_err(|e| StoreError::InvalidRecord {
                set: set.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use model::Price;

    fn product(id: u64) -> Product {
        Product::new(id, format!("Product {}", id), Price::from_units(id), "misc")
    }

    #[test]
    fn test_record_set_names() {
        assert_eq!(RecordSet::Products.name(), "products");
        assert_eq!(RecordSet::Cart.to_string(), "cart");
    }

    #[test]
    fn test_save_products_replaces_previous() {
        let store = MemoryStore::new();
        store.save_products(&[product(1), product(2)]).unwrap();
        store.save_products(&[product(3)]).unwrap();

        let loaded = store.load_products().unwrap();
        assert_eq!(loaded, vec![product(3)]);
    }

    #[test]
    fn test_save_empty_cart_clears() {
        let store = MemoryStore::new();
        let line = CartLine::new(1, "Pen", Price::from_units(2), 3);
        store.save_cart(&[line.clone()]).unwrap();
        assert!(store.has_pending_cart().unwrap());
        assert_eq!(store.load_cart().unwrap(), vec![line]);

        store.save_cart(&[]).unwrap();
        assert!(!store.has_pending_cart().unwrap());
        assert!(store.load_cart().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_record_is_reported() {
        let store = MemoryStore::new();
        store
            .bulk_insert(RecordSet::Cart, vec![serde_json::json!({"bogus": true})])
            .unwrap();

        match store.load_cart() {
            Err(StoreError::InvalidRecord { set, .. }) => assert_eq!(set, "cart"),
            other => panic!("Expected InvalidRecord, got {:?}", other),
        }
    }
}
