//! Cart value type and merge rules
//!
//! A cart holds at most one line per product. Inserting a line for a product
//! that is already present adds to its quantity instead of appending, and a
//! quantity that would fall to zero or below removes the line.

use crate::{CartLine, Price, ProductId};
use serde::{Deserialize, Serialize};

/// What a cart mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended
    Added,
    /// An existing line absorbed the quantity; holds the new quantity
    Merged(u32),
    /// A line's quantity was set exactly
    Updated,
    /// A line was removed
    Removed,
    /// Nothing matched
    Unchanged,
}

/// An ordered collection of cart lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap lines as-is, without merging duplicates
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// All lines in display order
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Take the lines out of the cart
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Find the line for a product
    pub fn get(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Check if the cart has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total number of units across all lines
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| line.quantity as u64).sum()
    }

    /// Sum of `price x quantity` over all lines
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Insert a line, merging it into an existing line for the same product.
    ///
    /// Lines with a zero quantity are ignored.
    pub fn merge_line(&mut self, line: CartLine) -> CartChange {
        if line.quantity == 0 {
            return CartChange::Unchanged;
        }

        match self
            .lines
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                CartChange::Merged(existing.quantity)
            }
            None => {
                self.lines.push(line);
                CartChange::Added
            }
        }
    }

    /// Set a line's quantity exactly; zero or below removes the line
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> CartChange {
        if quantity <= 0 {
            return match self.remove(product_id) {
                Some(_) => CartChange::Removed,
                None => CartChange::Unchanged,
            };
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        match self.lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                CartChange::Updated
            }
            None => CartChange::Unchanged,
        }
    }

    /// Remove the line for a product
    pub fn remove(&mut self, product_id: ProductId) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|line| line.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Remove every line
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Rebuild the cart through the merge rules.
    ///
    /// Duplicate product lines collapse into the first one and zero-quantity
    /// lines are dropped. Returns the normalized cart and whether anything
    /// changed.
    pub fn normalized(self) -> (Cart, bool) {
        let original_len = self.lines.len();
        let mut normalized = Cart::new();
        let mut merged_any = false;

        for line in self.lines {
            if let CartChange::Merged(_) = normalized.merge_line(line) {
                merged_any = true;
            }
        }

        let changed = merged_any || normalized.lines.len() != original_len;
        (normalized, changed)
    }
}
