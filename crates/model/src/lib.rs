//! Model - Catalog and cart value types
//!
//! This crate holds the plain data shared by every other crate in the
//! workspace: products produced by the catalog, cart lines owned by the cart
//! manager, and the pure merge rules that keep at most one line per product.
//! Nothing here performs I/O.

mod cart;
mod error;
mod line;
mod price;
mod product;

pub use cart::*;
pub use error::*;
pub use line::*;
pub use price::*;
pub use product::*;
