//! Catalog - Product listing for the cart client
//!
//! This crate fetches the product catalog, mirrors it into the local store
//! so it stays browsable offline, and provides the filtered, sorted and
//! paginated views the product list needs.

mod error;
mod query;
mod service;
mod source;

pub use error::*;
pub use query::*;
pub use service::*;
pub use source::*;
