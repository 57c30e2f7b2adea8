//! Store - Local persistence for the cart client
//!
//! This crate handles the key-addressed local record store that mirrors the
//! catalog and the cart, in-memory and file-backed implementations of it,
//! and application settings.

mod error;
mod file_store;
mod local;
mod memory_store;
mod settings;

pub use error::*;
pub use file_store::*;
pub use local::*;
pub use memory_store::*;
pub use settings::*;
