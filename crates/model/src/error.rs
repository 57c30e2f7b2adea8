//! Error types for model validation

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid line id: {0}")]
    InvalidLineId(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
