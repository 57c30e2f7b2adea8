//! Remote order endpoint abstraction.

use crate::EndpointError;
use model::CartLine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the endpoint assigns to an accepted order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Acknowledgement of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// `None` when the endpoint accepted the order without naming it
    pub order_id: Option<OrderId>,
}

impl SubmitReceipt {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(OrderId::new(order_id)),
        }
    }
}

/// Destination for cart submissions.
///
/// Each call is one attempt; retry policy belongs to the orchestrator.
/// Implementations must be safe to call concurrently, though the
/// orchestrator only keeps one submission in flight.
#[trait_variant::make(Send)]
pub trait SyncEndpoint: Send + Sync {
    /// Submit the full set of cart lines as one order.
    async fn submit(&self, lines: &[CartLine]) -> Result<SubmitReceipt, EndpointError>;
}
