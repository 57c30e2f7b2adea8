//! Cart Sync - Offline-tolerant cart and order synchronization
//!
//! This crate owns the live cart and pushes it to a remote order endpoint
//! when connectivity allows:
//!
//! - [`cell`]: observable single-value state cells used for every broadcast
//! - [`connectivity`]: edge-triggered online/offline tracking
//! - [`cart`]: the cart manager with ordered background persistence
//! - [`endpoint`] and [`http`]: the remote endpoint seam and its HTTP client
//! - [`orchestrator`]: the single-flight sync state machine with bounded retry
//!
//! # Example
//!
//! ```no_run
//! use cart_sync::{CartManager, ConnectivityMonitor, HttpSyncEndpoint, SyncConfig, SyncOrchestrator};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use store::MemoryStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cart = CartManager::open(Arc::new(MemoryStore::new())).await;
//! let endpoint = HttpSyncEndpoint::new("http://localhost:3000", Duration::from_secs(30))?;
//! let orchestrator = SyncOrchestrator::new(
//!     endpoint,
//!     cart,
//!     ConnectivityMonitor::new(true),
//!     SyncConfig::default(),
//! );
//! let _auto = orchestrator.start_auto_sync()?;
//! orchestrator.sync().await?;
//! # Ok(())
//! # }
//! ```

pub mod cart;
pub mod cell;
pub mod connectivity;
pub mod endpoint;
mod error;
pub mod http;
pub mod orchestrator;
pub mod policy;
pub mod state;

pub use cart::{CartManager, PersistenceStatus};
pub use cell::{StateCell, Subscription};
pub use connectivity::{ConnectivityMonitor, Probe};
pub use endpoint::{OrderId, SubmitReceipt, SyncEndpoint};
pub use error::*;
pub use http::{HttpProbe, HttpSyncEndpoint};
pub use orchestrator::{SyncOrchestrator, SyncOutcome};
pub use policy::{Backoff, RetryPolicy, SyncConfig};
pub use state::{SyncState, SyncStatus};
