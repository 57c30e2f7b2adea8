//! Cart manager.
//!
//! `CartManager` owns the authoritative in-memory cart. Every mutation is
//! applied in memory, queued for the local store, and then broadcast to
//! subscribers, in that order. Persistence runs on a single background
//! writer so writes land in mutation order; a failed write is logged and
//! counted but never rolls back the in-memory cart.

use crate::cell::{StateCell, Subscription};
use model::{Cart, CartChange, CartLine, Price, Product, ProductId};
use std::sync::Arc;
use store::LocalStore;
use tokio::sync::{mpsc, oneshot};

/// Outcome counters for background cart writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistenceStatus {
    /// Writes that reached the local store
    pub completed: u64,
    /// Writes the local store rejected
    pub failed: u64,
    /// Most recent failure, if any
    pub last_error: Option<String>,
}

enum WriteJob {
    Save(Vec<CartLine>),
    Flush(oneshot::Sender<()>),
}

struct CartInner {
    cart: StateCell<Cart>,
    writes: mpsc::UnboundedSender<WriteJob>,
    persistence: StateCell<PersistenceStatus>,
}

/// Shared handle to the cart. Clones operate on the same cart.
#[derive(Clone)]
pub struct CartManager {
    inner: Arc<CartInner>,
}

impl CartManager {
    /// Load the cart from `store` and start the background writer.
    ///
    /// A stored cart with duplicate or empty lines is normalized and written
    /// back. A store that cannot be read yields an empty cart; the failure
    /// is logged and recorded in the persistence status.
    pub async fn open(store: Arc<dyn LocalStore>) -> Self {
        let persistence = StateCell::new(PersistenceStatus::default());

        let reader = Arc::clone(&store);
        let loaded = match tokio::task::spawn_blocking(move || reader.load_cart()).await {
            Ok(Ok(lines)) => Some(lines),
            Ok(Err(e)) => {
                tracing::warn!("Failed to load stored cart, starting empty: {}", e);
                persistence.update(|status| status.last_error = Some(e.to_string()));
                None
            }
            Err(e) => {
                tracing::warn!("Cart load task failed, starting empty: {}", e);
                persistence.update(|status| status.last_error = Some(e.to_string()));
                None
            }
        };

        let (cart, repaired) = Cart::from_lines(loaded.unwrap_or_default()).normalized();

        let (writes, jobs) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, jobs, persistence.clone()));

        if repaired {
            tracing::info!("Normalized stored cart to {} lines", cart.line_count());
            // The receiver was just spawned and cannot have gone away.
            let _ = writes.send(WriteJob::Save(cart.lines().to_vec()));
        }
        tracing::debug!("Cart opened with {} lines", cart.line_count());

        Self {
            inner: Arc::new(CartInner {
                cart: StateCell::new(cart),
                writes,
                persistence,
            }),
        }
    }

    /// Add a line, merging into an existing line for the same product.
    ///
    /// A zero quantity leaves the cart as it was.
    pub fn add_to_cart(&self, line: CartLine) -> CartChange {
        self.mutate("add", move |cart| cart.merge_line(line))
    }

    /// Add `quantity` units of a catalog product
    pub fn add_product(&self, product: &Product, quantity: u32) -> CartChange {
        self.add_to_cart(CartLine::from_product(product, quantity))
    }

    /// Set a line's quantity; zero or less removes the line
    pub fn update_quantity(&self, product_id: ProductId, quantity: i64) -> CartChange {
        self.mutate("update", move |cart| cart.set_quantity(product_id, quantity))
    }

    /// Remove the line for a product
    pub fn remove_from_cart(&self, product_id: ProductId) -> CartChange {
        self.mutate("remove", move |cart| match cart.remove(product_id) {
            Some(_) => CartChange::Removed,
            None => CartChange::Unchanged,
        })
    }

    /// Remove every line
    pub fn clear_cart(&self) {
        self.mutate("clear", |cart| {
            cart.clear();
            CartChange::Removed
        });
    }

    /// Copy of the current cart
    pub fn snapshot(&self) -> Cart {
        self.inner.cart.current()
    }

    /// Copy of the current lines
    pub fn lines(&self) -> Vec<CartLine> {
        self.inner.cart.with(|cart| cart.lines().to_vec())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.cart.with(Cart::is_empty)
    }

    pub fn line_count(&self) -> usize {
        self.inner.cart.with(Cart::line_count)
    }

    /// Sum of all quantities
    pub fn item_count(&self) -> u64 {
        self.inner.cart.with(Cart::item_count)
    }

    /// Sum of all line subtotals
    pub fn total_price(&self) -> Price {
        self.inner.cart.with(Cart::total_price)
    }

    /// Observe every change to the cart
    pub fn subscribe(&self, callback: impl Fn(&Cart) + Send + Sync + 'static) -> Subscription {
        self.inner.cart.subscribe(callback)
    }

    /// Current persistence counters
    pub fn persistence(&self) -> PersistenceStatus {
        self.inner.persistence.current()
    }

    /// Observe persistence outcomes
    pub fn subscribe_persistence(
        &self,
        callback: impl Fn(&PersistenceStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.persistence.subscribe(callback)
    }

    /// Wait until every write queued so far has been attempted
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        if self.inner.writes.send(WriteJob::Flush(done)).is_ok() {
            let _ = finished.await;
        }
    }

    fn mutate(&self, action: &'static str, f: impl FnOnce(&mut Cart) -> CartChange) -> CartChange {
        let writes = &self.inner.writes;
        self.inner.cart.update(|cart| {
            let change = f(cart);
            if writes.send(WriteJob::Save(cart.lines().to_vec())).is_err() {
                tracing::error!("Cart writer stopped; {} not persisted", action);
            }
            tracing::debug!("Cart {}: {:?}, {} lines", action, change, cart.line_count());
            change
        })
    }
}

impl std::fmt::Debug for CartManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("cart", &self.inner.cart)
            .field("persistence", &self.inner.persistence)
            .finish()
    }
}

async fn run_writer(
    store: Arc<dyn LocalStore>,
    mut jobs: mpsc::UnboundedReceiver<WriteJob>,
    persistence: StateCell<PersistenceStatus>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            WriteJob::Save(lines) => {
                let writer = Arc::clone(&store);
                let result = tokio::task::spawn_blocking(move || writer.save_cart(&lines))
                    .await
                    .map_err(|e| e.to_string())
                    .and_then(|saved| saved.map_err(|e| e.to_string()));

                match result {
                    Ok(()) => persistence.update(|status| status.completed += 1),
                    Err(e) => {
                        tracing::warn!("Failed to persist cart: {}", e);
                        persistence.update(|status| {
                            status.failed += 1;
                            status.last_error = Some(e);
                        });
                    }
                }
            }
            WriteJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Cart writer stopped");
}
