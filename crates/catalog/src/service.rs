//! Catalog service.
//!
//! `CatalogService` keeps the current product list in a state cell. A
//! refresh prefers the remote source and mirrors what it fetched into the
//! local store; when offline, or when the fetch fails, it falls back to the
//! cached copy so the catalog stays browsable.

use crate::query::{self, ProductPage, ProductQuery};
use crate::source::ProductSource;
use crate::{CatalogError, CatalogResult};
use cart_sync::{ConnectivityMonitor, StateCell, Subscription};
use model::{Product, ProductId};
use std::sync::Arc;
use store::LocalStore;

/// Where the current product list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    /// Freshly fetched from the product source
    Remote,
    /// Read from the local cache
    Cache,
}

/// Product catalog with an offline cache
pub struct CatalogService<S> {
    source: S,
    store: Arc<dyn LocalStore>,
    connectivity: ConnectivityMonitor,
    products: StateCell<Vec<Product>>,
}

impl<S: ProductSource> CatalogService<S> {
    pub fn new(source: S, store: Arc<dyn LocalStore>, connectivity: ConnectivityMonitor) -> Self {
        Self {
            source,
            store,
            connectivity,
            products: StateCell::new(Vec::new()),
        }
    }

    /// Reload the product list.
    ///
    /// Fails only when the remote path was unavailable and the cache could
    /// not be read either.
    pub async fn refresh(&self) -> CatalogResult<CatalogOrigin> {
        if self.connectivity.is_online() {
            match self.source.fetch_products().await {
                Ok(products) => {
                    let snapshot = products.clone();
                    let saved = self
                        .with_store(move |store| store.save_products(&snapshot))
                        .await;
                    if let Err(e) = saved {
                        tracing::warn!("Failed to cache catalog: {}", e);
                    }
                    tracing::info!("Fetched {} products", products.len());
                    self.products.set(products);
                    return Ok(CatalogOrigin::Remote);
                }
                Err(e) => tracing::warn!("Failed to fetch catalog, using cache: {}", e),
            }
        } else {
            tracing::debug!("Offline; loading catalog from cache");
        }

        let cached = self.with_store(|store| store.load_products()).await?;
        tracing::info!("Loaded {} cached products", cached.len());
        self.products.set(cached);
        Ok(CatalogOrigin::Cache)
    }

    /// Current product list
    pub fn products(&self) -> Vec<Product> {
        self.products.current()
    }

    /// Look up a product by id
    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.products
            .with(|products| products.iter().find(|p| p.id == id).cloned())
    }

    /// Filtered, sorted and paginated view of the current list
    pub fn query(&self, query: &ProductQuery) -> ProductPage {
        self.products.with(|products| query.apply(products))
    }

    /// Unique categories of the current list, in first-seen order
    pub fn categories(&self) -> Vec<String> {
        self.products.with(|products| query::categories(products))
    }

    /// Observe every reload
    pub fn subscribe(&self, callback: impl Fn(&Vec<Product>) + Send + Sync + 'static) -> Subscription {
        self.products.subscribe(callback)
    }

    /// Run store I/O on the blocking pool
    async fn with_store<T, F>(&self, f: F) -> CatalogResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn LocalStore) -> store::Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| CatalogError::Task(e.to_string()))?;
        Ok(result?)
    }
}
