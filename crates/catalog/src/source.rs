//! Remote product sources.

use crate::{CatalogError, CatalogResult};
use model::Product;
use reqwest::Client;
use std::time::Duration;

/// Somewhere the full product list can be fetched from
#[trait_variant::make(Send)]
pub trait ProductSource: Send + Sync {
    /// Fetch every product
    async fn fetch_products(&self) -> CatalogResult<Vec<Product>>;
}

/// Product source reached over HTTP (`GET {base}/products`)
#[derive(Debug, Clone)]
pub struct HttpProductSource {
    client: Client,
    products_url: String,
}

impl HttpProductSource {
    pub fn new(base_url: &str, timeout: Duration) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Fetch(e.to_string()))?;

        Ok(Self {
            client,
            products_url: format!("{}/products", base_url.trim_end_matches('/')),
        })
    }

    pub fn products_url(&self) -> &str {
        &self.products_url
    }
}

impl ProductSource for HttpProductSource {
    async fn fetch_products(&self) -> CatalogResult<Vec<Product>> {
        let response = self
            .client
            .get(&self.products_url)
            .send()
            .await
            .map_err(|e| CatalogError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}
