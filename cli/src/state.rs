//! Application state wiring

use anyhow::{Context, Result};
use cart_sync::{
    CartManager, ConnectivityMonitor, HttpProbe, HttpSyncEndpoint, Probe, SyncConfig,
    SyncOrchestrator,
};
use catalog::{CatalogService, HttpProductSource};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use store::{AppSettings, FileStore, SettingsManager};

/// Timeout for the startup reachability check
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Every component of the client, wired together
pub struct AppState {
    pub settings: AppSettings,
    pub connectivity: ConnectivityMonitor,
    pub cart: CartManager,
    pub orchestrator: SyncOrchestrator<HttpSyncEndpoint>,
    pub catalog: CatalogService<HttpProductSource>,
    /// `None` when connectivity is pinned offline
    pub probe: Option<HttpProbe>,
}

impl AppState {
    /// Load settings and local data from `data_dir` and build the services
    pub async fn open(data_dir: &Path, offline: bool) -> Result<Self> {
        tracing::info!("Data directory: {:?}", data_dir);

        let mut settings_manager = SettingsManager::new(data_dir.to_path_buf());
        let settings = settings_manager
            .load()
            .await
            .context("Failed to load settings")?
            .clone();

        let store = Arc::new(FileStore::open(data_dir).context("Failed to open local store")?);
        let cart = CartManager::open(store.clone()).await;

        let base_url = settings.endpoint.base_url.as_str();
        let timeout = Duration::from_secs(settings.endpoint.timeout_secs);

        let probe = if offline {
            None
        } else {
            Some(HttpProbe::new(base_url, PROBE_TIMEOUT)?)
        };
        let initially_online = match &probe {
            Some(probe) => probe.check().await,
            None => false,
        };
        tracing::info!(
            "Starting {}",
            if initially_online { "online" } else { "offline" }
        );
        let connectivity = ConnectivityMonitor::new(initially_online);

        let endpoint = HttpSyncEndpoint::new(base_url, timeout)?;
        let orchestrator = SyncOrchestrator::new(
            endpoint,
            cart.clone(),
            connectivity.clone(),
            SyncConfig::from(&settings.sync),
        );

        let source = HttpProductSource::new(base_url, timeout)?;
        let catalog = CatalogService::new(source, store, connectivity.clone());

        Ok(Self {
            settings,
            connectivity,
            cart,
            orchestrator,
            catalog,
            probe,
        })
    }

    /// Wait for pending cart writes before the process exits
    pub async fn shutdown(&self) {
        self.cart.flush().await;
        let persistence = self.cart.persistence();
        if persistence.failed > 0 {
            tracing::warn!(
                "{} cart writes failed; last error: {}",
                persistence.failed,
                persistence.last_error.as_deref().unwrap_or("unknown")
            );
        }
    }
}
