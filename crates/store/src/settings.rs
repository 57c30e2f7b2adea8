//! Application settings management
//!
//! This module provides settings persistence, loading, and updating
//! for the cart client.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application settings container
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Remote endpoint settings
    pub endpoint: EndpointSettings,
    /// Synchronization policy settings
    pub sync: SyncSettings,
    /// Connectivity detection settings
    pub connectivity: ConnectivitySettings,
    /// Catalog display settings
    pub catalog: CatalogSettings,
}

/// Remote endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointSettings {
    /// Base URL of the order and catalog API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Delay growth between retries
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// Synchronization policy settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncSettings {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Delay before each retry in milliseconds
    pub retry_delay_ms: u64,
    /// How the retry delay grows
    pub backoff: BackoffKind,
    /// Upper bound for exponential delays in milliseconds
    pub max_retry_delay_ms: u64,
    /// Pause after reconnecting before an automatic sync, in milliseconds
    pub settle_delay_ms: u64,
    /// Whether to sync automatically when connectivity returns
    pub auto_sync: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2000,
            backoff: BackoffKind::Fixed,
            max_retry_delay_ms: 30_000,
            settle_delay_ms: 2000,
            auto_sync: true,
        }
    }
}

/// Connectivity detection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectivitySettings {
    /// How often to probe the endpoint, in milliseconds
    pub probe_interval_ms: u64,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            probe_interval_ms: 5000,
        }
    }
}

/// Catalog display settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogSettings {
    /// Products per page
    pub page_size: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self { page_size: 6 }
    }
}

/// Settings manager for loading, saving, and updating application settings
pub struct SettingsManager {
    /// Path to the settings file
    settings_path: PathBuf,
    /// Current settings (cached)
    current: AppSettings,
}

impl SettingsManager {
    /// Create a new settings manager with the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        let settings_path = data_dir.join("settings.json");
        Self {
            settings_path,
            current: AppSettings::default(),
        }
    }

    /// Get the path to the settings file
    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    /// Load settings from disk, or return defaults if file doesn't exist
    pub async fn load(&mut self) -> Result<&AppSettings> {
        if self.settings_path.exists() {
            let content = tokio::fs::read_to_string(&self.settings_path).await?;
            match serde_json::from_str::<AppSettings>(&content) {
                Ok(settings) => {
                    self.current = settings;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse settings file, using defaults: {}",
                        e
                    );
                    self.current = AppSettings::default();
                }
            }
        } else {
            self.current = AppSettings::default();
        }
        Ok(&self.current)
    }

    /// Save current settings to disk
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&self.current)?;
        tokio::fs::write(&self.settings_path, content).await?;
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &AppSettings {
        &self.current
    }

    /// Update settings and save to disk
    pub async fn update(&mut self, settings: AppSettings) -> Result<()> {
        self.current = settings;
        self.save().await
    }

    /// Reset settings to defaults and save
    pub async fn reset(&mut self) -> Result<&AppSettings> {
        self.current = AppSettings::default();
        self.save().await?;
        Ok(&self.current)
    }
}
