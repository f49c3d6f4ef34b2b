//! Module configuration discovery

use crate::manifest::{ModuleHostConfig, ModulesManifest, RemoteEntry};
use crate::source::{ConfigSource, SourceError};
use indexmap::IndexMap;
use modhost_core::config::SourceSettings;
use std::sync::Arc;
use thiserror::Error;

/// Discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} has an empty module id")]
    EmptyId { path: String },
}

/// Loads the host configuration of every enabled module
pub struct ModuleConfigLoader {
    source: Arc<dyn ConfigSource>,
    settings: SourceSettings,
}

impl ModuleConfigLoader {
    /// Create a loader reading from `source` with the given layout
    pub fn new(source: Arc<dyn ConfigSource>, settings: SourceSettings) -> Self {
        Self { source, settings }
    }

    /// Discover the configurations of all enabled modules.
    ///
    /// Never fails: an unreachable manifest yields no modules, and a module
    /// whose configuration cannot be fetched or parsed is skipped on its own.
    /// Survivors are returned in manifest order.
    pub async fn load_module_configs(&self) -> Vec<ModuleHostConfig> {
        let manifest = match self.fetch_manifest().await {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::error!("Failed to load module configurations: {}", e);
                return Vec::new();
            }
        };

        let mut configs = Vec::with_capacity(manifest.modules.len());

        for name in &manifest.modules {
            match self.fetch_module_config(name).await {
                Ok(config) if config.enabled => {
                    tracing::info!(module = %config.id, "Loaded config for module");
                    configs.push(config);
                }
                Ok(config) => {
                    tracing::info!(module = %config.id, "Module is disabled, skipping");
                }
                Err(DiscoveryError::Fetch { path, source: SourceError::NotFound(_) }) => {
                    tracing::warn!(module = %name, "Config file not found: {}", path);
                }
                Err(e) => {
                    tracing::error!(module = %name, "Error loading config: {}", e);
                }
            }
        }

        configs
    }

    /// Fetch and parse the modules manifest
    pub async fn fetch_manifest(&self) -> Result<ModulesManifest, DiscoveryError> {
        self.fetch_json(&self.settings.modules_manifest).await
    }

    /// Fetch and parse the configuration of a single module
    pub async fn fetch_module_config(&self, name: &str) -> Result<ModuleHostConfig, DiscoveryError> {
        let path = self.settings.module_config_path(name);
        let config: ModuleHostConfig = self.fetch_json(&path).await?;

        if config.id.trim().is_empty() {
            return Err(DiscoveryError::EmptyId {
                path: self.source.describe(&path),
            });
        }

        Ok(config)
    }

    /// Fetch the remotes manifest, preserving declaration order
    pub async fn load_remotes(&self) -> Result<Vec<RemoteEntry>, DiscoveryError> {
        let remotes: IndexMap<String, String> = self.fetch_json(&self.settings.remotes_manifest).await?;

        Ok(remotes
            .into_iter()
            .map(|(name, entry)| RemoteEntry { name, entry })
            .collect())
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, DiscoveryError> {
        let body = self.source.fetch(path).await.map_err(|source| DiscoveryError::Fetch {
            path: self.source.describe(path),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| DiscoveryError::Parse {
            path: self.source.describe(path),
            source,
        })
    }
}
