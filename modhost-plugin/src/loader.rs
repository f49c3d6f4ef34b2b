//! Module loading
//!
//! Remotes are resolved through a [`RemoteLoader`]. The host ships a
//! [`RemoteCatalog`]: remotes are declared at runtime from `remotes.json`,
//! and the modules they expose are provided by code compiled into the host.

use crate::lifecycle::panic_message;
use crate::registry::ModuleRegistry;
use crate::traits::RemoteModule;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use modhost_config::{ModuleConfigLoader, ModuleHostConfig, RemoteEntry};
use modhost_core::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;

/// What a remote exposes at an entry path
#[derive(Debug, Default)]
pub struct ModuleContainer {
    /// The default export
    pub default: Option<RemoteModule>,
}

impl ModuleContainer {
    pub fn new(module: RemoteModule) -> Self {
        Self {
            default: Some(module),
        }
    }

    /// A container without a default export
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Dynamic loading capability
#[async_trait]
pub trait RemoteLoader: Send + Sync {
    /// Load the container `remote_name` exposes at `entry_path`
    async fn load_remote(&self, remote_name: &str, entry_path: &str) -> anyhow::Result<ModuleContainer>;
}

/// Key a remote's entry is loaded under: `catalog` + `./lifecycle` -> `catalog/lifecycle`
pub fn remote_key(remote_name: &str, entry_path: &str) -> String {
    format!("{}/{}", remote_name, exposed_path(entry_path))
}

fn exposed_path(entry_path: &str) -> &str {
    entry_path.trim_start_matches("./").trim_start_matches('/')
}

/// Loader errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("module {0} does not export a default module")]
    NoDefaultExport(String),

    #[error("module {0} is missing required fields (id, name)")]
    MissingFields(String),

    #[error("failed to load {key}: {source}")]
    Remote {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("loading {key} panicked: {message}")]
    Panicked { key: String, message: String },
}

/// Loads modules and registers them
pub struct ModuleLoader {
    remotes: Arc<dyn RemoteLoader>,
}

impl ModuleLoader {
    pub fn new(remotes: Arc<dyn RemoteLoader>) -> Self {
        Self { remotes }
    }

    /// Load a module and add it to `registry`.
    ///
    /// Returns `None` when the module could not be loaded or is invalid; the
    /// failure is logged and the registry is left untouched. A module that
    /// reports a different id than its configuration is still registered,
    /// under its own id.
    pub async fn load_and_register(
        &self,
        registry: &mut ModuleRegistry,
        remote_name: &str,
        entry_path: &str,
        host_config: ModuleHostConfig,
    ) -> Option<Arc<RemoteModule>> {
        let key = remote_key(remote_name, entry_path);
        tracing::info!("Loading module: {}", key);

        let module = match self.load(remote_name, entry_path).await {
            Ok(module) => module,
            Err(e) => {
                tracing::error!("Failed to load module {}: {}", key, e);
                return None;
            }
        };

        if module.id() != host_config.id {
            tracing::warn!(
                "Module ID mismatch: expected \"{}\", got \"{}\"",
                host_config.id,
                module.id()
            );
        }

        let module = registry.register(module, host_config);
        tracing::info!(module = %module.id(), "Registered module: {} ({})", module.id(), module.name());
        Some(module)
    }

    /// Load and validate the module `remote_name` exposes at `entry_path`.
    ///
    /// A panic in the loading capability is caught and reported like any
    /// other load failure.
    pub async fn load(&self, remote_name: &str, entry_path: &str) -> std::result::Result<RemoteModule, LoadError> {
        let key = remote_key(remote_name, entry_path);
        let loading = AssertUnwindSafe(self.remotes.load_remote(remote_name, entry_path)).catch_unwind();

        let container = match loading.await {
            Ok(Ok(container)) => container,
            Ok(Err(source)) => return Err(LoadError::Remote { key, source }),
            Err(panic) => {
                return Err(LoadError::Panicked {
                    key,
                    message: panic_message(panic.as_ref()),
                });
            }
        };

        let module = container
            .default
            .ok_or_else(|| LoadError::NoDefaultExport(key.clone()))?;

        if module.id().trim().is_empty() || module.name().trim().is_empty() {
            return Err(LoadError::MissingFields(key));
        }

        Ok(module)
    }
}

type Provider = Arc<dyn Fn(RemoteEntry) -> BoxFuture<'static, anyhow::Result<ModuleContainer>> + Send + Sync>;

/// Remotes declared at runtime, backed by providers compiled into the host
#[derive(Default)]
pub struct RemoteCatalog {
    remotes: RwLock<IndexMap<String, RemoteEntry>>,
    providers: HashMap<(String, String), Provider>,
}

impl RemoteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide the container a remote exposes at `entry_path`
    pub fn provide<F, Fut>(&mut self, remote_name: &str, entry_path: &str, provider: F) -> &mut Self
    where
        F: Fn(RemoteEntry) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ModuleContainer>> + Send + 'static,
    {
        let provider = Arc::new(provider);
        let call: Provider = Arc::new(move |entry| {
            let provider = Arc::clone(&provider);
            Box::pin(async move { provider(entry).await })
        });
        self.providers
            .insert((remote_name.to_string(), exposed_path(entry_path).to_string()), call);
        self
    }

    /// Declare remotes; an already declared name gets its new entry
    pub fn register_remotes(&self, entries: impl IntoIterator<Item = RemoteEntry>) {
        let mut remotes = self.remotes.write();
        for entry in entries {
            tracing::debug!("Registering remote: {} -> {}", entry.name, entry.entry);
            remotes.insert(entry.name.clone(), entry);
        }
    }

    /// Declare every remote listed in the remotes manifest
    pub async fn register_from(&self, configs: &ModuleConfigLoader) -> Result<usize> {
        let entries = configs
            .load_remotes()
            .await
            .map_err(|e| Error::Remote(e.to_string()))?;

        let count = entries.len();
        self.register_remotes(entries);
        tracing::info!("Registered {} remote(s)", count);
        Ok(count)
    }

    /// Declared remotes, in declaration order
    pub fn remotes(&self) -> Vec<RemoteEntry> {
        self.remotes.read().values().cloned().collect()
    }
}

#[async_trait]
impl RemoteLoader for RemoteCatalog {
    async fn load_remote(&self, remote_name: &str, entry_path: &str) -> anyhow::Result<ModuleContainer> {
        let entry = self
            .remotes
            .read()
            .get(remote_name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("remote {} is not registered", remote_name))?;

        let provider = self
            .providers
            .get(&(remote_name.to_string(), exposed_path(entry_path).to_string()))
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!("remote {} does not expose {}", remote_name, remote_key(remote_name, entry_path))
            })?;

        provider(entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modhost_config::MemorySource;
    use modhost_core::config::SourceSettings;
    use serde_json::json;

    fn entry(name: &str) -> RemoteEntry {
        RemoteEntry {
            name: name.to_string(),
            entry: format!("http://cdn.local/{}/remoteEntry.js", name),
        }
    }

    fn catalog() -> RemoteCatalog {
        let mut catalog = RemoteCatalog::new();
        catalog
            .provide("catalog", "./lifecycle", |_| async {
                Ok(ModuleContainer::new(RemoteModule::builder("catalog", "Catalog").build()))
            })
            .provide("renamed", "./lifecycle", |_| async {
                Ok(ModuleContainer::new(RemoteModule::builder("actual-id", "Renamed").build()))
            })
            .provide("hollow", "./lifecycle", |_| async { Ok(ModuleContainer::empty()) })
            .provide("nameless", "./lifecycle", |_| async {
                Ok(ModuleContainer::new(RemoteModule::builder("nameless", "").build()))
            })
            .provide("broken", "./lifecycle", |e: RemoteEntry| async move {
                Err(anyhow::anyhow!("network error fetching {}", e.entry))
            });
        catalog.register_remotes(["catalog", "renamed", "hollow", "nameless", "broken"].map(entry));
        catalog
    }

    #[test]
    fn test_remote_key() {
        assert_eq!(remote_key("catalog", "./lifecycle"), "catalog/lifecycle");
        assert_eq!(remote_key("catalog", "lifecycle"), "catalog/lifecycle");
    }

    #[tokio::test]
    async fn test_load_and_register() {
        let loader = ModuleLoader::new(Arc::new(catalog()));
        let mut registry = ModuleRegistry::new();

        let module = loader
            .load_and_register(&mut registry, "catalog", "./lifecycle", ModuleHostConfig::new("catalog", "catalog"))
            .await;

        assert_eq!(module.map(|m| m.name().to_string()).as_deref(), Some("Catalog"));
        assert!(registry.contains("catalog"));
        assert!(registry.config("catalog").is_some());
    }

    #[tokio::test]
    async fn test_failures_leave_registry_untouched() {
        let loader = ModuleLoader::new(Arc::new(catalog()));
        let mut registry = ModuleRegistry::new();

        for remote in ["hollow", "nameless", "broken", "unknown"] {
            let loaded = loader
                .load_and_register(&mut registry, remote, "./lifecycle", ModuleHostConfig::new(remote, remote))
                .await;
            assert!(loaded.is_none(), "{} should not load", remote);
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_load_errors() {
        let loader = ModuleLoader::new(Arc::new(catalog()));

        assert!(matches!(loader.load("hollow", "./lifecycle").await, Err(LoadError::NoDefaultExport(_))));
        assert!(matches!(loader.load("nameless", "./lifecycle").await, Err(LoadError::MissingFields(_))));

        let err = loader.load("broken", "./lifecycle").await.unwrap_err();
        assert!(err.to_string().contains("network error fetching http://cdn.local/broken/remoteEntry.js"));

        let err = loader.load("catalog", "./other").await.unwrap_err();
        assert!(err.to_string().contains("does not expose"));
    }

    #[tokio::test]
    async fn test_panicking_provider_is_a_load_error() {
        let mut catalog = RemoteCatalog::new();
        catalog.provide("fragile", "./lifecycle", |_| async {
            if true {
                panic!("remote entry blew up");
            }
            Ok(ModuleContainer::empty())
        });
        catalog.register_remotes([entry("fragile")]);
        let loader = ModuleLoader::new(Arc::new(catalog));

        match loader.load("fragile", "./lifecycle").await {
            Err(LoadError::Panicked { key, message }) => {
                assert_eq!(key, "fragile/lifecycle");
                assert_eq!(message, "remote entry blew up");
            }
            other => panic!("unexpected load result: {:?}", other.map(|m| m.id().to_string())),
        }

        let mut registry = ModuleRegistry::new();
        let loaded = loader
            .load_and_register(&mut registry, "fragile", "./lifecycle", ModuleHostConfig::new("fragile", "fragile"))
            .await;
        assert!(loaded.is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_scoped_remote_names() {
        let mut catalog = RemoteCatalog::new();
        catalog
            .provide("@org/catalog", "./lifecycle", |_| async {
                Ok(ModuleContainer::new(RemoteModule::builder("scoped", "Scoped").build()))
            })
            .provide("@org", "./catalog/lifecycle", |_| async {
                Ok(ModuleContainer::new(RemoteModule::builder("unscoped", "Unscoped").build()))
            });
        catalog.register_remotes([entry("@org/catalog")]);
        let loader = ModuleLoader::new(Arc::new(catalog));

        let module = loader.load("@org/catalog", "./lifecycle").await.unwrap();
        assert_eq!(module.id(), "scoped");
        assert_eq!(remote_key("@org/catalog", "./lifecycle"), "@org/catalog/lifecycle");

        let err = loader.load("@org", "./catalog/lifecycle").await.unwrap_err();
        assert!(err.to_string().contains("remote @org is not registered"));
    }

    #[tokio::test]
    async fn test_undeclared_remote_is_rejected() {
        let mut catalog = RemoteCatalog::new();
        catalog.provide("late", "./lifecycle", |_| async {
            Ok(ModuleContainer::new(RemoteModule::builder("late", "Late").build()))
        });

        let err = catalog.load_remote("late", "./lifecycle").await.unwrap_err();
        assert!(err.to_string().contains("not registered"));

        catalog.register_remotes([entry("late")]);
        assert!(catalog.load_remote("late", "./lifecycle").await.is_ok());
    }

    #[tokio::test]
    async fn test_id_mismatch_registers_under_own_id() {
        let loader = ModuleLoader::new(Arc::new(catalog()));
        let mut registry = ModuleRegistry::new();

        let module = loader
            .load_and_register(&mut registry, "renamed", "./lifecycle", ModuleHostConfig::new("expected-id", "renamed"))
            .await
            .unwrap();

        assert_eq!(module.id(), "actual-id");
        assert!(registry.contains("actual-id"));
        assert!(!registry.contains("expected-id"));
        assert_eq!(registry.config("actual-id").unwrap().id, "expected-id");
    }

    #[tokio::test]
    async fn test_loading_twice_keeps_one_entry() {
        let loader = ModuleLoader::new(Arc::new(catalog()));
        let mut registry = ModuleRegistry::new();

        for round in 0..2 {
            let config = ModuleHostConfig::new("catalog", "catalog").with("round", json!(round));
            loader.load_and_register(&mut registry, "catalog", "./lifecycle", config).await;
        }

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.config("catalog").unwrap().setting::<u32>("round"), Some(1));
    }

    #[tokio::test]
    async fn test_register_from_manifest() {
        let source = MemorySource::new().with_json(
            "remotes.json",
            &json!({ "catalog": "http://cdn.local/catalog/remoteEntry.js" }),
        );
        let configs = ModuleConfigLoader::new(Arc::new(source), SourceSettings::default());

        let catalog = RemoteCatalog::new();
        assert_eq!(catalog.register_from(&configs).await.unwrap(), 1);
        assert_eq!(catalog.remotes()[0].name, "catalog");

        let empty = ModuleConfigLoader::new(Arc::new(MemorySource::new()), SourceSettings::default());
        assert!(matches!(catalog.register_from(&empty).await, Err(Error::Remote(_))));
    }
}
