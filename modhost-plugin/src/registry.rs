//! Module registry

use crate::traits::RemoteModule;
use indexmap::IndexMap;
use modhost_config::ModuleHostConfig;
use std::sync::Arc;

/// Loaded modules and their host configurations, keyed by module id.
///
/// Written only while modules load; the orchestrator reads it through an
/// `Arc` once loading is done.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: IndexMap<String, Arc<RemoteModule>>,
    configs: IndexMap<String, Arc<ModuleHostConfig>>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under its own id, replacing any previous entry
    pub fn register(&mut self, module: RemoteModule, config: ModuleHostConfig) -> Arc<RemoteModule> {
        let id = module.id().to_string();
        let module = Arc::new(module);

        if self.modules.insert(id.clone(), Arc::clone(&module)).is_some() {
            tracing::debug!(module = %id, "Replacing previously registered module");
        }
        self.configs.insert(id, Arc::new(config));

        module
    }

    /// Get a module by id
    pub fn get(&self, id: &str) -> Option<Arc<RemoteModule>> {
        self.modules.get(id).cloned()
    }

    /// Host configuration on file for a module id
    pub fn config(&self, id: &str) -> Option<Arc<ModuleHostConfig>> {
        self.configs.get(id).cloned()
    }

    /// All modules, in first registration order
    pub fn modules(&self) -> impl Iterator<Item = &Arc<RemoteModule>> {
        self.modules.values()
    }

    /// Registered module ids
    pub fn ids(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
