//! Manifest and module configuration documents

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `modules.json`: names of the modules the host may load
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ModulesManifest {
    /// Module names, in load order
    #[serde(default)]
    pub modules: Vec<String>,
}

/// Host-side configuration for a single module (`module-<name>.json`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleHostConfig {
    /// Module id the configuration belongs to
    pub id: String,

    /// Remote that exposes the module; defaults to `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_name: Option<String>,

    /// Disabled modules are never loaded
    #[serde(default)]
    pub enabled: bool,

    /// Module specific settings, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModuleHostConfig {
    /// Create an enabled configuration without extra settings
    pub fn new(id: impl Into<String>, remote_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            remote_name: Some(remote_name.into()),
            enabled: true,
            extra: Map::new(),
        }
    }

    /// Set a module specific value
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Remote that exposes this module
    pub fn remote_name(&self) -> &str {
        match self.remote_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }

    /// Raw module specific value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Module specific value decoded into `T`
    pub fn setting<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.extra
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// One remote from `remotes.json` (`{ "<name>": "<entry>" }`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Remote name modules refer to
    pub name: String,
    /// Where the remote is served from
    pub entry: String,
}
