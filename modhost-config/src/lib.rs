//! Modhost Configuration Discovery
//!
//! This crate finds the modules a host should load. Discovery is two-level:
//! a manifest lists candidate module names, then every name resolves to its
//! own `module-<name>.json` host configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use modhost_config::{source_from_settings, ModuleConfigLoader};
//!
//! let settings = modhost_core::config::SourceSettings::default();
//! let loader = ModuleConfigLoader::new(source_from_settings(&settings)?, settings);
//! let configs = loader.load_module_configs().await;
//! ```

mod discovery;
mod manifest;
pub mod source;

pub use discovery::{DiscoveryError, ModuleConfigLoader};
pub use manifest::{ModuleHostConfig, ModulesManifest, RemoteEntry};
pub use source::{source_from_settings, ConfigSource, DirSource, HttpSource, MemorySource, SourceError};
