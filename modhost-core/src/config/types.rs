//! Host settings type definitions
//!
//! These types represent the runtime settings of the Modhost process.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root settings for Modhost
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostSettings {
    /// Where module configuration is discovered
    #[serde(default)]
    pub source: SourceSettings,

    /// Lifecycle orchestration settings
    #[serde(default)]
    pub lifecycle: LifecycleSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Configuration source layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Base URL (`http://`, `https://`) or local directory
    #[serde(default = "default_location")]
    pub location: String,

    /// Path of the remotes manifest, relative to `location`
    #[serde(default = "default_remotes_manifest")]
    pub remotes_manifest: String,

    /// Path of the modules manifest, relative to `location`
    #[serde(default = "default_modules_manifest")]
    pub modules_manifest: String,

    /// Directory holding `module-<name>.json` files, relative to `location`
    #[serde(default = "default_module_config_dir")]
    pub module_config_dir: String,
}

impl SourceSettings {
    /// Whether `location` points at an HTTP server
    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }

    /// Relative path of the configuration file for `module`
    pub fn module_config_path(&self, module: &str) -> String {
        let dir = self.module_config_dir.trim_end_matches('/');
        if dir.is_empty() {
            format!("module-{}.json", module)
        } else {
            format!("{}/module-{}.json", dir, module)
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            location: default_location(),
            remotes_manifest: default_remotes_manifest(),
            modules_manifest: default_modules_manifest(),
            module_config_dir: default_module_config_dir(),
        }
    }
}

fn default_location() -> String {
    ".".to_string()
}

fn default_remotes_manifest() -> String {
    "remotes.json".to_string()
}

fn default_modules_manifest() -> String {
    "config/modules.json".to_string()
}

fn default_module_config_dir() -> String {
    "config".to_string()
}

/// Lifecycle orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSettings {
    /// Entry exposed by every remote that holds its lifecycle module
    #[serde(default = "default_entry_path")]
    pub entry_path: String,

    /// Upper bound for a single hook invocation, in milliseconds.
    /// Unset means hooks may run indefinitely.
    #[serde(default)]
    pub hook_timeout_ms: Option<u64>,
}

impl LifecycleSettings {
    /// Hook timeout as a `Duration`
    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            entry_path: default_entry_path(),
            hook_timeout_ms: None,
        }
    }
}

fn default_entry_path() -> String {
    "./lifecycle".to_string()
}

/// Global logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_config_path() {
        let mut source = SourceSettings::default();
        assert_eq!(source.module_config_path("a"), "config/module-a.json");

        source.module_config_dir = "".to_string();
        assert_eq!(source.module_config_path("a"), "module-a.json");

        source.module_config_dir = "cfg/".to_string();
        assert_eq!(source.module_config_path("b"), "cfg/module-b.json");
    }

    #[test]
    fn test_remote_detection() {
        let mut source = SourceSettings::default();
        assert!(!source.is_remote());

        source.location = "https://cdn.example.com/app".to_string();
        assert!(source.is_remote());
    }
}
