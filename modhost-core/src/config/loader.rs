//! Settings loader

use crate::config::HostSettings;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Settings loader for the supported formats
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<HostSettings> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings file {}: {}", path.display(), e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext {
            "json" => Self::from_json(&content),
            "toml" | "" => Self::from_toml(&content),
            _ => Err(Error::Config(format!("Unknown settings format: {}", ext))),
        }
    }

    /// Load settings from `path`, or from the default location, or fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<HostSettings> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(default) if default.is_file() => {
                tracing::debug!("Using settings from {}", default.display());
                Self::load(default)
            }
            _ => Ok(HostSettings::default()),
        }
    }

    /// Default settings file location (`<config dir>/modhost/host.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("modhost").join("host.toml"))
    }

    /// Parse JSON settings
    pub fn from_json(content: &str) -> Result<HostSettings> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML settings
    pub fn from_toml(content: &str) -> Result<HostSettings> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}
