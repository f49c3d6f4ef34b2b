//! Configuration sources
//!
//! A source serves raw documents addressed by a relative path such as
//! `config/modules.json`. The host talks to an HTTP server in production
//! and to a local directory when running from a checkout.

use async_trait::async_trait;
use modhost_core::config::SourceSettings;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Source errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{path} returned HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("request for {path} failed: {message}")]
    Request { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid source location: {0}")]
    InvalidLocation(String),
}

/// A place configuration documents are fetched from
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the raw document at `path`
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, SourceError>;

    /// Human readable location of `path`, for diagnostics
    fn describe(&self, path: &str) -> String;
}

/// Build the source described by the host settings
pub fn source_from_settings(settings: &SourceSettings) -> Result<Arc<dyn ConfigSource>, SourceError> {
    if settings.is_remote() {
        Ok(Arc::new(HttpSource::new(&settings.location)?))
    } else {
        Ok(Arc::new(DirSource::new(&settings.location)))
    }
}

/// Fetches documents over HTTP relative to a base URL
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// Create a source rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SourceError::InvalidLocation(base_url.to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ConfigSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| SourceError::Request {
            path: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                path: url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| SourceError::Request {
            path: url,
            message: e.to_string(),
        })?;
        Ok(body.to_vec())
    }

    fn describe(&self, path: &str) -> String {
        self.url(path)
    }
}

/// Reads documents from a local directory
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Create a source rooted at `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ConfigSource for DirSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let full = self.resolve(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(full.display().to_string()))
            }
            Err(e) => Err(SourceError::Io(e)),
        }
    }

    fn describe(&self, path: &str) -> String {
        self.resolve(path).display().to_string()
    }
}

/// Serves documents from memory, for embedding hosts and tests
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    documents: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a JSON document
    pub fn with_json(self, path: &str, value: &serde_json::Value) -> Self {
        self.with_raw(path, value.to_string())
    }

    /// Add a document verbatim
    pub fn with_raw(mut self, path: &str, body: impl Into<Vec<u8>>) -> Self {
        self.documents
            .insert(path.trim_start_matches('/').to_string(), body.into());
        self
    }
}

#[async_trait]
impl ConfigSource for MemorySource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        self.documents
            .get(path.trim_start_matches('/'))
            .cloned()
            .ok_or_else(|| SourceError::NotFound(self.describe(path)))
    }

    fn describe(&self, path: &str) -> String {
        format!("memory:/{}", path.trim_start_matches('/'))
    }
}
