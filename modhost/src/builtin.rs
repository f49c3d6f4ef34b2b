//! Modules compiled into the host binary
//!
//! Each one is exposed by a remote of the same name; it only loads once
//! `remotes.json` declares that remote.

use modhost_plugin::{HostHandle, ModuleContainer, ModuleHostConfig, ModuleLifecycleResult, RemoteCatalog, RemoteModule};
use parking_lot::Mutex;
use std::sync::Arc;

/// Application handed to every hook
#[derive(Debug, Clone)]
pub struct HostApp {
    pub name: String,
    pub version: &'static str,
}

/// Catalog with every built-in module exposed at `entry_path`
pub fn catalog(entry_path: &str) -> RemoteCatalog {
    let mut catalog = RemoteCatalog::new();
    catalog
        .provide("heartbeat", entry_path, |_| async { Ok(ModuleContainer::new(heartbeat())) })
        .provide("gatekeeper", entry_path, |_| async { Ok(ModuleContainer::new(gatekeeper())) });
    catalog
}

/// Logs every phase it takes part in
fn heartbeat() -> RemoteModule {
    RemoteModule::builder("heartbeat", "Heartbeat")
        .on_setup(|host: HostHandle| async move {
            match host.downcast_ref::<HostApp>() {
                Some(app) => tracing::info!(module = "heartbeat", "Attached to {} v{}", app.name, app.version),
                None => tracing::info!(module = "heartbeat", "Attached to unknown host"),
            }
            Ok(ModuleLifecycleResult::success())
        })
        .on_configure(|_, config: Arc<ModuleHostConfig>| async move {
            let keys: Vec<&String> = config.extra.keys().collect();
            tracing::info!(module = "heartbeat", "Configured with {:?}", keys);
            Ok(ModuleLifecycleResult::success())
        })
        .on_initialize(|_| async { Ok(ModuleLifecycleResult::success()) })
        .on_ready(|_| async {
            tracing::info!(module = "heartbeat", "Ready");
            Ok(ModuleLifecycleResult::success())
        })
        .on_post_init(|_| async { Ok(ModuleLifecycleResult::success()) })
        .build()
}

/// Refuses to become ready when its host configuration sets `"deny": true`
fn gatekeeper() -> RemoteModule {
    let deny = Arc::new(Mutex::new(false));
    let configured = Arc::clone(&deny);

    RemoteModule::builder("gatekeeper", "Gatekeeper")
        .on_configure(move |_, config: Arc<ModuleHostConfig>| {
            let configured = Arc::clone(&configured);
            async move {
                *configured.lock() = config.setting::<bool>("deny").unwrap_or(false);
                Ok(ModuleLifecycleResult::success())
            }
        })
        .on_ready(move |_| {
            let denied = *deny.lock();
            async move {
                if denied {
                    Ok(ModuleLifecycleResult::failure("access denied by host configuration"))
                } else {
                    Ok(ModuleLifecycleResult::success())
                }
            }
        })
        .build()
}
