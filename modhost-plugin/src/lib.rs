//! Modhost Plugin System
//!
//! Loads remote modules and drives them through the lifecycle phases:
//! `setup`, `configure`, `initialize`, `ready` and `post_init`. Every phase
//! runs concurrently across modules and finishes for all of them before the
//! next one starts. A failing module never stops the others.

mod host;
mod lifecycle;
mod loader;
mod registry;
mod traits;

pub use host::ModuleHost;
pub use lifecycle::{HookInvoker, LifecycleReport, PhaseOrchestrator, PhaseOutcome, PhaseReport, PhaseTracker};
pub use loader::{remote_key, LoadError, ModuleContainer, ModuleLoader, RemoteCatalog, RemoteLoader};
pub use registry::ModuleRegistry;
pub use traits::{
    HookFuture, HookOutput, HostHandle, LifecycleHook, ModuleLifecyclePhase, ModuleLifecycleResult,
    RemoteModule, RemoteModuleBuilder,
};

pub use modhost_config::ModuleHostConfig;
