//! Module host: discovery, loading and lifecycle in one place

use crate::lifecycle::{HookInvoker, LifecycleReport, PhaseOrchestrator, PhaseTracker};
use crate::loader::{ModuleLoader, RemoteLoader};
use crate::registry::ModuleRegistry;
use crate::traits::{HostHandle, ModuleLifecyclePhase};
use modhost_config::{ModuleConfigLoader, ModuleHostConfig};
use modhost_core::config::LifecycleSettings;
use std::sync::Arc;

/// Owns the module registry and the lifecycle state of a host process
pub struct ModuleHost {
    settings: LifecycleSettings,
    registry: Arc<ModuleRegistry>,
    tracker: PhaseTracker,
    booted: bool,
}

impl ModuleHost {
    pub fn new(settings: LifecycleSettings) -> Self {
        Self {
            settings,
            registry: Arc::new(ModuleRegistry::new()),
            tracker: PhaseTracker::new(),
            booted: false,
        }
    }

    /// Discover, load and initialize every enabled module.
    ///
    /// Configuration discovery finishes before any module loads, and every
    /// module is loaded before the first phase starts. Failures are logged
    /// and contained; this never returns an error. A host boots once, later
    /// calls do nothing.
    pub async fn boot(
        &mut self,
        configs: &ModuleConfigLoader,
        remotes: Arc<dyn RemoteLoader>,
        host: HostHandle,
    ) -> LifecycleReport {
        if self.booted {
            tracing::warn!("Module host already booted, ignoring");
            return LifecycleReport::default();
        }
        self.booted = true;

        tracing::info!("Starting module lifecycle initialization");

        let module_configs = configs.load_module_configs().await;
        if module_configs.is_empty() {
            tracing::info!("No enabled modules found");
            return LifecycleReport::default();
        }

        let registry = self.load_modules(module_configs, remotes).await;
        if registry.is_empty() {
            tracing::info!("No modules successfully loaded");
            return LifecycleReport::default();
        }
        self.registry = Arc::new(registry);

        let report = self.run_all_phases(&host).await;
        tracing::info!(
            modules = self.registry.len(),
            failures = report.failure_count(),
            "Module lifecycle initialization complete"
        );
        report
    }

    async fn load_modules(
        &self,
        module_configs: Vec<ModuleHostConfig>,
        remotes: Arc<dyn RemoteLoader>,
    ) -> ModuleRegistry {
        let loader = ModuleLoader::new(remotes);
        let mut registry = ModuleRegistry::new();

        for config in module_configs {
            let remote_name = config.remote_name().to_string();
            loader
                .load_and_register(&mut registry, &remote_name, &self.settings.entry_path, config)
                .await;
        }

        registry
    }

    async fn run_all_phases(&self, host: &HostHandle) -> LifecycleReport {
        let invoker = HookInvoker::new(Arc::clone(&self.registry)).with_timeout(self.settings.hook_timeout());
        let orchestrator = PhaseOrchestrator::new(Arc::clone(&self.registry), invoker, self.tracker.clone());
        orchestrator.run_all_phases(host).await
    }

    /// Phase currently executing; stays at the last phase once boot completes
    pub fn current_phase(&self) -> Option<ModuleLifecyclePhase> {
        self.tracker.current()
    }

    /// Tracker that can be polled while `boot` runs
    pub fn phase_tracker(&self) -> PhaseTracker {
        self.tracker.clone()
    }

    /// Read-only view of the registered modules
    pub fn registered_modules(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Host configuration of a registered module
    pub fn module_config(&self, module_id: &str) -> Option<Arc<ModuleHostConfig>> {
        self.registry.config(module_id)
    }
}
