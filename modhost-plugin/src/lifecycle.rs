//! Lifecycle phase execution
//!
//! [`HookInvoker`] calls one module's hook for one phase and turns every
//! outcome into a [`ModuleLifecycleResult`]. [`PhaseOrchestrator`] runs the
//! phases in order, fanning each one out across all modules and waiting for
//! every module to settle before starting the next phase.

use crate::registry::ModuleRegistry;
use crate::traits::{HostHandle, LifecycleHook, ModuleLifecyclePhase, ModuleLifecycleResult, RemoteModule};
use futures::FutureExt;
use futures::future::join_all;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Shared view of the phase currently being executed
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    current: Arc<RwLock<Option<ModuleLifecyclePhase>>>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase in progress, or the last one run once orchestration is over
    pub fn current(&self) -> Option<ModuleLifecyclePhase> {
        *self.current.read()
    }

    fn set(&self, phase: ModuleLifecyclePhase) {
        *self.current.write() = Some(phase);
    }
}

/// Calls lifecycle hooks
pub struct HookInvoker {
    registry: Arc<ModuleRegistry>,
    timeout: Option<Duration>,
}

impl HookInvoker {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Fail hooks that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `module`'s hook for `phase`.
    ///
    /// Never fails: a missing hook is a success, errors and panics become a
    /// failed result, and a hook that returns no usable result counts as a
    /// success.
    pub async fn invoke(
        &self,
        module: &RemoteModule,
        phase: ModuleLifecyclePhase,
        host: &HostHandle,
    ) -> ModuleLifecycleResult {
        let Some(hook) = module.hook(phase) else {
            tracing::debug!(module = %module.id(), %phase, "Hook {} not implemented, skipping", phase.hook_name());
            return ModuleLifecycleResult::success();
        };

        let call = match hook {
            LifecycleHook::Host(hook) => hook(host.clone()),
            LifecycleHook::Configure(hook) => match self.registry.config(module.id()) {
                Some(config) => hook(host.clone(), config),
                None => {
                    tracing::debug!(module = %module.id(), %phase, "No host configuration on file, skipping");
                    return ModuleLifecycleResult::success();
                }
            },
        };

        tracing::debug!(module = %module.id(), %phase, "Executing phase");

        let guarded = AssertUnwindSafe(call).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let message = format!("{} hook timed out after {}ms", phase, limit.as_millis());
                    tracing::error!(module = %module.id(), %phase, "{}", message);
                    return ModuleLifecycleResult::failure(message);
                }
            },
            None => guarded.await,
        };

        match outcome {
            Ok(Ok(output)) => match output.into_result() {
                Some(result) => result,
                None => {
                    tracing::warn!(
                        module = %module.id(),
                        %phase,
                        "Phase returned invalid result, treating as success"
                    );
                    ModuleLifecycleResult::success()
                }
            },
            Ok(Err(e)) => {
                tracing::error!(module = %module.id(), %phase, "Error in phase: {:#}", e);
                ModuleLifecycleResult::failure(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(module = %module.id(), %phase, "Panic in phase: {}", message);
                ModuleLifecycleResult::failure(message)
            }
        }
    }
}

/// Message carried by a caught panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "hook panicked".to_string()
    }
}

/// How one module's invocation of a phase settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// The invocation completed with a result
    Settled(ModuleLifecycleResult),
    /// The invocation task itself failed
    Rejected(String),
}

impl PhaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PhaseOutcome::Settled(result) if result.is_success())
    }
}

/// Outcomes of one phase, by module id
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: ModuleLifecyclePhase,
    pub outcomes: IndexMap<String, PhaseOutcome>,
}

impl PhaseReport {
    /// Ids of modules that did not succeed
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Outcomes of a full orchestration run
#[derive(Debug, Clone, Default)]
pub struct LifecycleReport {
    pub phases: Vec<PhaseReport>,
}

impl LifecycleReport {
    /// Outcome of `phase` for `module_id`
    pub fn outcome(&self, phase: ModuleLifecyclePhase, module_id: &str) -> Option<&PhaseOutcome> {
        self.phases
            .iter()
            .find(|report| report.phase == phase)
            .and_then(|report| report.outcomes.get(module_id))
    }

    /// Phases that ran, in order
    pub fn phases_run(&self) -> Vec<ModuleLifecyclePhase> {
        self.phases.iter().map(|report| report.phase).collect()
    }

    /// Number of module/phase pairs that did not succeed
    pub fn failure_count(&self) -> usize {
        self.phases.iter().map(|report| report.failed().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

/// Drives every registered module through the lifecycle phases
pub struct PhaseOrchestrator {
    registry: Arc<ModuleRegistry>,
    invoker: Arc<HookInvoker>,
    tracker: PhaseTracker,
}

impl PhaseOrchestrator {
    pub fn new(registry: Arc<ModuleRegistry>, invoker: HookInvoker, tracker: PhaseTracker) -> Self {
        Self {
            registry,
            invoker: Arc::new(invoker),
            tracker,
        }
    }

    /// Run all phases in order. Nothing runs when no module is registered.
    pub async fn run_all_phases(&self, host: &HostHandle) -> LifecycleReport {
        let mut report = LifecycleReport::default();

        if self.registry.is_empty() {
            tracing::info!("No modules registered, skipping lifecycle phases");
            return report;
        }

        for phase in ModuleLifecyclePhase::ALL {
            report.phases.push(self.run_phase(phase, host).await);
        }

        report
    }

    async fn run_phase(&self, phase: ModuleLifecyclePhase, host: &HostHandle) -> PhaseReport {
        self.tracker.set(phase);
        tracing::info!(%phase, "Starting phase for all modules");

        let tasks = self.spawn_phase(phase, host);
        self.settle_phase(phase, tasks).await
    }

    /// Start one invocation task per registered module
    fn spawn_phase(&self, phase: ModuleLifecyclePhase, host: &HostHandle) -> PhaseTasks {
        let tasks = self
            .registry
            .modules()
            .map(|module| {
                let invoker = Arc::clone(&self.invoker);
                let module = Arc::clone(module);
                let host = host.clone();
                let handle = tokio::spawn({
                    let module = Arc::clone(&module);
                    async move { invoker.invoke(&module, phase, &host).await }
                });
                (module, handle)
            })
            .collect();
        PhaseTasks(tasks)
    }

    /// Wait for every invocation of `phase`, whatever the individual outcomes
    async fn settle_phase(&self, phase: ModuleLifecyclePhase, mut tasks: PhaseTasks) -> PhaseReport {
        let settled = join_all(tasks.0.iter_mut().map(|(_, handle)| handle)).await;

        let mut outcomes = IndexMap::with_capacity(settled.len());
        for ((module, _), result) in tasks.0.iter().zip(settled) {
            let outcome = match result {
                Ok(result) => {
                    if let Some(error) = result.error() {
                        tracing::warn!(module = %module.id(), %phase, "Phase failed: {}", error);
                    }
                    PhaseOutcome::Settled(result)
                }
                Err(e) => {
                    tracing::error!(module = %module.id(), %phase, "Phase rejected: {}", e);
                    PhaseOutcome::Rejected(e.to_string())
                }
            };
            outcomes.insert(module.id().to_string(), outcome);
        }

        tracing::info!(%phase, "Completed phase");
        PhaseReport { phase, outcomes }
    }
}

/// Invocation tasks of one phase, aborted if the phase is abandoned
struct PhaseTasks(Vec<(Arc<RemoteModule>, JoinHandle<ModuleLifecycleResult>)>);

impl Drop for PhaseTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}
