//! Module contract: phases, hook results and the module value itself

use futures::future::BoxFuture;
use modhost_config::ModuleHostConfig;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Lifecycle phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleLifecyclePhase {
    Setup,
    Configure,
    Initialize,
    Ready,
    PostInit,
}

impl ModuleLifecyclePhase {
    /// Every phase, in the only legal order
    pub const ALL: [ModuleLifecyclePhase; 5] = [
        ModuleLifecyclePhase::Setup,
        ModuleLifecyclePhase::Configure,
        ModuleLifecyclePhase::Initialize,
        ModuleLifecyclePhase::Ready,
        ModuleLifecyclePhase::PostInit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleLifecyclePhase::Setup => "setup",
            ModuleLifecyclePhase::Configure => "configure",
            ModuleLifecyclePhase::Initialize => "initialize",
            ModuleLifecyclePhase::Ready => "ready",
            ModuleLifecyclePhase::PostInit => "postInit",
        }
    }

    /// Name of the hook a module implements for this phase (`onSetup`, ...)
    pub fn hook_name(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("on{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => "on".to_string(),
        }
    }

    /// The phase that follows this one
    pub fn next(&self) -> Option<ModuleLifecyclePhase> {
        let idx = Self::ALL.iter().position(|p| p == self)?;
        Self::ALL.get(idx + 1).copied()
    }
}

impl fmt::Display for ModuleLifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of one phase for one module.
///
/// A failed result always carries a non-empty error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLifecycleResult {
    success: bool,
    error: Option<String>,
}

impl ModuleLifecycleResult {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            "unspecified error".to_string()
        } else {
            error
        };
        Self {
            success: false,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Whatever a hook handed back.
///
/// Only `Result` and well formed JSON (`{ "success": bool, "error"?: string }`)
/// carry an outcome; anything else is normalized by the invoker.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutput {
    Result(ModuleLifecycleResult),
    Empty,
    Json(Value),
}

impl HookOutput {
    /// The outcome carried by this output, `None` if absent or malformed
    pub fn into_result(self) -> Option<ModuleLifecycleResult> {
        match self {
            HookOutput::Result(result) => Some(result),
            HookOutput::Empty => None,
            HookOutput::Json(value) => match value.get("success") {
                Some(Value::Bool(true)) => Some(ModuleLifecycleResult::success()),
                Some(Value::Bool(false)) => {
                    let error = match value.get("error") {
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Null) | None => String::new(),
                        Some(other) => other.to_string(),
                    };
                    Some(ModuleLifecycleResult::failure(error))
                }
                _ => None,
            },
        }
    }
}

impl From<ModuleLifecycleResult> for HookOutput {
    fn from(result: ModuleLifecycleResult) -> Self {
        HookOutput::Result(result)
    }
}

impl From<Option<ModuleLifecycleResult>> for HookOutput {
    fn from(result: Option<ModuleLifecycleResult>) -> Self {
        result.map_or(HookOutput::Empty, HookOutput::Result)
    }
}

impl From<()> for HookOutput {
    fn from(_: ()) -> Self {
        HookOutput::Empty
    }
}

impl From<Value> for HookOutput {
    fn from(value: Value) -> Self {
        HookOutput::Json(value)
    }
}

/// Opaque handle to the hosting application, passed unchanged to every hook
#[derive(Clone)]
pub struct HostHandle {
    inner: Arc<dyn Any + Send + Sync>,
}

impl HostHandle {
    pub fn new<T: Any + Send + Sync>(app: T) -> Self {
        Self { inner: Arc::new(app) }
    }

    /// A handle with no application behind it
    pub fn empty() -> Self {
        Self::new(())
    }

    /// Borrow the application if it is a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Whether two handles refer to the same application
    pub fn same_as(&self, other: &HostHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHandle").finish_non_exhaustive()
    }
}

/// Future returned by a lifecycle hook
pub type HookFuture = BoxFuture<'static, anyhow::Result<HookOutput>>;

type HostHookFn = dyn Fn(HostHandle) -> HookFuture + Send + Sync;
type ConfigureHookFn = dyn Fn(HostHandle, Arc<ModuleHostConfig>) -> HookFuture + Send + Sync;

/// A lifecycle hook implemented by a module
#[derive(Clone)]
pub enum LifecycleHook {
    /// Receives the host handle only
    Host(Arc<HostHookFn>),
    /// Receives the host handle and the module's host configuration
    Configure(Arc<ConfigureHookFn>),
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleHook::Host(_) => f.write_str("LifecycleHook::Host"),
            LifecycleHook::Configure(_) => f.write_str("LifecycleHook::Configure"),
        }
    }
}

/// A loaded module: identity plus whichever lifecycle hooks it implements
#[derive(Clone)]
pub struct RemoteModule {
    id: String,
    name: String,
    hooks: HashMap<ModuleLifecyclePhase, LifecycleHook>,
}

impl RemoteModule {
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> RemoteModuleBuilder {
        RemoteModuleBuilder {
            module: RemoteModule {
                id: id.into(),
                name: name.into(),
                hooks: HashMap::new(),
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hook for `phase`, if the module implements one
    pub fn hook(&self, phase: ModuleLifecyclePhase) -> Option<&LifecycleHook> {
        self.hooks.get(&phase)
    }

    /// Phases this module has hooks for, in execution order
    pub fn implemented_phases(&self) -> Vec<ModuleLifecyclePhase> {
        ModuleLifecyclePhase::ALL
            .into_iter()
            .filter(|p| self.hooks.contains_key(p))
            .collect()
    }
}

impl fmt::Debug for RemoteModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteModule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("hooks", &self.implemented_phases())
            .finish()
    }
}

/// Builder for [`RemoteModule`]
pub struct RemoteModuleBuilder {
    module: RemoteModule,
}

impl RemoteModuleBuilder {
    pub fn on_setup<F, Fut, O>(self, hook: F) -> Self
    where
        F: Fn(HostHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<HookOutput> + Send + 'static,
    {
        self.host_hook(ModuleLifecyclePhase::Setup, hook)
    }

    /// The configure hook also receives the module's host configuration
    pub fn on_configure<F, Fut, O>(mut self, hook: F) -> Self
    where
        F: Fn(HostHandle, Arc<ModuleHostConfig>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<HookOutput> + Send + 'static,
    {
        let hook = Arc::new(hook);
        let call = move |host: HostHandle, config: Arc<ModuleHostConfig>| -> HookFuture {
            let hook = Arc::clone(&hook);
            Box::pin(async move { hook(host, config).await.map(Into::into) })
        };
        self.module
            .hooks
            .insert(ModuleLifecyclePhase::Configure, LifecycleHook::Configure(Arc::new(call)));
        self
    }

    pub fn on_initialize<F, Fut, O>(self, hook: F) -> Self
    where
        F: Fn(HostHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<HookOutput> + Send + 'static,
    {
        self.host_hook(ModuleLifecyclePhase::Initialize, hook)
    }

    pub fn on_ready<F, Fut, O>(self, hook: F) -> Self
    where
        F: Fn(HostHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<HookOutput> + Send + 'static,
    {
        self.host_hook(ModuleLifecyclePhase::Ready, hook)
    }

    pub fn on_post_init<F, Fut, O>(self, hook: F) -> Self
    where
        F: Fn(HostHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<HookOutput> + Send + 'static,
    {
        self.host_hook(ModuleLifecyclePhase::PostInit, hook)
    }

    pub fn build(self) -> RemoteModule {
        self.module
    }

    fn host_hook<F, Fut, O>(mut self, phase: ModuleLifecyclePhase, hook: F) -> Self
    where
        F: Fn(HostHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<HookOutput> + Send + 'static,
    {
        // The user closure only runs once the future is polled, so panics
        // raised before its first await are caught with the rest.
        let hook = Arc::new(hook);
        let call = move |host: HostHandle| -> HookFuture {
            let hook = Arc::clone(&hook);
            Box::pin(async move { hook(host).await.map(Into::into) })
        };
        self.module.hooks.insert(phase, LifecycleHook::Host(Arc::new(call)));
        self
    }
}
