//! Host settings

mod loader;
mod types;

pub use loader::SettingsLoader;
pub use types::{HostSettings, LifecycleSettings, LogFormat, LoggingSettings, SourceSettings};
