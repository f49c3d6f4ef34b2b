//! Modhost - boots remote modules through their lifecycle phases
//!
//! This is the main entry point for the Modhost CLI.

mod builtin;

use clap::{Parser, Subcommand};
use modhost_config::{source_from_settings, ModuleConfigLoader};
use modhost_core::config::{HostSettings, LogFormat, SettingsLoader};
use modhost_plugin::{HostHandle, LifecycleReport, ModuleHost, ModuleLifecyclePhase, PhaseOutcome};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "modhost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Host settings file (.toml or .json)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover, load and initialize modules
    Run {
        /// Configuration location (URL or directory), overrides the settings
        #[arg(long)]
        source: Option<String>,
    },

    /// List the enabled module configurations without loading anything
    Discover {
        /// Configuration location (URL or directory), overrides the settings
        #[arg(long)]
        source: Option<String>,
    },

    /// Print the lifecycle phases and their hook names
    Phases,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = SettingsLoader::load_or_default(cli.settings.as_deref())?;
    init_tracing(&settings, cli.verbose);

    if cli.verbose {
        tracing::debug!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Run { source } => {
            if let Some(location) = source {
                settings.source.location = location;
            }
            run(settings).await
        }

        Commands::Discover { source } => {
            if let Some(location) = source {
                settings.source.location = location;
            }
            discover(settings).await
        }

        Commands::Phases => {
            for phase in ModuleLifecyclePhase::ALL {
                println!("{:<12} {}", phase, phase.hook_name());
            }
            Ok(())
        }
    }
}

fn init_tracing(settings: &HostSettings, verbose: bool) {
    let level = if verbose { "debug" } else { settings.logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // stdout carries the command output, logs go to stderr
    let ansi = std::io::stderr().is_terminal();
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(ansi);

    let registry = tracing_subscriber::registry().with(filter);
    match settings.logging.format {
        LogFormat::Pretty => registry.with(layer).init(),
        LogFormat::Compact => registry.with(layer.compact()).init(),
    }
}

async fn run(settings: HostSettings) -> anyhow::Result<()> {
    tracing::info!("Starting Modhost with configuration from {}", settings.source.location);

    let source = source_from_settings(&settings.source)?;
    let configs = ModuleConfigLoader::new(source, settings.source.clone());

    let catalog = builtin::catalog(&settings.lifecycle.entry_path);
    catalog.register_from(&configs).await?;

    let app = builtin::HostApp {
        name: "modhost".to_string(),
        version: modhost_core::VERSION,
    };

    let mut host = ModuleHost::new(settings.lifecycle.clone());
    let report = host.boot(&configs, Arc::new(catalog), HostHandle::new(app)).await;

    print_report(&report);
    println!(
        "🚀 {} module(s) initialized, {} failure(s)",
        host.registered_modules().len(),
        report.failure_count()
    );
    Ok(())
}

async fn discover(settings: HostSettings) -> anyhow::Result<()> {
    let source = source_from_settings(&settings.source)?;
    let configs = ModuleConfigLoader::new(source, settings.source);

    for config in configs.load_module_configs().await {
        println!("{}\t{}", config.id, config.remote_name());
    }
    Ok(())
}

fn print_report(report: &LifecycleReport) {
    for phase in &report.phases {
        for (module, outcome) in &phase.outcomes {
            let status = match outcome {
                PhaseOutcome::Settled(result) => match result.error() {
                    None => "ok".to_string(),
                    Some(error) => format!("failed: {}", error),
                },
                PhaseOutcome::Rejected(reason) => format!("rejected: {}", reason),
            };
            println!("{} {} {}", phase.phase, module, status);
        }
    }
}
