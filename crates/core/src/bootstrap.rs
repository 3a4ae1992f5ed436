//! Top-level composition root: wires the registry, loader, and adapters
//! together and runs the initial load pass.

use crate::adapters::{AgentAdapter, CommandAdapter, HookRunner, ServiceAdapter, TemplateAdapter};
use crate::loader::{EnabledSet, LoadReport, Loader, LoaderConfig};
use crate::registry::Registry;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

pub struct BootstrapOptions {
    pub install_dirs: Vec<PathBuf>,
    pub install_root: PathBuf,
    pub config_root: PathBuf,
    pub host_version: String,
    pub enabled: EnabledSet,
    pub dev_mode: bool,
    pub project_config: serde_json::Value,
    pub core_commands: HashSet<String>,
    pub core_agents: HashSet<String>,
    pub core_services: HashSet<String>,
}

/// The host-facing surface handed back from [`bootstrap`]: one adapter per
/// extension point, plus a report of what loaded (or didn't) this pass.
pub struct PluginSubsystem {
    pub commands: CommandAdapter,
    pub agents: AgentAdapter,
    pub hooks: HookRunner,
    pub services: ServiceAdapter,
    pub templates: TemplateAdapter,
    pub report: LoadReport,
    pub registry: Arc<Registry>,
    pub loader: Arc<Loader>,
}

#[instrument(skip(options))]
pub async fn bootstrap(options: BootstrapOptions) -> PluginSubsystem {
    let registry = Arc::new(Registry::new(
        options.core_commands,
        options.core_agents,
        options.core_services,
    ));

    let loader_config = LoaderConfig {
        install_dirs: options.install_dirs,
        install_root: options.install_root,
        config_root: options.config_root,
        host_version: options.host_version,
        enabled: options.enabled,
        dev_mode: options.dev_mode,
        project_config: options.project_config,
    };
    let loader = Arc::new(Loader::new(loader_config, registry.clone()));
    let report = loader.load_plugins().await;

    PluginSubsystem {
        commands: CommandAdapter::new(registry.clone()),
        agents: AgentAdapter::new(registry.clone()),
        hooks: HookRunner::new(registry.clone()),
        services: ServiceAdapter::new(registry.clone()),
        templates: TemplateAdapter::new(registry.clone()),
        report,
        registry,
        loader,
    }
}
