//! `weave plugin config get` / `weave plugin config set`

use crate::commands::shared::{build_manager, print_output, OutputFormat};
use clap::{Args, Subcommand};
use tracing::instrument;
use weave_core::errors::PluginError;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Get(ConfigGetArgs),
    Set(ConfigSetArgs),
}

#[derive(Args, Debug)]
pub struct ConfigGetArgs {
    pub plugin: String,
    pub key: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    pub plugin: String,
    pub key: String,
    pub value: String,

    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

fn manifest_for(manager: &weave_core::manager::Manager, plugin: &str) -> anyhow::Result<weave_core::manifest::PluginManifest> {
    let state = manager.state()?;
    let entry = state
        .plugins
        .get(plugin)
        .ok_or_else(|| PluginError::NotFound {
            plugin: plugin.to_string(),
        })?;
    let local_path = entry
        .local_path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("plugin '{}' has no known install path", plugin))?;

    let validation = manager.validate(&local_path.join("plugin.json"));
    validation
        .manifest
        .ok_or_else(|| anyhow::anyhow!("plugin manifest for '{}' is invalid", plugin))
}

#[instrument(skip(args))]
pub async fn execute_config_get(args: ConfigGetArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    let manifest = manifest_for(&manager, &args.plugin)?;
    let value = manager.get_config(&args.plugin, &manifest, args.key.as_deref())?;
    print_output(args.output_format, &value, |v| v.to_string())
}

#[instrument(skip(args))]
pub async fn execute_config_set(args: ConfigSetArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    let manifest = manifest_for(&manager, &args.plugin)?;
    let value: serde_json::Value =
        serde_json::from_str(&args.value).unwrap_or(serde_json::Value::String(args.value.clone()));
    manager.set_config(&args.plugin, &manifest, &args.key, value)?;
    println!("set {}.{}", args.plugin, args.key);
    Ok(())
}
