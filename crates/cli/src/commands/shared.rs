//! Shared helpers for subcommand output formatting and wiring.

use clap::ValueEnum;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use weave_core::config::ConfigStore;
use weave_core::manager::{CliPackageManager, Manager};
use weave_core::registry::Registry;
use weave_core::state::StateStore;

pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the `Manager` every subcommand delegates to, rooted at the
/// project's private plugin directory.
///
/// Each lifecycle subcommand is its own short-lived process, so the
/// `Registry` handed to `Manager` here starts empty — deregistration on
/// uninstall/disable only has live extensions to remove when `Manager` is
/// embedded alongside a running `Loader` in the same process (see
/// `weave_core::bootstrap`); from a one-shot CLI invocation it is a no-op,
/// not a skipped step.
pub fn build_manager() -> anyhow::Result<Manager> {
    let base = weave_core::state::default_state_path()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from(".weave"));

    Ok(Manager::new(
        Arc::new(CliPackageManager::new("weave-registry")),
        StateStore::new(base.join("state.json")),
        base.join("plugins"),
        ConfigStore::new(base.join("config")),
        Arc::new(Registry::new(HashSet::new(), HashSet::new(), HashSet::new())),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Prints `value` either as pretty JSON or by delegating to `text`, per the
/// `--output-format` flag every subcommand accepts.
pub fn print_output<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Text => {
            println!("{}", text(value));
        }
    }
    Ok(())
}
