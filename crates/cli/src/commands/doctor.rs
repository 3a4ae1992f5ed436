//! `weave plugin doctor`

use crate::commands::shared::{print_output, OutputFormat, HOST_VERSION};
use clap::Args;
use std::collections::HashSet;
use tracing::instrument;
use weave_core::bootstrap::{bootstrap, BootstrapOptions};
use weave_core::loader::EnabledSet;
use weave_core::state::StateStore;

#[derive(Args, Debug)]
pub struct DoctorArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[instrument(skip(args))]
pub async fn execute_doctor(args: DoctorArgs) -> anyhow::Result<()> {
    let base = weave_core::state::default_state_path()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| std::path::PathBuf::from(".weave"));

    let state = StateStore::new(base.join("state.json")).read()?;
    let enabled = if state.plugins.is_empty() {
        EnabledSet::Unconfigured
    } else {
        EnabledSet::Explicit(
            state
                .plugins
                .iter()
                .filter(|(_, entry)| entry.enabled)
                .map(|(name, _)| name.clone())
                .collect(),
        )
    };

    let options = BootstrapOptions {
        install_dirs: vec![base.join("plugins")],
        install_root: base.join("plugins"),
        config_root: base.join("config"),
        host_version: HOST_VERSION.to_string(),
        enabled,
        dev_mode: false,
        project_config: serde_json::Value::Null,
        core_commands: HashSet::new(),
        core_agents: HashSet::new(),
        core_services: HashSet::new(),
    };

    let subsystem = bootstrap(options).await;

    print_output(args.output_format, &subsystem.report, |report| {
        format!(
            "loaded {} plugin(s), skipped {}, {} error(s)",
            report.loaded.len(),
            report.skipped.len(),
            report.errors.len()
        )
    })
}
