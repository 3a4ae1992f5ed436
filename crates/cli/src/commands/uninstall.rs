//! `weave plugin uninstall`

use crate::commands::shared::{build_manager, print_output, OutputFormat};
use clap::Args;
use serde::Serialize;
use tracing::instrument;

#[derive(Args, Debug)]
pub struct UninstallArgs {
    pub name: String,

    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct UninstallOutput {
    name: String,
    removed: bool,
}

#[instrument(skip(args))]
pub async fn execute_uninstall(args: UninstallArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    manager.uninstall(&args.name).await?;

    let output = UninstallOutput {
        name: args.name,
        removed: true,
    };
    print_output(args.output_format, &output, |o| format!("uninstalled {}", o.name))
}
