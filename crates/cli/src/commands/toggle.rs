//! `weave plugin enable` / `weave plugin disable`

use crate::commands::shared::{build_manager, print_output, OutputFormat};
use clap::Args;
use serde::Serialize;
use tracing::instrument;

#[derive(Args, Debug)]
pub struct ToggleArgs {
    pub name: String,

    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ToggleOutput {
    name: String,
    enabled: bool,
}

#[instrument(skip(args))]
pub async fn execute_enable(args: ToggleArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    manager.enable(&args.name)?;
    let output = ToggleOutput {
        name: args.name,
        enabled: true,
    };
    print_output(args.output_format, &output, |o| format!("enabled {}", o.name))
}

#[instrument(skip(args))]
pub async fn execute_disable(args: ToggleArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    manager.disable(&args.name)?;
    let output = ToggleOutput {
        name: args.name,
        enabled: false,
    };
    print_output(args.output_format, &output, |o| format!("disabled {}", o.name))
}
