//! `weave plugin update`

use crate::commands::shared::{build_manager, print_output, OutputFormat, HOST_VERSION};
use clap::Args;
use serde::Serialize;
use tracing::instrument;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub name: String,

    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct UpdateOutput {
    name: String,
    version: String,
}

#[instrument(skip(args))]
pub async fn execute_update(args: UpdateArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    let manifest = manager.update(&args.name, HOST_VERSION).await?;

    let output = UpdateOutput {
        name: manifest.name,
        version: manifest.version,
    };
    print_output(args.output_format, &output, |o| {
        format!("updated {} to {}", o.name, o.version)
    })
}
