//! `weave plugin info`

use crate::commands::shared::{build_manager, print_output, OutputFormat};
use clap::Args;
use tracing::instrument;

const DEFAULT_REGISTRY_URL: &str = "https://registry.weave.dev";

#[derive(Args, Debug)]
pub struct InfoArgs {
    pub name: String,

    #[arg(long, default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[instrument(skip(args))]
pub async fn execute_info(args: InfoArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    let client = reqwest::Client::new();
    let info = manager.info(&client, &args.registry_url, &args.name).await;

    match info {
        Some(value) => print_output(args.output_format, &value, |v| v.to_string()),
        None => {
            println!("no information found for '{}'", args.name);
            Ok(())
        }
    }
}
