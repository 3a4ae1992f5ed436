//! `weave plugin search`

use crate::commands::shared::{build_manager, print_output, OutputFormat};
use clap::Args;
use tracing::instrument;

const DEFAULT_REGISTRY_URL: &str = "https://registry.weave.dev";

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long, default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[instrument(skip(args))]
pub async fn execute_search(args: SearchArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    let client = reqwest::Client::new();
    let results = manager.search(&client, &args.registry_url, &args.query).await;

    print_output(args.output_format, &results, |results| {
        if results.is_empty() {
            return "no matching plugins found".to_string();
        }
        results
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    })
}
