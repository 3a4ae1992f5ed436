//! `weave plugin list`

use crate::commands::shared::{build_manager, print_output, OutputFormat};
use clap::Args;
use tracing::instrument;
use weave_core::manager::PluginListEntry;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[instrument(skip(args))]
pub async fn execute_list(args: ListArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    let entries = manager.list()?;

    print_output(args.output_format, &entries, |entries: &Vec<PluginListEntry>| {
        if entries.is_empty() {
            return "no plugins installed".to_string();
        }
        entries
            .iter()
            .map(|e| {
                let status = if e.enabled { "enabled" } else { "disabled" };
                let points = e
                    .extension_points
                    .iter()
                    .map(|p| format!("{:?}", p).to_lowercase())
                    .collect::<Vec<_>>()
                    .join(",");
                let description = e.description.as_deref().unwrap_or("");
                format!("{} {} [{}] ({}) {}", e.name, e.version, status, points, description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}
