//! `weave plugin validate`

use crate::commands::shared::{build_manager, print_output, OutputFormat};
use clap::Args;
use std::path::PathBuf;
use tracing::instrument;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    pub path: PathBuf,

    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[instrument(skip(args))]
pub async fn execute_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    let result = manager.validate(&args.path);

    print_output(args.output_format, &result, |r| {
        if r.valid {
            "manifest is valid".to_string()
        } else {
            r.errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        }
    })?;

    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}
