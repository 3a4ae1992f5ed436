//! `weave plugin install`

use crate::commands::shared::{build_manager, print_output, OutputFormat, HOST_VERSION};
use clap::Args;
use serde::Serialize;
use tracing::instrument;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Plugin name or registry reference to install.
    pub target: String,

    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct InstallOutput {
    name: String,
    version: String,
}

#[instrument(skip(args))]
pub async fn execute_install(args: InstallArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    let pb = crate::ui::spinner::PlainSpinner::start(&format!("Installing {}…", args.target));

    let result = manager.install(&args.target, HOST_VERSION, None).await;
    let manifest = match result {
        Ok(m) => {
            pb.finish_with_message(&format!("Installed {} {}", m.name, m.version));
            m
        }
        Err(e) => {
            pb.fail_with_message(&format!("Install failed: {}", e));
            return Err(e.into());
        }
    };

    let output = InstallOutput {
        name: manifest.name,
        version: manifest.version,
    };
    print_output(args.output_format, &output, |o| {
        format!("installed {} {}", o.name, o.version)
    })
}
