//! `weave plugin scaffold`

use crate::commands::shared::build_manager;
use clap::Args;
use std::path::PathBuf;
use tracing::instrument;

#[derive(Args, Debug)]
pub struct ScaffoldArgs {
    pub name: String,
    pub dir: PathBuf,
}

#[instrument(skip(args))]
pub async fn execute_scaffold(args: ScaffoldArgs) -> anyhow::Result<()> {
    let manager = build_manager()?;
    let created = manager.scaffold(&args.name, &args.dir)?;
    println!("scaffolded {} at {}:", args.name, args.dir.display());
    for path in &created {
        println!("  {}", path.display());
    }
    Ok(())
}
