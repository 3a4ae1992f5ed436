use crate::commands::config::ConfigCommand;
use crate::commands::{config, doctor, info, install, list, scaffold, search, toggle, uninstall, update, validate};
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Plugin subsystem host CLI for a spec-driven orchestrator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plugin lifecycle management.
    #[command(subcommand)]
    Plugin(PluginCommand),
}

#[derive(Subcommand, Debug)]
pub enum PluginCommand {
    Install(install::InstallArgs),
    Uninstall(uninstall::UninstallArgs),
    Update(update::UpdateArgs),
    Enable(toggle::ToggleArgs),
    Disable(toggle::ToggleArgs),
    List(list::ListArgs),
    Search(search::SearchArgs),
    Info(info::InfoArgs),
    #[command(subcommand)]
    Config(ConfigCommand),
    Scaffold(scaffold::ScaffoldArgs),
    Validate(validate::ValidateArgs),
    Doctor(doctor::DoctorArgs),
}

impl Cli {
    pub async fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Plugin(cmd) => match cmd {
                PluginCommand::Install(args) => install::execute_install(args).await,
                PluginCommand::Uninstall(args) => uninstall::execute_uninstall(args).await,
                PluginCommand::Update(args) => update::execute_update(args).await,
                PluginCommand::Enable(args) => toggle::execute_enable(args).await,
                PluginCommand::Disable(args) => toggle::execute_disable(args).await,
                PluginCommand::List(args) => list::execute_list(args).await,
                PluginCommand::Search(args) => search::execute_search(args).await,
                PluginCommand::Info(args) => info::execute_info(args).await,
                PluginCommand::Config(ConfigCommand::Get(args)) => config::execute_config_get(args).await,
                PluginCommand::Config(ConfigCommand::Set(args)) => config::execute_config_set(args).await,
                PluginCommand::Scaffold(args) => scaffold::execute_scaffold(args).await,
                PluginCommand::Validate(args) => validate::execute_validate(args).await,
                PluginCommand::Doctor(args) => doctor::execute_doctor(args).await,
            },
        }
    }
}
