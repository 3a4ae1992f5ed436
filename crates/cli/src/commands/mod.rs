//! Command implementations
//!
//! This module contains implementations for all `plugin` subcommands.

pub mod config;
pub mod doctor;
pub mod info;
pub mod install;
pub mod list;
pub mod scaffold;
pub mod search;
pub mod shared;
pub mod toggle;
pub mod uninstall;
pub mod update;
pub mod validate;
