//! Command extension point.

use crate::errors::PluginError;
use crate::registry::Registry;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::instrument;

pub struct CommandAdapter {
    registry: Arc<Registry>,
}

impl CommandAdapter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Executes a registered command, isolating the call behind
    /// `catch_unwind` since the handler body may be plugin-authored code
    /// this host does not control.
    #[instrument(skip(self, args))]
    pub fn execute_command(&self, name: &str, args: &Value) -> Result<Value, PluginError> {
        let handler = self
            .registry
            .get_command(name)
            .ok_or_else(|| PluginError::NotFound {
                plugin: name.to_string(),
            })?;

        match catch_unwind(AssertUnwindSafe(|| handler.execute(args))) {
            Ok(result) => result,
            Err(_) => Err(PluginError::Lifecycle {
                plugin: name.to_string(),
                message: "command handler panicked".to_string(),
            }),
        }
    }
}
