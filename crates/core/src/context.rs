//! Per-activation plugin context.
//!
//! Constructed once by the loader for each plugin activation attempt and
//! handed to that plugin's `activate`. It is the plugin's only window onto
//! the host: a frozen view of its merged configuration, and registration
//! methods that forward into the shared [`Registry`].

use crate::api::{Agent, CommandHandler, HookHandler, ServiceDispose, ServiceFactory};
use crate::errors::PluginError;
use crate::registry::Registry;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tracing::info;

/// A read-only wrapper around a `serde_json::Value`. Deep-freezing is
/// expressed by construction rather than by trapping mutation at runtime:
/// there is no method on this type that returns anything but a shared
/// reference or an owned clone.
#[derive(Debug, Clone)]
pub struct FrozenValue(Value);

impl FrozenValue {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn get(&self) -> &Value {
        &self.0
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn to_owned_value(&self) -> Value {
        self.0.clone()
    }
}

pub struct PluginContext {
    plugin_name: String,
    plugin_version: String,
    host_version: String,
    config: FrozenValue,
    project_config: FrozenValue,
    registry: Arc<Registry>,
}

impl PluginContext {
    pub fn new(
        plugin_name: impl Into<String>,
        plugin_version: impl Into<String>,
        host_version: impl Into<String>,
        config: Value,
        project_config: Value,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            plugin_version: plugin_version.into(),
            host_version: host_version.into(),
            config: FrozenValue::new(config),
            project_config: FrozenValue::new(project_config),
            registry,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn plugin_version(&self) -> &str {
        &self.plugin_version
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    pub fn config(&self) -> &FrozenValue {
        &self.config
    }

    pub fn project_config(&self) -> &FrozenValue {
        &self.project_config
    }

    pub fn log(&self, level: tracing::Level, message: &str) {
        match level {
            tracing::Level::ERROR => tracing::error!("[{}] {}", self.plugin_name, message),
            tracing::Level::WARN => tracing::warn!("[{}] {}", self.plugin_name, message),
            tracing::Level::DEBUG => tracing::debug!("[{}] {}", self.plugin_name, message),
            tracing::Level::TRACE => tracing::trace!("[{}] {}", self.plugin_name, message),
            _ => info!("[{}] {}", self.plugin_name, message),
        }
    }

    pub fn register_command(
        &self,
        name: &str,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<(), PluginError> {
        self.registry.register_command(&self.plugin_name, name, handler)
    }

    pub fn register_agent(&self, name: &str, agent: Arc<dyn Agent>) -> Result<(), PluginError> {
        self.registry.register_agent(&self.plugin_name, name, agent)
    }

    pub fn register_hook(
        &self,
        phase: &str,
        timing: &str,
        priority_rank: u8,
        handler: Arc<dyn HookHandler>,
    ) {
        self.registry
            .register_hook(&self.plugin_name, phase, timing, priority_rank, handler)
    }

    pub fn register_service(
        &self,
        name: &str,
        dependencies: Vec<String>,
        factory: ServiceFactory,
        dispose: Option<ServiceDispose>,
    ) -> Result<(), PluginError> {
        self.registry
            .register_service(&self.plugin_name, name, dependencies, factory, dispose)
    }

    pub fn register_template(
        &self,
        descriptor: crate::api::TemplateDescriptor,
    ) -> Result<(), PluginError> {
        self.registry.register_template(&self.plugin_name, descriptor)
    }

    pub fn get_service(&self, name: &str) -> Result<Arc<dyn Any + Send + Sync>, PluginError> {
        self.registry.resolve_service(name)
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.registry.has_service(name)
    }
}
