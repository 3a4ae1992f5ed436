//! Service extension point.

use crate::errors::PluginError;
use crate::registry::Registry;
use std::any::Any;
use std::sync::Arc;

/// Identical in behavior to `Registry::resolve_service`/`has_service` —
/// host code and plugin code resolve services through the same surface.
pub struct ServiceAdapter {
    registry: Arc<Registry>,
}

impl ServiceAdapter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Any + Send + Sync>, PluginError> {
        self.registry.resolve_service(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.registry.has_service(name)
    }
}
