//! Template extension point.
//!
//! This crate only registers and enumerates templates; applying one to a
//! target project is an external collaborator's job.

use crate::api::TemplateCategory;
use crate::registry::{Registry, Template};
use std::sync::Arc;

pub struct TemplateAdapter {
    registry: Arc<Registry>,
}

impl TemplateAdapter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn list(&self, category: Option<TemplateCategory>) -> Vec<Template> {
        self.registry.get_templates(category)
    }
}
