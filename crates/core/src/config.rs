//! Per-plugin user configuration.
//!
//! Each plugin gets one JSON file under the project's private directory.
//! Reads merge the plugin's declared schema defaults under any user
//! overrides (user wins); writes validate a value's JSON type against the
//! field's declared type before committing it, atomically.

use crate::errors::{ManifestError, ManifestErrorCode, PluginError};
use crate::manifest::ConfigFieldSchema;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::instrument;

pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, plugin_name: &str) -> PathBuf {
        self.plugin_dir(plugin_name).join("config.json")
    }

    /// The plugin's config directory, for best-effort removal on uninstall.
    pub fn plugin_dir(&self, plugin_name: &str) -> PathBuf {
        self.root.join(plugin_name)
    }

    /// Reads a plugin's config, merged with schema defaults. If `key` is
    /// given, returns only that field's value.
    #[instrument(skip(self, schema))]
    pub fn read(
        &self,
        plugin_name: &str,
        schema: &HashMap<String, ConfigFieldSchema>,
        key: Option<&str>,
    ) -> Result<serde_json::Value, PluginError> {
        let mut merged = serde_json::Map::new();
        for (field, field_schema) in schema {
            if let Some(default) = &field_schema.default {
                merged.insert(field.clone(), default.clone());
            }
        }

        let path = self.path_for(plugin_name);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let user: serde_json::Value = serde_json::from_str(&contents)?;
            if let Some(obj) = user.as_object() {
                for (k, v) in obj {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }

        match key {
            Some(k) => Ok(merged.get(k).cloned().unwrap_or(serde_json::Value::Null)),
            None => Ok(serde_json::Value::Object(merged)),
        }
    }

    /// Validates `value`'s JSON type against the schema field's declared
    /// type, then writes it into the plugin's config file atomically.
    #[instrument(skip(self, value, schema))]
    pub fn write(
        &self,
        plugin_name: &str,
        key: &str,
        value: serde_json::Value,
        schema: &HashMap<String, ConfigFieldSchema>,
    ) -> Result<(), PluginError> {
        if let Some(field_schema) = schema.get(key) {
            if !field_schema.field_type.matches(&value) {
                return Err(PluginError::Manifest(crate::errors::ManifestErrorList(vec![
                    ManifestError::new(
                        key,
                        format!("expected a {:?} value", field_schema.field_type),
                        ManifestErrorCode::InvalidType,
                    ),
                ])));
            }
        }

        let path = self.path_for(plugin_name);
        let mut current = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str::<serde_json::Value>(&contents)?
        } else {
            serde_json::Value::Object(serde_json::Map::new())
        };

        current
            .as_object_mut()
            .expect("config file root must be an object")
            .insert(key.to_string(), value);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&current)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;

        #[cfg(windows)]
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}
