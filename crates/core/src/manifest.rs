//! Manifest schema and validation
//!
//! Reads and validates a plugin's `plugin.json` manifest: required fields,
//! field types, and host/plugin version compatibility. This is the leaf
//! component of the plugin subsystem — nothing else depends on a manifest
//! that hasn't passed through here.

use crate::errors::{ManifestError, ManifestErrorCode};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument};

/// The five kinds of extension a plugin manifest may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtensionPoint {
    Commands,
    Agents,
    Hooks,
    Services,
    Templates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigFieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ConfigFieldType {
    /// Whether a JSON value is of this declared type.
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            ConfigFieldType::String => value.is_string(),
            ConfigFieldType::Number => value.is_number(),
            ConfigFieldType::Boolean => value.is_boolean(),
            ConfigFieldType::Array => value.is_array(),
            ConfigFieldType::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFieldSchema {
    #[serde(rename = "type")]
    pub field_type: ConfigFieldType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestDependency {
    pub name: String,
    #[serde(rename = "versionReq")]
    pub version_req: String,
}

/// A validated plugin manifest, deserialized from `plugin.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(rename = "hostVersionRange")]
    pub host_version_range: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(rename = "entryPoint")]
    pub entry_point: String,
    #[serde(rename = "extensionPoints", default)]
    pub extension_points: Vec<ExtensionPoint>,
    #[serde(default)]
    pub dependencies: Vec<ManifestDependency>,
    #[serde(rename = "configSchema", default)]
    pub config_schema: HashMap<String, ConfigFieldSchema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub manifest: Option<PluginManifest>,
    pub errors: Vec<ManifestError>,
}

impl ValidationResult {
    fn ok(manifest: PluginManifest) -> Self {
        Self {
            valid: true,
            manifest: Some(manifest),
            errors: Vec::new(),
        }
    }

    fn err(errors: Vec<ManifestError>) -> Self {
        Self {
            valid: false,
            manifest: None,
            errors,
        }
    }

    fn schema_err(message: impl Into<String>) -> Self {
        Self::err(vec![ManifestError::schema(message)])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityResult {
    pub compatible: bool,
    pub required_range: String,
    pub actual_version: String,
    pub message: String,
}

/// Validates plugin manifests and checks host/plugin version compatibility.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestValidator;

impl ManifestValidator {
    const EXTENSION_POINT_TAGS: [&'static str; 5] =
        ["commands", "agents", "hooks", "services", "templates"];
    const CONFIG_FIELD_TYPE_TAGS: [&'static str; 5] =
        ["string", "number", "boolean", "array", "object"];

    pub fn new() -> Self {
        Self
    }

    /// Reads and validates a manifest file from disk.
    ///
    /// A missing file, unreadable file, or malformed JSON all collapse to a
    /// single schema error rather than a list of field errors.
    #[instrument(skip(self))]
    pub fn validate_path(&self, path: &Path) -> ValidationResult {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                return ValidationResult::schema_err(format!(
                    "failed to read manifest at {}: {}",
                    path.display(),
                    e
                ))
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(v) => v,
            Err(e) => {
                return ValidationResult::schema_err(format!("manifest is not valid JSON: {}", e))
            }
        };

        self.validate_value(&value)
    }

    /// Validates an already-parsed manifest value.
    #[instrument(skip(self, value))]
    pub fn validate_value(&self, value: &serde_json::Value) -> ValidationResult {
        if !value.is_object() {
            return ValidationResult::schema_err("manifest must be a JSON object");
        }

        let mut errors = Vec::new();
        self.check_required_string(value, "name", &mut errors);
        self.check_required_string(value, "version", &mut errors);
        self.check_required_string(value, "hostVersionRange", &mut errors);
        self.check_required_string(value, "entryPoint", &mut errors);

        if let Some(version) = value.get("version").and_then(|v| v.as_str()) {
            if Version::parse(version).is_err() {
                errors.push(ManifestError::new(
                    "version",
                    format!("'{}' is not a valid semantic version", version),
                    ManifestErrorCode::InvalidValue,
                ));
            }
        }

        if let Some(range) = value.get("hostVersionRange").and_then(|v| v.as_str()) {
            if VersionReq::parse(range).is_err() {
                errors.push(ManifestError::new(
                    "hostVersionRange",
                    format!("'{}' is not a valid version requirement", range),
                    ManifestErrorCode::InvalidValue,
                ));
            }
        }

        if let Some(deps) = value.get("dependencies").and_then(|v| v.as_array()) {
            for (i, dep) in deps.iter().enumerate() {
                let field = format!("dependencies[{}].versionReq", i);
                match dep.get("versionReq").and_then(|v| v.as_str()) {
                    Some(range) if VersionReq::parse(range).is_err() => {
                        errors.push(ManifestError::new(
                            field,
                            format!("'{}' is not a valid version requirement", range),
                            ManifestErrorCode::InvalidValue,
                        ));
                    }
                    Some(_) => {}
                    None => errors.push(ManifestError::new(
                        field,
                        "is required",
                        ManifestErrorCode::MissingField,
                    )),
                }
            }
        }

        if let Some(points) = value.get("extensionPoints").and_then(|v| v.as_array()) {
            for (i, point) in points.iter().enumerate() {
                match point.as_str() {
                    Some(tag) if Self::EXTENSION_POINT_TAGS.contains(&tag) => {}
                    Some(tag) => errors.push(ManifestError::new(
                        format!("extensionPoints[{}]", i),
                        format!("'{}' is not a recognized extension point", tag),
                        ManifestErrorCode::InvalidValue,
                    )),
                    None => errors.push(ManifestError::new(
                        format!("extensionPoints[{}]", i),
                        "must be a string",
                        ManifestErrorCode::InvalidType,
                    )),
                }
            }
        }

        if let Some(schema) = value.get("configSchema").and_then(|v| v.as_object()) {
            for (key, field_schema) in schema {
                let field = format!("configSchema.{}.type", key);
                match field_schema.get("type").and_then(|v| v.as_str()) {
                    Some(tag) if Self::CONFIG_FIELD_TYPE_TAGS.contains(&tag) => {}
                    Some(tag) => errors.push(ManifestError::new(
                        field,
                        format!("'{}' is not a recognized config field type", tag),
                        ManifestErrorCode::InvalidValue,
                    )),
                    None => errors.push(ManifestError::new(
                        field,
                        "is required",
                        ManifestErrorCode::MissingField,
                    )),
                }
            }
        }

        if !errors.is_empty() {
            debug!(count = errors.len(), "manifest validation failed");
            return ValidationResult::err(errors);
        }

        match serde_json::from_value::<PluginManifest>(value.clone()) {
            Ok(manifest) => ValidationResult::ok(manifest),
            Err(e) => ValidationResult::schema_err(format!("manifest schema error: {}", e)),
        }
    }

    fn check_required_string(
        &self,
        value: &serde_json::Value,
        field: &str,
        errors: &mut Vec<ManifestError>,
    ) {
        match value.get(field) {
            None => errors.push(ManifestError::new(
                field,
                "is required",
                ManifestErrorCode::MissingField,
            )),
            Some(v) if !v.is_string() => errors.push(ManifestError::new(
                field,
                "must be a string",
                ManifestErrorCode::InvalidType,
            )),
            Some(v) if v.as_str().map(str::is_empty).unwrap_or(false) => errors.push(
                ManifestError::new(field, "must not be empty", ManifestErrorCode::InvalidValue),
            ),
            Some(_) => {}
        }
    }

    /// Checks a validated manifest's `hostVersionRange` against the running
    /// host version. Pre-release host versions only satisfy ranges that
    /// themselves carry a pre-release comparator — `semver`'s default
    /// behavior, left intact rather than special-cased.
    #[instrument(skip(self, manifest))]
    pub fn check_compatibility(
        &self,
        manifest: &PluginManifest,
        host_version: &str,
    ) -> CompatibilityResult {
        let required_range = manifest.host_version_range.clone();

        let req = match VersionReq::parse(&required_range) {
            Ok(r) => r,
            Err(e) => {
                return CompatibilityResult {
                    compatible: false,
                    required_range,
                    actual_version: host_version.to_string(),
                    message: format!("invalid hostVersionRange: {}", e),
                }
            }
        };

        let host = match Version::parse(host_version) {
            Ok(v) => v,
            Err(e) => {
                return CompatibilityResult {
                    compatible: false,
                    required_range,
                    actual_version: host_version.to_string(),
                    message: format!("invalid host version '{}': {}", host_version, e),
                }
            }
        };

        let compatible = req.matches(&host);
        let message = if compatible {
            format!("host {} satisfies {}", host, required_range)
        } else {
            format!(
                "host {} does not satisfy required range {}",
                host, required_range
            )
        };

        CompatibilityResult {
            compatible,
            required_range,
            actual_version: host_version.to_string(),
            message,
        }
    }
}
