//! Error types and handling
//!
//! This module provides the domain-specific error taxonomy for the plugin
//! subsystem: schema/validation, compatibility, name conflicts,
//! import/activation failures, dependency resolution, lifecycle, and
//! persistence errors.

use thiserror::Error;

/// Closed set of manifest field-level error codes.
///
/// Kept distinct from "missing" vs "invalid type" because the manifest
/// validator's reported errors differentiate the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ManifestErrorCode {
    MissingField,
    InvalidType,
    InvalidValue,
    SchemaError,
}

/// A single field-level manifest validation error.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ManifestError {
    pub field: String,
    pub message: String,
    pub code: ManifestErrorCode,
}

impl ManifestError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        code: ManifestErrorCode,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }

    /// A schema-level error with no specific field (non-object JSON, parse
    /// failure). Always reported alone, never alongside field errors.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::new("", message, ManifestErrorCode::SchemaError)
    }
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Operational error taxonomy for the registry, loader, adapters, and
/// lifecycle manager.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("manifest invalid: {0}")]
    Manifest(#[from] ManifestErrorList),

    #[error("host version {host} is not compatible with required range {required} ({plugin})")]
    Compatibility {
        plugin: String,
        host: String,
        required: String,
    },

    #[error("name conflict: '{name}' ({kind}) is already registered by '{owner}'")]
    NameConflict {
        name: String,
        kind: &'static str,
        owner: String,
    },

    #[error("failed to import entry point for plugin '{plugin}': {message}")]
    Import { plugin: String, message: String },

    #[error("plugin '{plugin}' failed to activate: {message}")]
    Activation { plugin: String, message: String },

    #[error("service '{0}' is not registered")]
    DependencyUnresolved(String),

    #[error("circular service dependency: {0}")]
    CircularDependency(String),

    #[error("lifecycle operation failed for '{plugin}': {message}")]
    Lifecycle { plugin: String, message: String },

    #[error("agent '{plugin}' invocation timed out: {message}")]
    Timeout { plugin: String, message: String },

    #[error("plugin '{plugin}' not found")]
    NotFound { plugin: String },

    #[error("plugin '{plugin}' is already installed")]
    AlreadyInstalled { plugin: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wrapper so a `Vec<ManifestError>` can participate in `#[from]` conversion
/// into [`PluginError::Manifest`].
#[derive(Debug, Clone)]
pub struct ManifestErrorList(pub Vec<ManifestError>);

impl std::fmt::Display for ManifestErrorList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

impl std::error::Error for ManifestErrorList {}

/// Convenience type alias for Results with [`PluginError`].
pub type Result<T> = std::result::Result<T, PluginError>;
