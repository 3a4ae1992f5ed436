//! Lifecycle manager: the single entry point for installing, removing, and
//! otherwise administering plugins.

use crate::config::ConfigStore;
use crate::errors::PluginError;
use crate::manifest::{ExtensionPoint, ManifestValidator, PluginManifest, ValidationResult};
use crate::registry::Registry;
use crate::state::{PluginSource, PluginStateEntry, PluginStateFile, StateStore};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A single row of `Manager::list`'s output: persisted install state joined
/// with the plugin's current on-disk manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginListEntry {
    pub name: String,
    pub version: String,
    pub enabled: bool,
    pub extension_points: Vec<ExtensionPoint>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The external collaborator that fetches, removes, and updates plugin
/// packages on disk. Kept as a trait object so the CLI binary's subprocess
/// implementation can be swapped for a test double.
#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn install(&self, target: &str, dest: &Path) -> std::io::Result<ProcessOutput>;
    async fn uninstall(&self, dest: &Path) -> std::io::Result<ProcessOutput>;
    async fn update(&self, target: &str, dest: &Path) -> std::io::Result<ProcessOutput>;
    async fn version_probe(&self) -> std::io::Result<ProcessOutput>;
}

/// Wraps an external package-manager CLI (e.g. a registry-aware fetch tool)
/// as a subprocess, translating a non-zero exit code into a structured
/// `ProcessOutput` rather than a panic.
pub struct CliPackageManager {
    program: String,
}

impl CliPackageManager {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> std::io::Result<ProcessOutput> {
        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .output()
            .await?;

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[async_trait]
impl PackageManager for CliPackageManager {
    async fn install(&self, target: &str, dest: &Path) -> std::io::Result<ProcessOutput> {
        self.run(&["install", target, "--dest", &dest.to_string_lossy()])
            .await
    }

    async fn uninstall(&self, dest: &Path) -> std::io::Result<ProcessOutput> {
        self.run(&["uninstall", &dest.to_string_lossy()]).await
    }

    async fn update(&self, target: &str, dest: &Path) -> std::io::Result<ProcessOutput> {
        self.run(&["update", target, "--dest", &dest.to_string_lossy()])
            .await
    }

    async fn version_probe(&self) -> std::io::Result<ProcessOutput> {
        self.run(&["--version"]).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InstallPhase {
    Downloading,
    Validating,
    Activating,
    Complete,
}

pub type ProgressCallback = Arc<dyn Fn(InstallPhase) + Send + Sync>;

pub struct Manager {
    package_manager: Arc<dyn PackageManager>,
    state_store: StateStore,
    validator: ManifestValidator,
    install_root: PathBuf,
    config_store: ConfigStore,
    registry: Arc<Registry>,
}

impl Manager {
    /// `registry` is the live, in-process extension registry, shared with a
    /// `Loader` if one is running in this process. A CLI invocation that
    /// manages plugins without also hosting them passes a fresh, empty
    /// `Registry`: `unregister_plugin` on a name nothing ever registered is
    /// a no-op, so the deregister-on-uninstall/disable contract still holds
    /// for embedders that keep Manager and Loader alive in the same process.
    pub fn new(
        package_manager: Arc<dyn PackageManager>,
        state_store: StateStore,
        install_root: PathBuf,
        config_store: ConfigStore,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            package_manager,
            state_store,
            validator: ManifestValidator::new(),
            install_root,
            config_store,
            registry,
        }
    }

    fn plugin_dir(&self, name: &str) -> PathBuf {
        self.install_root.join(name)
    }

    /// Installs a plugin, validating its manifest after download and
    /// rolling back (uninstalling) on manifest or compatibility failure.
    #[instrument(skip(self, progress))]
    pub async fn install(
        &self,
        target: &str,
        host_version: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<PluginManifest, PluginError> {
        let notify = |phase: InstallPhase| {
            if let Some(cb) = &progress {
                cb(phase);
            }
        };

        let probe = self
            .package_manager
            .version_probe()
            .await
            .map_err(PluginError::Io)?;
        if !probe.success() {
            return Err(PluginError::Lifecycle {
                plugin: target.to_string(),
                message: "package manager is not available".to_string(),
            });
        }

        notify(InstallPhase::Downloading);
        let dest = self.plugin_dir(target);
        let output = self
            .package_manager
            .install(target, &dest)
            .await
            .map_err(PluginError::Io)?;
        if !output.success() {
            return Err(PluginError::Lifecycle {
                plugin: target.to_string(),
                message: format!("install failed: {}", output.stderr),
            });
        }

        notify(InstallPhase::Validating);
        let manifest_path = dest.join("plugin.json");
        let validation = self.validator.validate_path(&manifest_path);
        let manifest = match self.validate_or_rollback(&dest, target, validation).await? {
            Some(m) => m,
            None => unreachable!("validate_or_rollback returns Err on failure"),
        };

        let compatibility = self.validator.check_compatibility(&manifest, host_version);
        if !compatibility.compatible {
            self.rollback(&dest).await;
            return Err(PluginError::Compatibility {
                plugin: manifest.name.clone(),
                host: host_version.to_string(),
                required: manifest.host_version_range.clone(),
            });
        }

        notify(InstallPhase::Activating);
        let mut state = self.state_store.read()?;
        state.plugins.insert(
            manifest.name.clone(),
            PluginStateEntry {
                version: manifest.version.clone(),
                enabled: true,
                installed_at: Utc::now(),
                updated_at: Utc::now(),
                source: PluginSource::Registry,
                local_path: Some(dest.clone()),
            },
        );
        self.state_store.write(&state)?;

        notify(InstallPhase::Complete);
        info!(plugin = %manifest.name, "plugin installed");
        Ok(manifest)
    }

    async fn validate_or_rollback(
        &self,
        dest: &Path,
        target: &str,
        validation: ValidationResult,
    ) -> Result<Option<PluginManifest>, PluginError> {
        match validation.manifest {
            Some(manifest) => Ok(Some(manifest)),
            None => {
                self.rollback(dest).await;
                let message = validation
                    .errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(PluginError::Lifecycle {
                    plugin: target.to_string(),
                    message,
                })
            }
        }
    }

    async fn rollback(&self, dest: &Path) {
        warn!(dest = %dest.display(), "rolling back failed install");
        let _ = self.package_manager.uninstall(dest).await;
    }

    /// Deregisters the plugin from the live registry — disposing any
    /// instantiated services and removing its commands/agents/hooks/
    /// templates — before shelling out to remove it from disk. A no-op if
    /// this plugin was never loaded into this process's registry.
    #[instrument(skip(self))]
    pub async fn uninstall(&self, name: &str) -> Result<(), PluginError> {
        let state = self.state_store.read()?;
        if !state.plugins.contains_key(name) {
            return Err(PluginError::NotFound {
                plugin: name.to_string(),
            });
        }
        drop(state);

        self.registry.unregister_plugin(name);

        let dest = self.plugin_dir(name);
        let output = self
            .package_manager
            .uninstall(&dest)
            .await
            .map_err(PluginError::Io)?;
        if !output.success() {
            return Err(PluginError::Lifecycle {
                plugin: name.to_string(),
                message: format!("uninstall failed: {}", output.stderr),
            });
        }

        let mut state = self.state_store.read()?;
        state.plugins.shift_remove(name);
        self.state_store.write(&state)?;

        let config_dir = self.config_store.plugin_dir(name);
        let _ = std::fs::remove_dir_all(&config_dir);

        info!(plugin = name, "plugin uninstalled");
        Ok(())
    }

    /// Updates a plugin in place. On post-update invalidity, the update is
    /// reported as failed but is explicitly *not* rolled back — see
    /// DESIGN.md for why this mirrors the install path's rollback instead
    /// of silently reversing a partially-applied update.
    #[instrument(skip(self))]
    pub async fn update(&self, name: &str, host_version: &str) -> Result<PluginManifest, PluginError> {
        let dest = self.plugin_dir(name);
        let output = self
            .package_manager
            .update(name, &dest)
            .await
            .map_err(PluginError::Io)?;
        if !output.success() {
            return Err(PluginError::Lifecycle {
                plugin: name.to_string(),
                message: format!("update failed: {}", output.stderr),
            });
        }

        let manifest_path = dest.join("plugin.json");
        let validation = self.validator.validate_path(&manifest_path);
        let manifest = validation.manifest.ok_or_else(|| {
            let message = validation
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            PluginError::Lifecycle {
                plugin: name.to_string(),
                message,
            }
        })?;

        let compatibility = self.validator.check_compatibility(&manifest, host_version);
        if !compatibility.compatible {
            return Err(PluginError::Compatibility {
                plugin: manifest.name.clone(),
                host: host_version.to_string(),
                required: manifest.host_version_range.clone(),
            });
        }

        let mut state = self.state_store.read()?;
        if let Some(entry) = state.plugins.get_mut(name) {
            entry.version = manifest.version.clone();
            entry.updated_at = Utc::now();
        }
        self.state_store.write(&state)?;
        info!(plugin = name, version = %manifest.version, "plugin updated");
        Ok(manifest)
    }

    #[instrument(skip(self))]
    pub fn enable(&self, name: &str) -> Result<(), PluginError> {
        self.set_enabled(name, true)
    }

    /// Disables a plugin: flips its state entry and deregisters it from the
    /// live registry immediately (a no-op if it was never loaded in this
    /// process). Warns, but does not block, if another installed plugin's
    /// on-disk manifest declares `name` as a dependency.
    #[instrument(skip(self))]
    pub fn disable(&self, name: &str) -> Result<(), PluginError> {
        let state = self.state_store.read()?;
        let dependents: Vec<String> = state
            .plugins
            .keys()
            .filter(|other| *other != name)
            .filter(|other| {
                let manifest_path = self.plugin_dir(other).join("plugin.json");
                self.validator
                    .validate_path(&manifest_path)
                    .manifest
                    .map(|m| m.dependencies.iter().any(|d| d.name == name))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if !dependents.is_empty() {
            warn!(
                plugin = name,
                dependents = dependents.join(", "),
                "disabling a plugin other installed plugins depend on"
            );
        }
        self.set_enabled(name, false)?;
        self.registry.unregister_plugin(name);
        Ok(())
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), PluginError> {
        let mut state = self.state_store.read()?;
        let entry = state
            .plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotFound {
                plugin: name.to_string(),
            })?;
        entry.enabled = enabled;
        entry.updated_at = Utc::now();
        self.state_store.write(&state)?;
        Ok(())
    }

    /// The raw persisted state file: install metadata, enabled flags, and
    /// on-disk locations, with no manifest data joined in. Internal
    /// consumers that need `local_path`/`source` (e.g. resolving a plugin's
    /// manifest path) read this instead of `list`.
    pub fn state(&self) -> Result<PluginStateFile, PluginError> {
        self.state_store.read()
    }

    /// The installed-plugin listing for `weave plugin list`: each state
    /// entry joined with its on-disk manifest, so `extensionPoints` and
    /// `description` reflect the plugin's current manifest rather than what
    /// was recorded at install time. A plugin whose manifest no longer
    /// validates is still listed, with empty/absent manifest-derived fields.
    pub fn list(&self) -> Result<Vec<PluginListEntry>, PluginError> {
        let state = self.state_store.read()?;
        let mut entries: Vec<PluginListEntry> = state
            .plugins
            .iter()
            .map(|(name, entry)| {
                let manifest_path = self.plugin_dir(name).join("plugin.json");
                let manifest = self.validator.validate_path(&manifest_path).manifest;
                PluginListEntry {
                    name: name.clone(),
                    version: entry.version.clone(),
                    enabled: entry.enabled,
                    extension_points: manifest
                        .as_ref()
                        .map(|m| m.extension_points.clone())
                        .unwrap_or_default(),
                    description: manifest.and_then(|m| m.description),
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Queries the network registry for plugins matching `query`. Network
    /// failures degrade to an empty result rather than propagating, per the
    /// never-throws contract for discovery operations.
    #[instrument(skip(self, client))]
    pub async fn search(&self, client: &reqwest::Client, registry_url: &str, query: &str) -> Vec<serde_json::Value> {
        let url = format!("{}/search?q={}", registry_url, query);
        match client.get(&url).send().await {
            Ok(resp) => resp.json::<Vec<serde_json::Value>>().await.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "plugin search request failed, returning empty results");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self, client))]
    pub async fn info(
        &self,
        client: &reqwest::Client,
        registry_url: &str,
        name: &str,
    ) -> Option<serde_json::Value> {
        let url = format!("{}/plugins/{}", registry_url, name);
        match client.get(&url).send().await {
            Ok(resp) => resp.json::<serde_json::Value>().await.ok(),
            Err(e) => {
                warn!(error = %e, "plugin info request failed");
                None
            }
        }
    }

    pub fn get_config(
        &self,
        name: &str,
        manifest: &PluginManifest,
        key: Option<&str>,
    ) -> Result<serde_json::Value, PluginError> {
        self.config_store.read(name, &manifest.config_schema, key)
    }

    pub fn set_config(
        &self,
        name: &str,
        manifest: &PluginManifest,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), PluginError> {
        self.config_store.write(name, key, value, &manifest.config_schema)
    }

    /// Scaffolds a buildable plugin skeleton at `dir`: a package manifest, a
    /// plugin manifest, a build-config, and an entry-point source file whose
    /// `activate` logs `"<name> activated"` and registers nothing else.
    /// Returns the paths of everything it wrote, for `weave plugin
    /// scaffold` to report back to the caller.
    #[instrument(skip(self))]
    pub fn scaffold(&self, name: &str, dir: &Path) -> Result<Vec<PathBuf>, PluginError> {
        std::fs::create_dir_all(dir)?;
        std::fs::create_dir_all(dir.join("src"))?;

        let crate_name = name.replace(['-', ' '], "_").to_lowercase();
        let mut created = Vec::new();

        let cargo_toml = format!(
            "[package]\n\
             name = \"{name}\"\n\
             version = \"0.1.0\"\n\
             edition = \"2021\"\n\
             \n\
             [lib]\n\
             crate-type = [\"cdylib\"]\n\
             \n\
             [dependencies]\n\
             weave-core = \"0.1\"\n",
            name = name,
        );
        let cargo_toml_path = dir.join("Cargo.toml");
        std::fs::write(&cargo_toml_path, cargo_toml)?;
        created.push(cargo_toml_path);

        let manifest = serde_json::json!({
            "name": name,
            "version": "0.1.0",
            "hostVersionRange": "*",
            "entryPoint": format!("lib{}.so", crate_name),
            "extensionPoints": [],
        });
        let manifest_path = dir.join("plugin.json");
        std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
        created.push(manifest_path);

        let build_config = serde_json::json!({
            "target": "cdylib",
            "profile": "release",
        });
        let build_config_path = dir.join("weave-build.json");
        std::fs::write(&build_config_path, serde_json::to_string_pretty(&build_config)?)?;
        created.push(build_config_path);

        let lib_rs = format!(
            "use weave_core::api::Plugin;\n\
             use weave_core::context::PluginContext;\n\
             use weave_core::errors::PluginError;\n\
             \n\
             struct ScaffoldedPlugin;\n\
             \n\
             impl Plugin for ScaffoldedPlugin {{\n\
             \x20\x20\x20\x20fn name(&self) -> &str {{\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\"{name}\"\n\
             \x20\x20\x20\x20}}\n\
             \n\
             \x20\x20\x20\x20fn activate(&self, ctx: &PluginContext) -> Result<(), PluginError> {{\n\
             \x20\x20\x20\x20\x20\x20\x20\x20ctx.log(tracing::Level::INFO, \"{name} activated\");\n\
             \x20\x20\x20\x20\x20\x20\x20\x20Ok(())\n\
             \x20\x20\x20\x20}}\n\
             }}\n\
             \n\
             weave_core::export_plugin!(ScaffoldedPlugin);\n",
            name = name,
        );
        let lib_rs_path = dir.join("src").join("lib.rs");
        std::fs::write(&lib_rs_path, lib_rs)?;
        created.push(lib_rs_path);

        info!(plugin = name, dir = %dir.display(), "scaffolded plugin skeleton");
        Ok(created)
    }

    /// Validates a manifest and, if that passes, probes its declared entry
    /// point: the file must exist and load as a dynamic library exporting a
    /// constructible plugin. `activate` is never called.
    pub fn validate(&self, path: &Path) -> ValidationResult {
        let result = self.validator.validate_path(path);
        let Some(manifest) = &result.manifest else {
            return result;
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let entry_path = dir.join(&manifest.entry_point);
        if let Err(message) = crate::loader::probe_entry_point(&entry_path) {
            return ValidationResult {
                valid: false,
                manifest: None,
                errors: vec![crate::errors::ManifestError::new(
                    "entryPoint",
                    message,
                    crate::errors::ManifestErrorCode::InvalidValue,
                )],
            };
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FakePackageManager {
        succeed: bool,
        probe_fails: bool,
    }

    #[async_trait]
    impl PackageManager for FakePackageManager {
        async fn install(&self, _target: &str, dest: &Path) -> std::io::Result<ProcessOutput> {
            if self.succeed {
                std::fs::create_dir_all(dest)?;
                std::fs::write(
                    dest.join("plugin.json"),
                    serde_json::json!({
                        "name": "sample",
                        "version": "1.0.0",
                        "hostVersionRange": "*",
                        "entryPoint": "libsample.so",
                    })
                    .to_string(),
                )?;
            }
            Ok(ProcessOutput {
                exit_code: if self.succeed { 0 } else { 1 },
                stdout: String::new(),
                stderr: if self.succeed { String::new() } else { "boom".to_string() },
            })
        }

        async fn uninstall(&self, dest: &Path) -> std::io::Result<ProcessOutput> {
            let _ = std::fs::remove_dir_all(dest);
            Ok(ProcessOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }

        async fn update(&self, _target: &str, _dest: &Path) -> std::io::Result<ProcessOutput> {
            Ok(ProcessOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }

        async fn version_probe(&self) -> std::io::Result<ProcessOutput> {
            if self.probe_fails {
                return Ok(ProcessOutput {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: "not found".to_string(),
                });
            }
            Ok(ProcessOutput {
                exit_code: 0,
                stdout: "1.0.0".to_string(),
                stderr: String::new(),
            })
        }
    }

    fn manager(succeed: bool, tmp: &TempDir) -> Manager {
        Manager::new(
            Arc::new(FakePackageManager {
                succeed,
                probe_fails: false,
            }),
            StateStore::new(tmp.path().join("state.json")),
            tmp.path().join("plugins"),
            ConfigStore::new(tmp.path().join("config")),
            Arc::new(Registry::new(
                std::collections::HashSet::new(),
                std::collections::HashSet::new(),
                std::collections::HashSet::new(),
            )),
        )
    }

    #[tokio::test]
    async fn successful_install_records_state() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(true, &tmp);
        let manifest = mgr.install("sample", "1.0.0", None).await.unwrap();
        assert_eq!(manifest.name, "sample");

        let state = mgr.state().unwrap();
        assert!(state.plugins.contains_key("sample"));
    }

    #[tokio::test]
    async fn failed_install_does_not_record_state() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(false, &tmp);
        let result = mgr.install("sample", "1.0.0", None).await;
        assert!(result.is_err());

        let state = mgr.state().unwrap();
        assert!(state.plugins.is_empty());
    }

    #[tokio::test]
    async fn uninstall_removes_state_entry() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(true, &tmp);
        mgr.install("sample", "1.0.0", None).await.unwrap();
        mgr.uninstall("sample").await.unwrap();

        let state = mgr.state().unwrap();
        assert!(!state.plugins.contains_key("sample"));
    }

    #[tokio::test]
    async fn disable_then_enable_round_trips() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(true, &tmp);
        mgr.install("sample", "1.0.0", None).await.unwrap();

        mgr.disable("sample").unwrap();
        assert!(!mgr.state().unwrap().plugins["sample"].enabled);

        mgr.enable("sample").unwrap();
        assert!(mgr.state().unwrap().plugins["sample"].enabled);
    }

    #[tokio::test]
    async fn uninstall_of_unknown_plugin_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(true, &tmp);
        let err = mgr.uninstall("never-installed").await.unwrap_err();
        assert!(matches!(err, PluginError::NotFound { .. }));
    }

    #[tokio::test]
    async fn install_fails_when_package_manager_unavailable() {
        let tmp = TempDir::new().unwrap();
        let mgr = Manager::new(
            Arc::new(FakePackageManager {
                succeed: true,
                probe_fails: true,
            }),
            StateStore::new(tmp.path().join("state.json")),
            tmp.path().join("plugins"),
            ConfigStore::new(tmp.path().join("config")),
            Arc::new(Registry::new(
                std::collections::HashSet::new(),
                std::collections::HashSet::new(),
                std::collections::HashSet::new(),
            )),
        );
        let result = mgr.install("sample", "1.0.0", None).await;
        assert!(result.is_err());
        assert!(mgr.state().unwrap().plugins.is_empty());
    }

    #[tokio::test]
    async fn scaffold_writes_four_artifacts_and_returns_their_paths() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(true, &tmp);
        let plugin_dir = tmp.path().join("new-plugin");

        let created = mgr.scaffold("new-plugin", &plugin_dir).unwrap();

        assert_eq!(created.len(), 4);
        for path in &created {
            assert!(path.exists(), "{} should have been written", path.display());
        }
        assert!(created.contains(&plugin_dir.join("Cargo.toml")));
        assert!(created.contains(&plugin_dir.join("plugin.json")));
        assert!(created.contains(&plugin_dir.join("weave-build.json")));
        assert!(created.contains(&plugin_dir.join("src").join("lib.rs")));

        let lib_rs = std::fs::read_to_string(plugin_dir.join("src/lib.rs")).unwrap();
        assert!(lib_rs.contains("new-plugin activated"));
        assert!(lib_rs.contains("export_plugin!"));

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(plugin_dir.join("plugin.json")).unwrap()).unwrap();
        assert_eq!(manifest["name"], "new-plugin");
    }

    #[tokio::test]
    async fn list_joins_state_with_on_disk_manifest() {
        let tmp = TempDir::new().unwrap();
        let mgr = manager(true, &tmp);
        mgr.install("sample", "1.0.0", None).await.unwrap();

        let manifest_path = tmp.path().join("plugins").join("sample").join("plugin.json");
        std::fs::write(
            &manifest_path,
            serde_json::json!({
                "name": "sample",
                "version": "1.0.0",
                "hostVersionRange": "*",
                "entryPoint": "libsample.so",
                "description": "a sample plugin",
                "extensionPoints": ["commands"],
            })
            .to_string(),
        )
        .unwrap();

        let entries = mgr.list().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.name, "sample");
        assert_eq!(entry.description.as_deref(), Some("a sample plugin"));
        assert_eq!(entry.extension_points, vec![ExtensionPoint::Commands]);
        assert!(entry.enabled);
    }
}
