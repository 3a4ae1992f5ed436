//! Discovers, validates, and activates plugins from shared libraries on
//! disk.
//!
//! Each plugin ships a dynamic library (`.so`/`.dylib`/`.dll`) exporting a
//! single C-ABI constructor symbol. Loading one is the idiomatic Rust
//! analogue of the dynamic-import step a scripting-language host would
//! perform: `libloading::Library::new` maps the shared object, a versioned
//! symbol lookup hands back a boxed [`Plugin`](crate::api::Plugin), and the
//! `Library` is kept alive for as long as the plugin is registered so the
//! mapping isn't unloaded out from under live trait objects.

use crate::api::Plugin;
use crate::config::ConfigStore;
use crate::context::PluginContext;
use crate::errors::PluginError;
use crate::manifest::{ManifestValidator, PluginManifest};
use crate::registry::Registry;
use libloading::{Library, Symbol};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// The symbol every plugin shared library must export.
///
/// Signature: `extern "C" fn() -> *mut dyn Plugin` is not FFI-safe for trait
/// objects, so the boundary instead returns an opaque raw pointer to a
/// `Box<Box<dyn Plugin>>`, which the loader reconstructs and unboxes.
pub const PLUGIN_ENTRY_SYMBOL: &[u8] = b"_weave_plugin_entry\0";

type PluginEntryFn = unsafe extern "C" fn() -> *mut Box<dyn Plugin>;

/// Distinguishes "no config entry yet, so load everything" from "the user
/// explicitly disabled everything" — both serialize to an empty set on
/// disk, but they mean opposite things to the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnabledSet {
    Unconfigured,
    Explicit(HashSet<String>),
}

impl EnabledSet {
    fn permits(&self, name: &str) -> bool {
        match self {
            EnabledSet::Unconfigured => true,
            EnabledSet::Explicit(set) => set.contains(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub install_dirs: Vec<PathBuf>,
    pub install_root: PathBuf,
    pub config_root: PathBuf,
    pub host_version: String,
    pub enabled: EnabledSet,
    pub dev_mode: bool,
    pub project_config: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadPhase {
    Discovery,
    Validation,
    Import,
    Activation,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadError {
    pub plugin: String,
    pub phase: LoadPhase,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedPluginSummary {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedPlugin {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub loaded: Vec<LoadedPluginSummary>,
    pub skipped: Vec<SkippedPlugin>,
    pub errors: Vec<LoadError>,
}

/// A successfully activated plugin: its manifest, the shared library kept
/// alive for the plugin's lifetime, and the boxed implementation itself.
struct LoadedPlugin {
    manifest: PluginManifest,
    path: PathBuf,
    _library: Library,
    plugin: Box<dyn Plugin>,
}

/// A single armed watch on one plugin's directory. Dropping or `close`-ing
/// it stops delivery of further change events.
pub trait PluginWatcher: Send + Sync {
    fn close(&self);
}

/// Obtains a watcher for a plugin's directory, narrowly scoped to that
/// directory — the loader itself never watches the global installation
/// root. Injected so tests can supply a fake that never fires.
pub trait WatcherFactory: Send + Sync {
    fn watch(
        &self,
        dir: &Path,
        on_change: Box<dyn Fn() + Send + Sync>,
    ) -> Result<Box<dyn PluginWatcher>, String>;
}

struct NotifyPluginWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl PluginWatcher for NotifyPluginWatcher {
    fn close(&self) {}
}

/// The default watcher factory, backed by the `notify` crate's
/// platform-native backend (inotify/FSEvents/ReadDirectoryChangesW).
pub struct NotifyWatcherFactory;

impl WatcherFactory for NotifyWatcherFactory {
    fn watch(
        &self,
        dir: &Path,
        on_change: Box<dyn Fn() + Send + Sync>,
    ) -> Result<Box<dyn PluginWatcher>, String> {
        use notify::{Event, RecursiveMode, Watcher};

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if res.is_ok() {
                on_change();
            }
        })
        .map_err(|e| e.to_string())?;
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| e.to_string())?;
        Ok(Box::new(NotifyPluginWatcher { _watcher: watcher }))
    }
}

pub struct Loader {
    config: LoaderConfig,
    validator: ManifestValidator,
    registry: Arc<Registry>,
    config_store: ConfigStore,
    loaded: Mutex<HashMap<String, LoadedPlugin>>,
    reload_counts: Mutex<HashMap<String, u32>>,
    watcher_factory: Arc<dyn WatcherFactory>,
    watchers: Mutex<HashMap<String, Box<dyn PluginWatcher>>>,
    pending_reloads: Arc<Mutex<VecDeque<String>>>,
}

const RELOAD_WARN_THRESHOLD: u32 = 10;

impl Loader {
    pub fn new(config: LoaderConfig, registry: Arc<Registry>) -> Self {
        Self::with_watcher_factory(config, registry, Arc::new(NotifyWatcherFactory))
    }

    pub fn with_watcher_factory(
        config: LoaderConfig,
        registry: Arc<Registry>,
        watcher_factory: Arc<dyn WatcherFactory>,
    ) -> Self {
        let config_store = ConfigStore::new(config.config_root.clone());
        Self {
            config,
            validator: ManifestValidator::new(),
            registry,
            config_store,
            loaded: Mutex::new(HashMap::new()),
            reload_counts: Mutex::new(HashMap::new()),
            watcher_factory,
            watchers: Mutex::new(HashMap::new()),
            pending_reloads: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Drains and returns the names of plugins whose watched directory
    /// changed since the last drain. The host is expected to poll this and
    /// call [`Loader::reload_plugin`] for each name, per the cooperative
    /// scheduling model — the watcher callback only enqueues, it never
    /// reloads directly.
    pub fn drain_pending_reloads(&self) -> Vec<String> {
        let mut pending = self.pending_reloads.lock().expect("loader lock poisoned");
        pending.drain(..).collect()
    }

    /// Discovers every candidate directory under `install_dirs`, then runs
    /// each through the eight-step load procedure: discover manifest,
    /// validate it, check compatibility, check the enabled set, copy the
    /// library to a load-unique temp path (dev-mode cache-busting), import
    /// the entry symbol, construct a `PluginContext`, and activate.
    pub async fn load_plugins(&self) -> LoadReport {
        let mut report = LoadReport::default();
        let candidates = self.discover_candidates();

        for dir in candidates {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            match self.load_one(&dir).await {
                Ok(summary) => report.loaded.push(summary),
                Err(LoadOutcome::Skipped(reason)) => {
                    report.skipped.push(SkippedPlugin { name, reason });
                }
                Err(LoadOutcome::Failed(err)) => report.errors.push(err),
            }
        }

        info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            "plugin load pass complete"
        );
        report
    }

    fn discover_candidates(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for root in &self.config.install_dirs {
            let Ok(entries) = std::fs::read_dir(root) else {
                continue;
            };
            for entry in entries.flatten() {
                if entry.path().is_dir() {
                    dirs.push(entry.path());
                }
            }
        }
        dirs
    }

    async fn load_one(&self, dir: &Path) -> Result<LoadedPluginSummary, LoadOutcome> {
        let manifest_path = dir.join("plugin.json");
        if !manifest_path.exists() {
            return Err(LoadOutcome::Skipped("no plugin.json found".to_string()));
        }

        let name_hint = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let validation = self.validator.validate_path(&manifest_path);
        let manifest = match validation.manifest {
            Some(m) => m,
            None => {
                let message = validation
                    .errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(LoadOutcome::Failed(LoadError {
                    plugin: name_hint,
                    phase: LoadPhase::Validation,
                    message,
                }));
            }
        };

        if !self.config.enabled.permits(&manifest.name) {
            return Err(LoadOutcome::Skipped("disabled".to_string()));
        }

        let compatibility = self
            .validator
            .check_compatibility(&manifest, &self.config.host_version);
        if !compatibility.compatible {
            return Err(LoadOutcome::Skipped(compatibility.message));
        }

        let library_path = dir.join(&manifest.entry_point);
        let (library, plugin) = match self.import(&library_path) {
            Ok(pair) => pair,
            Err(message) => {
                return Err(LoadOutcome::Failed(LoadError {
                    plugin: manifest.name.clone(),
                    phase: LoadPhase::Import,
                    message,
                }))
            }
        };

        let merged_config = self
            .config_store
            .read(&manifest.name, &manifest.config_schema, None)
            .unwrap_or(serde_json::Value::Null);

        let ctx = PluginContext::new(
            manifest.name.clone(),
            manifest.version.clone(),
            self.config.host_version.clone(),
            merged_config,
            self.config.project_config.clone(),
            self.registry.clone(),
        );

        let activation = catch_unwind(AssertUnwindSafe(|| plugin.activate(&ctx)));
        match activation {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.registry.unregister_plugin(&manifest.name);
                return Err(LoadOutcome::Failed(LoadError {
                    plugin: manifest.name.clone(),
                    phase: LoadPhase::Activation,
                    message: e.to_string(),
                }));
            }
            Err(panic) => {
                self.registry.unregister_plugin(&manifest.name);
                let message = panic_message(panic);
                error!(plugin = %manifest.name, message, "plugin activation panicked");
                return Err(LoadOutcome::Failed(LoadError {
                    plugin: manifest.name.clone(),
                    phase: LoadPhase::Activation,
                    message,
                }));
            }
        }

        let summary = LoadedPluginSummary {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            path: dir.to_path_buf(),
        };

        let mut loaded = self.loaded.lock().expect("loader lock poisoned");
        loaded.insert(
            manifest.name.clone(),
            LoadedPlugin {
                manifest,
                path: dir.to_path_buf(),
                _library: library,
                plugin,
            },
        );

        if self.config.dev_mode {
            let name = summary.name.clone();
            let pending = self.pending_reloads.clone();
            match self.watcher_factory.watch(
                dir,
                Box::new(move || {
                    pending.lock().expect("loader lock poisoned").push_back(name.clone());
                }),
            ) {
                Ok(watcher) => {
                    self.watchers
                        .lock()
                        .expect("loader lock poisoned")
                        .insert(summary.name.clone(), watcher);
                    debug!(plugin = %summary.name, "dev-mode watcher armed for plugin");
                }
                Err(message) => {
                    warn!(plugin = %summary.name, message, "failed to arm dev-mode watcher");
                }
            }
        }

        Ok(summary)
    }

    /// Maps the shared library and resolves its entry symbol. In dev mode,
    /// the library is first copied to a uniquely-named temp path: the OS
    /// dynamic linker, not a language-level module cache, is what would
    /// otherwise keep serving a stale mapping across reloads.
    fn import(&self, path: &Path) -> Result<(Library, Box<dyn Plugin>), String> {
        let load_path = if self.config.dev_mode {
            self.cache_busted_copy(path).map_err(|e| e.to_string())?
        } else {
            path.to_path_buf()
        };

        unsafe {
            let library = Library::new(&load_path)
                .map_err(|e| format!("failed to load library {}: {}", load_path.display(), e))?;
            let entry: Symbol<PluginEntryFn> = library
                .get(PLUGIN_ENTRY_SYMBOL)
                .map_err(|e| format!("missing entry symbol: {}", e))?;
            let raw = entry();
            if raw.is_null() {
                return Err("plugin entry point returned null".to_string());
            }
            let plugin = *Box::from_raw(raw);
            Ok((library, plugin))
        }
    }

    fn cache_busted_copy(&self, path: &Path) -> std::io::Result<PathBuf> {
        let unique = format!(
            "{}-{}.reload",
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            std::process::id()
        );
        let dest = std::env::temp_dir().join(unique);
        std::fs::copy(path, &dest)?;
        Ok(dest)
    }

    /// Re-imports and re-activates a plugin already loaded once, for
    /// dev-mode hot reload. Logs a warning once a single plugin has been
    /// reloaded more than ten times, per the observable reload contract.
    pub async fn reload_plugin(&self, name: &str) -> Result<(), PluginError> {
        let dir = {
            let loaded = self.loaded.lock().expect("loader lock poisoned");
            loaded
                .get(name)
                .map(|p| p.path.clone())
                .ok_or_else(|| PluginError::NotFound {
                    plugin: name.to_string(),
                })?
        };

        self.close_watcher(name);
        self.registry.unregister_plugin(name);
        {
            let mut loaded = self.loaded.lock().expect("loader lock poisoned");
            loaded.remove(name);
        }

        let mut counts = self.reload_counts.lock().expect("loader lock poisoned");
        let count = counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        if *count > RELOAD_WARN_THRESHOLD {
            warn!(plugin = name, count = *count, "plugin reloaded more than 10 times");
        }
        drop(counts);

        self.load_one(&dir).await.map_err(|outcome| match outcome {
            LoadOutcome::Skipped(reason) => PluginError::Lifecycle {
                plugin: name.to_string(),
                message: reason,
            },
            LoadOutcome::Failed(err) => PluginError::Lifecycle {
                plugin: name.to_string(),
                message: err.message,
            },
        })?;
        Ok(())
    }

    pub fn unload_plugin(&self, name: &str) {
        self.close_watcher(name);
        self.registry.unregister_plugin(name);
        let mut loaded = self.loaded.lock().expect("loader lock poisoned");
        loaded.remove(name);
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.lock().expect("loader lock poisoned").contains_key(name)
    }

    fn close_watcher(&self, name: &str) {
        if let Some(watcher) = self.watchers.lock().expect("loader lock poisoned").remove(name) {
            watcher.close();
        }
    }
}

enum LoadOutcome {
    Skipped(String),
    Failed(LoadError),
}

/// Probes a plugin's entry-point library without activating it: confirms
/// the file exists, the dynamic library loads, and its entry symbol
/// resolves to a constructible [`Plugin`]. Returns the plugin's own
/// reported name on success. Used by `Manager::validate` and `weave plugin
/// validate` — it deliberately never calls `activate`, since a bare
/// validation pass shouldn't have the side effects a real activation would.
pub fn probe_entry_point(library_path: &Path) -> Result<String, String> {
    if !library_path.exists() {
        return Err(format!(
            "entry point not found at {}",
            library_path.display()
        ));
    }

    unsafe {
        let library = Library::new(library_path)
            .map_err(|e| format!("failed to load library {}: {}", library_path.display(), e))?;
        let entry: Symbol<PluginEntryFn> = library
            .get(PLUGIN_ENTRY_SYMBOL)
            .map_err(|e| format!("missing entry symbol: {}", e))?;
        let raw = entry();
        if raw.is_null() {
            return Err("plugin entry point returned null".to_string());
        }
        let plugin = *Box::from_raw(raw);
        Ok(plugin.name().to_string())
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "plugin panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unconfigured_enabled_set_permits_everything() {
        let set = EnabledSet::Unconfigured;
        assert!(set.permits("anything"));
    }

    #[test]
    fn explicit_empty_enabled_set_permits_nothing() {
        let set = EnabledSet::Explicit(HashSet::new());
        assert!(!set.permits("anything"));
    }

    #[test]
    fn explicit_enabled_set_permits_named_plugins_only() {
        let mut names = HashSet::new();
        names.insert("formatter".to_string());
        let set = EnabledSet::Explicit(names);
        assert!(set.permits("formatter"));
        assert!(!set.permits("linter"));
    }

    #[tokio::test]
    async fn missing_manifest_directory_is_skipped_not_errored() {
        let tmp = tempfile::tempdir().unwrap();
        let plugin_dir = tmp.path().join("empty-plugin");
        std::fs::create_dir(&plugin_dir).unwrap();

        let registry = Arc::new(Registry::new(
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
        ));
        let config = LoaderConfig {
            install_dirs: vec![tmp.path().to_path_buf()],
            install_root: tmp.path().to_path_buf(),
            config_root: tmp.path().join("config"),
            host_version: "1.0.0".to_string(),
            enabled: EnabledSet::Unconfigured,
            dev_mode: false,
            project_config: serde_json::Value::Null,
        };
        let loader = Loader::new(config, registry);
        let report = loader.load_plugins().await;

        assert!(report.loaded.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn incompatible_manifest_is_reported_as_skip_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let plugin_dir = tmp.path().join("old-plugin");
        std::fs::create_dir(&plugin_dir).unwrap();
        std::fs::write(
            plugin_dir.join("plugin.json"),
            serde_json::json!({
                "name": "old-plugin",
                "version": "1.0.0",
                "hostVersionRange": "^1.0.0",
                "entryPoint": "libold_plugin.so",
            })
            .to_string(),
        )
        .unwrap();

        let registry = Arc::new(Registry::new(
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
        ));
        let config = LoaderConfig {
            install_dirs: vec![tmp.path().to_path_buf()],
            install_root: tmp.path().to_path_buf(),
            config_root: tmp.path().join("config"),
            host_version: "2.0.0".to_string(),
            enabled: EnabledSet::Unconfigured,
            dev_mode: false,
            project_config: serde_json::Value::Null,
        };
        let loader = Loader::new(config, registry);
        let report = loader.load_plugins().await;

        assert!(report.loaded.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("2.0.0"));
        assert!(report.skipped[0].reason.contains("^1.0.0"));
    }

    #[tokio::test]
    async fn disabled_plugin_with_valid_manifest_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let plugin_dir = tmp.path().join("disabled-plugin");
        std::fs::create_dir(&plugin_dir).unwrap();
        std::fs::write(
            plugin_dir.join("plugin.json"),
            serde_json::json!({
                "name": "disabled-plugin",
                "version": "1.0.0",
                "hostVersionRange": "^1.0.0",
                "entryPoint": "libdisabled_plugin.so",
            })
            .to_string(),
        )
        .unwrap();

        let registry = Arc::new(Registry::new(
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
        ));
        let config = LoaderConfig {
            install_dirs: vec![tmp.path().to_path_buf()],
            install_root: tmp.path().to_path_buf(),
            config_root: tmp.path().join("config"),
            host_version: "1.2.0".to_string(),
            enabled: EnabledSet::Explicit(HashSet::new()),
            dev_mode: false,
            project_config: serde_json::Value::Null,
        };
        let loader = Loader::new(config, registry);
        let report = loader.load_plugins().await;

        assert!(report.loaded.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, "disabled");
    }

    #[tokio::test]
    async fn reload_of_unknown_plugin_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = Arc::new(Registry::new(
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
        ));
        let config = LoaderConfig {
            install_dirs: vec![tmp.path().to_path_buf()],
            install_root: tmp.path().to_path_buf(),
            config_root: tmp.path().join("config"),
            host_version: "1.0.0".to_string(),
            enabled: EnabledSet::Unconfigured,
            dev_mode: false,
            project_config: serde_json::Value::Null,
        };
        let loader = Loader::new(config, registry);
        let err = loader.reload_plugin("never-loaded").await.unwrap_err();
        assert!(matches!(err, PluginError::NotFound { .. }));
    }

    struct FakeWatcher {
        closed: Arc<AtomicU32>,
    }

    impl PluginWatcher for FakeWatcher {
        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeWatcherFactory {
        closed: Arc<AtomicU32>,
    }

    impl WatcherFactory for FakeWatcherFactory {
        fn watch(
            &self,
            _dir: &Path,
            on_change: Box<dyn Fn() + Send + Sync>,
        ) -> Result<Box<dyn PluginWatcher>, String> {
            // Simulate one change event arriving right away.
            on_change();
            Ok(Box::new(FakeWatcher {
                closed: self.closed.clone(),
            }))
        }
    }

    #[test]
    fn watcher_factory_enqueues_a_pending_reload_on_change() {
        let pending: Arc<Mutex<VecDeque<String>>> = Arc::new(Mutex::new(VecDeque::new()));
        let factory = FakeWatcherFactory {
            closed: Arc::new(AtomicU32::new(0)),
        };

        let queued = pending.clone();
        let watcher = factory
            .watch(
                Path::new("/tmp/does-not-matter"),
                Box::new(move || queued.lock().unwrap().push_back("some-plugin".to_string())),
            )
            .unwrap();

        assert_eq!(pending.lock().unwrap().len(), 1);
        watcher.close();
        assert_eq!(factory.closed.load(Ordering::SeqCst), 1);
    }
}
