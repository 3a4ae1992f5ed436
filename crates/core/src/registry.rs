//! Central registry mediating every plugin registration.
//!
//! A single in-process, single-writer store behind one `RwLock`, matching
//! the concurrency model described for this subsystem: many readers during
//! command/agent/hook dispatch, one writer at a time during load/unload.

use crate::api::{
    Agent, CommandHandler, HookHandler, ServiceDispose, ServiceFactory, TemplateCategory,
    TemplateDescriptor,
};
use crate::errors::PluginError;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, instrument, warn};

pub struct RegisteredCommand {
    pub owner: String,
    pub handler: Arc<dyn CommandHandler>,
}

pub struct RegisteredAgent {
    pub owner: String,
    pub agent: Arc<dyn Agent>,
}

pub struct RegisteredHook {
    pub owner: String,
    pub phase: String,
    pub timing: String,
    pub priority_rank: u8,
    pub order: u64,
    pub handler: Arc<dyn HookHandler>,
}

pub struct ServiceEntry {
    pub owner: String,
    pub factory: ServiceFactory,
    pub dependencies: Vec<String>,
    pub dispose: Option<ServiceDispose>,
    pub instance: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct RegisteredTemplate {
    pub owner: String,
    pub namespaced_name: String,
    pub descriptor: TemplateDescriptor,
}

/// A template as returned by a query: the owning plugin, its
/// `pluginName/name` namespaced identifier (unique even when two plugins
/// both register a template literally named the same thing), and its
/// declared metadata.
#[derive(Debug, Clone)]
pub struct Template {
    pub owner: String,
    pub namespaced_name: String,
    pub descriptor: TemplateDescriptor,
}

#[derive(Default)]
struct RegistryInner {
    commands: HashMap<String, RegisteredCommand>,
    agents: HashMap<String, RegisteredAgent>,
    hooks: Vec<RegisteredHook>,
    services: HashMap<String, ServiceEntry>,
    templates: Vec<RegisteredTemplate>,
}

/// The central registration and resolution store. Cheaply cloneable via
/// `Arc` since every adapter and plugin context shares one instance.
pub struct Registry {
    inner: RwLock<RegistryInner>,
    core_commands: HashSet<String>,
    core_agents: HashSet<String>,
    core_services: HashSet<String>,
    hook_order: AtomicU64,
}

impl Registry {
    pub fn new(
        core_commands: HashSet<String>,
        core_agents: HashSet<String>,
        core_services: HashSet<String>,
    ) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            core_commands,
            core_agents,
            core_services,
            hook_order: AtomicU64::new(0),
        }
    }

    #[instrument(skip(self, handler))]
    pub fn register_command(
        &self,
        owner: &str,
        name: &str,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<(), PluginError> {
        if self.core_commands.contains(name) {
            return Err(PluginError::NameConflict {
                name: name.to_string(),
                kind: "command",
                owner: "host".to_string(),
            });
        }
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(existing) = inner.commands.get(name) {
            return Err(PluginError::NameConflict {
                name: name.to_string(),
                kind: "command",
                owner: existing.owner.clone(),
            });
        }
        debug!(owner, name, "registering command");
        inner.commands.insert(
            name.to_string(),
            RegisteredCommand {
                owner: owner.to_string(),
                handler,
            },
        );
        Ok(())
    }

    #[instrument(skip(self, agent))]
    pub fn register_agent(
        &self,
        owner: &str,
        name: &str,
        agent: Arc<dyn Agent>,
    ) -> Result<(), PluginError> {
        if self.core_agents.contains(name) {
            return Err(PluginError::NameConflict {
                name: name.to_string(),
                kind: "agent",
                owner: "host".to_string(),
            });
        }
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(existing) = inner.agents.get(name) {
            return Err(PluginError::NameConflict {
                name: name.to_string(),
                kind: "agent",
                owner: existing.owner.clone(),
            });
        }
        debug!(owner, name, "registering agent");
        inner.agents.insert(
            name.to_string(),
            RegisteredAgent {
                owner: owner.to_string(),
                agent,
            },
        );
        Ok(())
    }

    /// Registers a hook handler. FIFO tie-breaking among equal priorities is
    /// backed by a single monotonic counter owned by this registry instance
    /// (not per-phase), so registration order across the whole process is
    /// what breaks ties.
    #[instrument(skip(self, handler))]
    pub fn register_hook(
        &self,
        owner: &str,
        phase: &str,
        timing: &str,
        priority_rank: u8,
        handler: Arc<dyn HookHandler>,
    ) {
        let order = self.hook_order.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write().expect("registry lock poisoned");
        debug!(owner, phase, timing, priority_rank, order, "registering hook");
        inner.hooks.push(RegisteredHook {
            owner: owner.to_string(),
            phase: phase.to_string(),
            timing: timing.to_string(),
            priority_rank,
            order,
            handler,
        });
    }

    /// Returns the (owner, handler) pairs matching `phase`/`timing`, sorted
    /// by priority rank ascending (Earliest first) then by registration
    /// order.
    pub fn hooks_for(&self, phase: &str, timing: &str) -> Vec<(String, Arc<dyn HookHandler>)> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let wants_all_phases = phase == "wildcard";
        let mut matching: Vec<&RegisteredHook> = inner
            .hooks
            .iter()
            .filter(|h| (wants_all_phases || h.phase == phase || h.phase == "wildcard") && h.timing == timing)
            .collect();
        matching.sort_by_key(|h| (h.priority_rank, h.order));
        matching
            .into_iter()
            .map(|h| (h.owner.clone(), h.handler.clone()))
            .collect()
    }

    #[instrument(skip(self, factory, dispose))]
    pub fn register_service(
        &self,
        owner: &str,
        name: &str,
        dependencies: Vec<String>,
        factory: ServiceFactory,
        dispose: Option<ServiceDispose>,
    ) -> Result<(), PluginError> {
        if self.core_services.contains(name) {
            return Err(PluginError::NameConflict {
                name: name.to_string(),
                kind: "service",
                owner: "host".to_string(),
            });
        }
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(existing) = inner.services.get(name) {
            return Err(PluginError::NameConflict {
                name: name.to_string(),
                kind: "service",
                owner: existing.owner.clone(),
            });
        }
        debug!(owner, name, "registering service");
        inner.services.insert(
            name.to_string(),
            ServiceEntry {
                owner: owner.to_string(),
                factory,
                dependencies,
                dispose,
                instance: None,
            },
        );
        Ok(())
    }

    /// Templates are never rejected on name collision *across* plugins: the
    /// namespaced name (`pluginName/name`) is what callers use to
    /// distinguish two plugins that both registered, say, a `react`
    /// template under `stack`. Within one plugin, though, the same
    /// `(category, name)` pair registered twice is a conflict.
    pub fn register_template(
        &self,
        owner: &str,
        descriptor: TemplateDescriptor,
    ) -> Result<(), PluginError> {
        let namespaced_name = format!("{}/{}", owner, descriptor.name);
        let mut inner = self.inner.write().expect("registry lock poisoned");

        if inner.templates.iter().any(|t| {
            t.owner == owner
                && t.descriptor.category == descriptor.category
                && t.descriptor.name == descriptor.name
        }) {
            return Err(PluginError::NameConflict {
                name: descriptor.name,
                kind: "template",
                owner: owner.to_string(),
            });
        }

        inner.templates.push(RegisteredTemplate {
            owner: owner.to_string(),
            namespaced_name,
            descriptor,
        });
        Ok(())
    }

    pub fn has_service(&self, name: &str) -> bool {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.services.contains_key(name)
    }

    /// Resolves a service, constructing it (and, recursively, its
    /// dependencies) on first use and caching the instance for the
    /// lifetime of the plugin that registered it. Depth-first with an
    /// explicit path, so a cycle reports as `"a -> b -> c -> a"`.
    #[instrument(skip(self))]
    pub fn resolve_service(&self, name: &str) -> Result<Arc<dyn Any + Send + Sync>, PluginError> {
        self.resolve_service_inner(name, &mut Vec::new())
    }

    fn resolve_service_inner(
        &self,
        name: &str,
        path: &mut Vec<String>,
    ) -> Result<Arc<dyn Any + Send + Sync>, PluginError> {
        if let Some(pos) = path.iter().position(|n| n == name) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(PluginError::CircularDependency(cycle.join(" -> ")));
        }

        {
            let inner = self.inner.read().expect("registry lock poisoned");
            let entry = inner
                .services
                .get(name)
                .ok_or_else(|| PluginError::DependencyUnresolved(name.to_string()))?;
            if let Some(instance) = &entry.instance {
                return Ok(instance.clone());
            }
        }

        path.push(name.to_string());
        let (dependencies, factory) = {
            let inner = self.inner.read().expect("registry lock poisoned");
            let entry = inner
                .services
                .get(name)
                .ok_or_else(|| PluginError::DependencyUnresolved(name.to_string()))?;
            (entry.dependencies.clone(), entry.factory.clone())
        };

        let mut resolved_dependencies = HashMap::new();
        for dep in &dependencies {
            let instance = self.resolve_service_inner(dep, path)?;
            resolved_dependencies.insert(dep.clone(), instance);
        }
        path.pop();

        let instance = factory(&resolved_dependencies)?;
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(entry) = inner.services.get_mut(name) {
            entry.instance = Some(instance.clone());
        }
        Ok(instance)
    }

    pub fn get_command(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.commands.get(name).map(|c| c.handler.clone())
    }

    pub fn get_agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.agents.get(name).map(|a| a.agent.clone())
    }

    pub fn get_templates(&self, category: Option<TemplateCategory>) -> Vec<Template> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner
            .templates
            .iter()
            .filter(|t| category.map(|c| c == t.descriptor.category).unwrap_or(true))
            .map(|t| Template {
                owner: t.owner.clone(),
                namespaced_name: t.namespaced_name.clone(),
                descriptor: t.descriptor.clone(),
            })
            .collect()
    }

    /// Removes every registration owned by `plugin_name`, in three steps:
    /// capture the services about to be disposed, delete from all five
    /// indexes, then invoke their dispose callbacks — so a callback that
    /// calls back into the registry observes post-deregistration state.
    #[instrument(skip(self))]
    pub fn unregister_plugin(&self, plugin_name: &str) {
        let to_dispose: Vec<(String, ServiceDispose, Arc<dyn Any + Send + Sync>)> = {
            let inner = self.inner.read().expect("registry lock poisoned");
            inner
                .services
                .iter()
                .filter(|(_, s)| s.owner == plugin_name)
                .filter_map(|(name, s)| {
                    let instance = s.instance.clone()?;
                    let dispose = s.dispose.clone()?;
                    Some((name.clone(), dispose, instance))
                })
                .collect()
        };

        {
            let mut inner = self.inner.write().expect("registry lock poisoned");
            inner.commands.retain(|_, c| c.owner != plugin_name);
            inner.agents.retain(|_, a| a.owner != plugin_name);
            inner.hooks.retain(|h| h.owner != plugin_name);
            inner.services.retain(|_, s| s.owner != plugin_name);
            inner.templates.retain(|t| t.owner != plugin_name);
        }

        for (service_name, dispose, instance) in to_dispose {
            debug!(plugin_name, service_name, "disposing service instance");
            let outcome = catch_unwind(AssertUnwindSafe(|| dispose(&instance)));
            if outcome.is_err() {
                error!(
                    plugin_name,
                    service_name, "dispose callback panicked; teardown continues"
                );
            }
        }
        warn!(plugin_name, "plugin unregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn empty_registry() -> Registry {
        Registry::new(HashSet::new(), HashSet::new(), HashSet::new())
    }

    struct Echo;
    impl CommandHandler for Echo {
        fn execute(&self, args: &Value) -> Result<Value, PluginError> {
            Ok(args.clone())
        }
    }

    #[test]
    fn rejects_duplicate_command_names() {
        let registry = empty_registry();
        registry
            .register_command("plugin-a", "greet", Arc::new(Echo))
            .unwrap();
        let err = registry
            .register_command("plugin-b", "greet", Arc::new(Echo))
            .unwrap_err();
        match err {
            PluginError::NameConflict { owner, .. } => assert_eq!(owner, "plugin-a"),
            _ => panic!("expected NameConflict"),
        }
    }

    #[test]
    fn rejects_core_command_names() {
        let mut core = HashSet::new();
        core.insert("init".to_string());
        let registry = Registry::new(core, HashSet::new(), HashSet::new());
        let err = registry
            .register_command("plugin-a", "init", Arc::new(Echo))
            .unwrap_err();
        match err {
            PluginError::NameConflict { owner, .. } => assert_eq!(owner, "host"),
            _ => panic!("expected NameConflict"),
        }
    }

    #[test]
    fn resolves_linear_service_dependency_chain_with_injection() {
        let registry = empty_registry();
        registry
            .register_service(
                "plugin-a",
                "base",
                vec![],
                Arc::new(|_deps| Ok(Arc::new(1u32) as Arc<dyn Any + Send + Sync>)),
                None,
            )
            .unwrap();
        registry
            .register_service(
                "plugin-a",
                "derived",
                vec!["base".to_string()],
                Arc::new(|deps| {
                    let base = *deps["base"].clone().downcast::<u32>().unwrap();
                    Ok(Arc::new(base + 1) as Arc<dyn Any + Send + Sync>)
                }),
                None,
            )
            .unwrap();

        let instance = registry.resolve_service("derived").unwrap();
        assert_eq!(*instance.downcast::<u32>().unwrap(), 2);
    }

    #[test]
    fn detects_circular_service_dependency() {
        let registry = empty_registry();
        registry
            .register_service(
                "plugin-a",
                "a",
                vec!["b".to_string()],
                Arc::new(|_deps| Ok(Arc::new(()) as Arc<dyn Any + Send + Sync>)),
                None,
            )
            .unwrap();
        registry
            .register_service(
                "plugin-a",
                "b",
                vec!["a".to_string()],
                Arc::new(|_deps| Ok(Arc::new(()) as Arc<dyn Any + Send + Sync>)),
                None,
            )
            .unwrap();

        let err = registry.resolve_service("a").unwrap_err();
        match err {
            PluginError::CircularDependency(msg) => assert_eq!(msg, "a -> b -> a"),
            other => panic!("expected CircularDependency, got {:?}", other),
        }
    }

    #[test]
    fn unregister_plugin_removes_all_its_registrations() {
        let registry = empty_registry();
        registry
            .register_command("plugin-a", "greet", Arc::new(Echo))
            .unwrap();
        registry
            .register_service(
                "plugin-a",
                "svc",
                vec![],
                Arc::new(|_deps| Ok(Arc::new(()) as Arc<dyn Any + Send + Sync>)),
                None,
            )
            .unwrap();
        registry.resolve_service("svc").unwrap();

        registry.unregister_plugin("plugin-a");

        assert!(registry.get_command("greet").is_none());
        assert!(!registry.has_service("svc"));
    }

    #[test]
    fn unregister_plugin_disposes_instantiated_services_exactly_once() {
        let registry = empty_registry();
        let dispose_count = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = dispose_count.clone();
        registry
            .register_service(
                "plugin-a",
                "svc",
                vec![],
                Arc::new(|_deps| Ok(Arc::new(()) as Arc<dyn Any + Send + Sync>)),
                Some(Arc::new(move |_: &Arc<dyn Any + Send + Sync>| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();
        registry
            .register_service(
                "plugin-a",
                "never_resolved",
                vec![],
                Arc::new(|_deps| Ok(Arc::new(()) as Arc<dyn Any + Send + Sync>)),
                Some(Arc::new(|_: &Arc<dyn Any + Send + Sync>| {
                    panic!("dispose must not run for a service that was never instantiated");
                })),
            )
            .unwrap();

        registry.resolve_service("svc").unwrap();
        registry.unregister_plugin("plugin-a");

        assert_eq!(dispose_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hooks_sorted_by_priority_then_registration_order() {
        struct NoOpHook;
        impl HookHandler for NoOpHook {
            fn run(&self, _ctx: &crate::api::HookContext) -> Result<crate::api::HookOutcome, PluginError> {
                Ok(crate::api::HookOutcome::Continue)
            }
        }

        let registry = empty_registry();
        registry.register_hook("plugin-a", "tasks", "pre", 2, Arc::new(NoOpHook));
        registry.register_hook("plugin-b", "tasks", "pre", 0, Arc::new(NoOpHook));
        registry.register_hook("plugin-c", "tasks", "pre", 2, Arc::new(NoOpHook));

        let hooks = registry.hooks_for("tasks", "pre");
        assert_eq!(hooks.len(), 3);

        let inner = registry.inner.read().unwrap();
        let mut matching: Vec<&RegisteredHook> = inner
            .hooks
            .iter()
            .filter(|h| h.phase == "tasks" && h.timing == "pre")
            .collect();
        matching.sort_by_key(|h| (h.priority_rank, h.order));
        assert_eq!(matching[0].owner, "plugin-b");
        assert_eq!(matching[1].owner, "plugin-a");
        assert_eq!(matching[2].owner, "plugin-c");
    }

    #[test]
    fn wildcard_phase_query_returns_hooks_from_every_phase() {
        struct NoOpHook;
        impl HookHandler for NoOpHook {
            fn run(&self, _ctx: &crate::api::HookContext) -> Result<crate::api::HookOutcome, PluginError> {
                Ok(crate::api::HookOutcome::Continue)
            }
        }

        let registry = empty_registry();
        registry.register_hook("plugin-a", "requirements", "pre", 2, Arc::new(NoOpHook));
        registry.register_hook("plugin-b", "design", "pre", 2, Arc::new(NoOpHook));
        registry.register_hook("plugin-c", "wildcard", "pre", 2, Arc::new(NoOpHook));
        registry.register_hook("plugin-d", "design", "post", 2, Arc::new(NoOpHook));

        let hooks = registry.hooks_for("wildcard", "pre");
        assert_eq!(hooks.len(), 3);
        let owners: Vec<&str> = hooks.iter().map(|(owner, _)| owner.as_str()).collect();
        assert!(owners.contains(&"plugin-a"));
        assert!(owners.contains(&"plugin-b"));
        assert!(owners.contains(&"plugin-c"));
    }
}
