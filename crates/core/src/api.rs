//! The trait surface a plugin's shared library implements.
//!
//! A plugin exports a single C-ABI entry point that returns a
//! `Box<dyn Plugin>`; everything else (commands, agents, hooks, services,
//! templates) is registered by that plugin's `activate` through the
//! [`crate::context::PluginContext`] it's handed.

use crate::context::PluginContext;
use crate::errors::PluginError;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Implemented once per plugin shared library.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Called once, immediately after load, with a context scoped to this
    /// plugin. Any registration the plugin wants to perform happens here.
    fn activate(&self, ctx: &PluginContext) -> Result<(), PluginError>;

    /// Called once during teardown, after the plugin's registrations have
    /// already been removed from the registry.
    fn deactivate(&self) {}
}

/// A host- or plugin-registered command handler.
///
/// `description`/`positional_args`/`option_args` are declaration metadata
/// for the host CLI's help text and arg parser; they default to empty so a
/// minimal handler needs only implement `execute`.
pub trait CommandHandler: Send + Sync {
    fn description(&self) -> &str {
        ""
    }

    fn positional_args(&self) -> Vec<String> {
        Vec::new()
    }

    fn option_args(&self) -> Vec<String> {
        Vec::new()
    }

    fn execute(&self, args: &Value) -> Result<Value, PluginError>;
}

/// Parameters for a single agent call, mirroring the host's `invoke`
/// contract: a prompt, the working directory it runs against, and the
/// optional knobs a caller may set (model override, progress callbacks, a
/// deadline).
#[derive(Clone)]
pub struct AgentInvocation {
    pub prompt: String,
    pub working_directory: PathBuf,
    pub model: Option<String>,
    pub on_output: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub on_error: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub timeout: Option<Duration>,
}

impl AgentInvocation {
    pub fn new(prompt: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            working_directory: working_directory.into(),
            model: None,
            on_output: None,
            on_error: None,
            timeout: None,
        }
    }
}

/// A host- or plugin-registered agent.
pub trait Agent: Send + Sync {
    fn description(&self) -> &str {
        ""
    }

    fn get_capabilities(&self) -> Vec<String>;
    fn invoke(&self, capability: &str, request: &AgentInvocation) -> Result<Value, PluginError>;

    /// Applies agent-specific configuration ahead of invocation. Most
    /// agents have nothing to configure; the default is a no-op.
    fn configure(&self, _config: &Value) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Outcome of a single hook handler's invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Continue,
    Veto { reason: String },
}

/// Context handed to every hook handler in a run. Shallow-frozen: handlers
/// read `data` but cannot replace it for later handlers in the same run.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub data: Value,
}

pub trait HookHandler: Send + Sync {
    fn run(&self, ctx: &HookContext) -> Result<HookOutcome, PluginError>;
}

/// Constructs a service instance, given a map of its already-resolved
/// dependencies (keyed by service name) to inject.
pub type ServiceFactory = Arc<
    dyn Fn(&HashMap<String, Arc<dyn Any + Send + Sync>>) -> Result<Arc<dyn Any + Send + Sync>, PluginError>
        + Send
        + Sync,
>;

/// Optional teardown callback for a service, invoked at most once, only if
/// the service was actually instantiated before its owning plugin was
/// unregistered.
pub type ServiceDispose = Arc<dyn Fn(&Arc<dyn Any + Send + Sync>) + Send + Sync>;

/// Generates the `_weave_plugin_entry` C-ABI symbol the loader looks up,
/// wrapping `$ctor` (anything that evaluates to the plugin's `Plugin` impl)
/// in the double-boxing the loader's [`crate::loader::PLUGIN_ENTRY_SYMBOL`]
/// contract expects.
#[macro_export]
macro_rules! export_plugin {
    ($ctor:expr) => {
        #[no_mangle]
        pub extern "C" fn _weave_plugin_entry() -> *mut Box<dyn $crate::api::Plugin> {
            let plugin: Box<dyn $crate::api::Plugin> = Box::new($ctor);
            Box::into_raw(Box::new(plugin))
        }
    };
}

/// Closed set of template categories a plugin may contribute to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateCategory {
    Stack,
    Spec,
    Steering,
}

impl TemplateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::Stack => "stack",
            TemplateCategory::Spec => "spec",
            TemplateCategory::Steering => "steering",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "stack" => Some(TemplateCategory::Stack),
            "spec" => Some(TemplateCategory::Spec),
            "steering" => Some(TemplateCategory::Steering),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateDescriptor {
    pub name: String,
    pub category: TemplateCategory,
    pub description: String,
    pub source: PathBuf,
    pub subtype: Option<String>,
}
