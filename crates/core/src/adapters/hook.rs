//! Hook pipeline: priority-ranked, veto-capable observers run around the
//! orchestrator's phases.

use crate::api::{HookContext, HookOutcome};
use crate::errors::PluginError;
use crate::registry::Registry;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HookPhase {
    Requirements,
    Design,
    Tasks,
    Implementation,
    Wildcard,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Requirements => "requirements",
            HookPhase::Design => "design",
            HookPhase::Tasks => "tasks",
            HookPhase::Implementation => "implementation",
            HookPhase::Wildcard => "wildcard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HookTiming {
    Pre,
    Post,
}

impl HookTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookTiming::Pre => "pre",
            HookTiming::Post => "post",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HookPriority {
    Earliest,
    Early,
    Normal,
    Late,
    Latest,
}

impl HookPriority {
    pub fn as_rank(&self) -> u8 {
        match self {
            HookPriority::Earliest => 0,
            HookPriority::Early => 1,
            HookPriority::Normal => 2,
            HookPriority::Late => 3,
            HookPriority::Latest => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HookError {
    pub plugin_owner: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct HookRunResult {
    pub vetoed: bool,
    pub veto_reason: Option<String>,
    pub veto_plugin: Option<String>,
    pub executed_count: usize,
    pub errors: Vec<HookError>,
}

pub struct HookRunner {
    registry: Arc<Registry>,
}

impl HookRunner {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Runs every handler registered for `phase`/`timing`, in priority then
    /// registration order, stopping at the first veto. Handler panics and
    /// errors are collected, never propagated, so one misbehaving plugin
    /// cannot abort the whole run for every other handler.
    #[instrument(skip(self, ctx))]
    pub fn run(&self, phase: HookPhase, timing: HookTiming, ctx: &HookContext) -> HookRunResult {
        let handlers = self.registry.hooks_for(phase.as_str(), timing.as_str());
        let mut result = HookRunResult::default();

        for (owner, handler) in handlers {
            let outcome = catch_unwind(AssertUnwindSafe(|| handler.run(ctx)));
            result.executed_count += 1;

            match outcome {
                Ok(Ok(HookOutcome::Continue)) => continue,
                Ok(Ok(HookOutcome::Veto { reason })) => {
                    warn!(phase = phase.as_str(), timing = timing.as_str(), owner, reason, "hook vetoed");
                    result.vetoed = true;
                    result.veto_reason = Some(reason);
                    result.veto_plugin = Some(owner);
                    break;
                }
                Ok(Err(e)) => {
                    result.errors.push(HookError {
                        plugin_owner: owner,
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    result.errors.push(HookError {
                        plugin_owner: owner,
                        message: "hook handler panicked".to_string(),
                    });
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HookHandler;
    use serde_json::Value;
    use std::collections::HashSet;

    struct ContinueHook;
    impl HookHandler for ContinueHook {
        fn run(&self, _ctx: &HookContext) -> Result<HookOutcome, PluginError> {
            Ok(HookOutcome::Continue)
        }
    }

    struct VetoHook(&'static str);
    impl HookHandler for VetoHook {
        fn run(&self, _ctx: &HookContext) -> Result<HookOutcome, PluginError> {
            Ok(HookOutcome::Veto {
                reason: self.0.to_string(),
            })
        }
    }

    #[test]
    fn veto_short_circuits_remaining_handlers() {
        let registry = Arc::new(Registry::new(HashSet::new(), HashSet::new(), HashSet::new()));
        registry.register_hook("plugin-a", "tasks", "pre", HookPriority::Normal.as_rank(), Arc::new(VetoHook("no")));
        registry.register_hook("plugin-b", "tasks", "pre", HookPriority::Late.as_rank(), Arc::new(ContinueHook));

        let runner = HookRunner::new(registry);
        let ctx = HookContext { data: Value::Null };
        let result = runner.run(HookPhase::Tasks, HookTiming::Pre, &ctx);

        assert!(result.vetoed);
        assert_eq!(result.veto_reason, Some("no".to_string()));
        assert_eq!(result.executed_count, 1);
    }

    #[test]
    fn all_continue_runs_every_handler() {
        let registry = Arc::new(Registry::new(HashSet::new(), HashSet::new(), HashSet::new()));
        registry.register_hook("plugin-a", "design", "post", HookPriority::Normal.as_rank(), Arc::new(ContinueHook));
        registry.register_hook("plugin-b", "design", "post", HookPriority::Early.as_rank(), Arc::new(ContinueHook));

        let runner = HookRunner::new(registry);
        let ctx = HookContext { data: Value::Null };
        let result = runner.run(HookPhase::Design, HookTiming::Post, &ctx);

        assert!(!result.vetoed);
        assert_eq!(result.executed_count, 2);
    }
}
