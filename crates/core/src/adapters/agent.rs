//! Agent extension point.

use crate::api::AgentInvocation;
use crate::errors::PluginError;
use crate::registry::Registry;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

pub struct AgentAdapter {
    registry: Arc<Registry>,
}

impl AgentAdapter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Applies configuration to a registered agent ahead of invocation.
    #[instrument(skip(self, config))]
    pub fn configure_agent(&self, name: &str, config: &Value) -> Result<(), PluginError> {
        let agent = self
            .registry
            .get_agent(name)
            .ok_or_else(|| PluginError::NotFound {
                plugin: name.to_string(),
            })?;
        agent.configure(config)
    }

    /// Invokes a registered agent's capability, rejecting the call before
    /// it reaches the agent if the requested capability wasn't advertised.
    ///
    /// The agent runs on a blocking task so an optional `request.timeout`
    /// can be enforced without the agent itself needing to be async; a
    /// timeout or a panicking agent both surface as a `PluginError`
    /// rather than hanging the caller or propagating a task panic.
    #[instrument(skip(self, request))]
    pub async fn invoke_agent(
        &self,
        name: &str,
        capability: &str,
        request: AgentInvocation,
    ) -> Result<Value, PluginError> {
        let agent = self
            .registry
            .get_agent(name)
            .ok_or_else(|| PluginError::NotFound {
                plugin: name.to_string(),
            })?;

        if !agent.get_capabilities().iter().any(|c| c == capability) {
            return Err(PluginError::Lifecycle {
                plugin: name.to_string(),
                message: format!("agent does not support capability '{}'", capability),
            });
        }

        let timeout = request.timeout;
        let capability = capability.to_string();
        let task = tokio::task::spawn_blocking(move || agent.invoke(&capability, &request));

        let joined = match timeout {
            Some(duration) => match tokio::time::timeout(duration, task).await {
                Ok(joined) => joined,
                Err(_elapsed) => {
                    return Err(PluginError::Timeout {
                        plugin: name.to_string(),
                        message: format!("invocation exceeded {:?}", duration),
                    })
                }
            },
            None => task.await,
        };

        joined.map_err(|e| PluginError::Lifecycle {
            plugin: name.to_string(),
            message: format!("agent invocation task panicked: {}", e),
        })?
    }
}
