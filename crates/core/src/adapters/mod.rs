//! Extension-point adapters: thin, purpose-specific façades over the
//! shared [`Registry`](crate::registry::Registry) that host code uses the
//! same way plugin code does.

pub mod agent;
pub mod command;
pub mod hook;
pub mod service;
pub mod template;

pub use agent::AgentAdapter;
pub use command::CommandAdapter;
pub use hook::HookRunner;
pub use service::ServiceAdapter;
pub use template::TemplateAdapter;
