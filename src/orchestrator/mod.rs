//! Lifecycle orchestration: issues stack and plugin commands against the
//! backend, guards against duplicate dispatch and keeps a local view of
//! each stack in step with confirmed backend state.

mod client;
mod in_flight;
mod plugins;
mod snapshot;
#[cfg(test)]
mod testing;
mod types;

pub use client::Orchestrator;
pub use snapshot::build_stack_snapshot;
pub use types::{Command, Notification, NotificationLevel, PluginEntry, StackSnapshot, StackView};
