//! Per-stack reentrancy guards for mutating commands.

use std::collections::HashSet;
use std::sync::RwLock;

use super::types::Command;
use crate::error::{AppError, Result};
use crate::gate::InFlight;
use crate::plugin::PluginFlags;

type Key = (String, Command);

/// Tracks which commands are outstanding for which stack.
#[derive(Debug, Default)]
pub(crate) struct InFlightTracker {
    entries: RwLock<HashSet<Key>>,
}

/// Clears its entry when dropped, on success, error and unwind alike.
#[derive(Debug)]
pub(crate) struct InFlightGuard<'a> {
    tracker: &'a InFlightTracker,
    key: Key,
}

impl InFlightTracker {
    /// Mark a command as running. Fails if the same command is already
    /// running for the same stack.
    pub(crate) fn begin(&self, stack_id: &str, command: Command) -> Result<InFlightGuard<'_>> {
        let key = (stack_id.to_string(), command);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if !entries.insert(key.clone()) {
            return Err(AppError::command_in_flight(stack_id, command.as_str()));
        }
        drop(entries);

        Ok(InFlightGuard { tracker: self, key })
    }

    pub(crate) fn is_running(&self, stack_id: &str, command: Command) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains(&(stack_id.to_string(), command))
    }

    pub(crate) fn stack_flags(&self, stack_id: &str) -> InFlight {
        InFlight {
            resuming: self.is_running(stack_id, Command::ResumeStack),
            stopping: self.is_running(stack_id, Command::StopStack),
            destroying: self.is_running(stack_id, Command::DeleteStack),
            updating: self.is_running(stack_id, Command::UpdateStack),
        }
    }

    pub(crate) fn plugin_flags(&self, stack_id: &str) -> PluginFlags {
        PluginFlags {
            updating_stack: self.is_running(stack_id, Command::UpdateStack),
            creating_plugin: self.is_running(stack_id, Command::CreatePlugin),
            deleting_plugin: self.is_running(stack_id, Command::DeletePlugin),
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut entries = self
            .tracker
            .entries
            .write()
            .unwrap_or_else(|e| e.into_inner());
        entries.remove(&self.key);
    }
}
