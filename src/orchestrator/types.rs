//! Orchestrator-related type definitions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::deployment::{Deployment, DeploymentProgress, ResolvedStep};
use crate::gate::StackActions;
use crate::plugin::{Plugin, PluginAffordance, PluginOption};
use crate::stack::Stack;
use crate::status::StatusClass;

/// A mutating command the console can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    CreateStack,
    DeleteStack,
    ResumeStack,
    StopStack,
    UpdateStack,
    CreatePlugin,
    DeletePlugin,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateStack => "create_stack",
            Self::DeleteStack => "delete_stack",
            Self::ResumeStack => "resume_stack",
            Self::StopStack => "stop_stack",
            Self::UpdateStack => "update_stack",
            Self::CreatePlugin => "create_plugin",
            Self::DeletePlugin => "delete_plugin",
        }
    }

    /// Past-tense phrase for success messages.
    pub(crate) fn done_phrase(self) -> &'static str {
        match self {
            Self::CreateStack => "Stack creation requested",
            Self::DeleteStack => "Stack destruction requested",
            Self::ResumeStack => "Stack resume requested",
            Self::StopStack => "Stack stop requested",
            Self::UpdateStack => "Stack update requested",
            Self::CreatePlugin => "Plugin installation requested",
            Self::DeletePlugin => "Plugin uninstallation requested",
        }
    }

    pub(crate) fn failed_phrase(self) -> &'static str {
        match self {
            Self::CreateStack => "Failed to create stack",
            Self::DeleteStack => "Failed to destroy stack",
            Self::ResumeStack => "Failed to resume stack",
            Self::StopStack => "Failed to stop stack",
            Self::UpdateStack => "Failed to update stack",
            Self::CreatePlugin => "Failed to install plugin",
            Self::DeletePlugin => "Failed to uninstall plugin",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient user-facing result of a command.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: String,
    pub level: NotificationLevel,
    pub command: Command,
    pub stack_id: Option<String>,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Cached representation of one stack and what hangs off it.
#[derive(Debug, Clone, Serialize)]
pub struct StackView {
    pub stack: Stack,
    pub deployments: Vec<Deployment>,
    pub plugins: Vec<Plugin>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginEntry {
    pub plugin: Plugin,
    pub label: String,
    pub status_label: String,
    pub status_class: StatusClass,
    pub affordance: PluginAffordance,
}

/// Everything a stack detail screen needs, already gated.
#[derive(Debug, Clone, Serialize)]
pub struct StackSnapshot {
    pub stack: Stack,
    pub status_label: String,
    pub status_class: StatusClass,
    pub actions: StackActions,
    pub steps: Vec<ResolvedStep>,
    pub progress: DeploymentProgress,
    pub plugin_options: Vec<PluginOption>,
    pub plugins: Vec<PluginEntry>,
    pub fetched_at: DateTime<Utc>,
}
