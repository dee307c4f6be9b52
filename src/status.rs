//! Stack, deployment-step and plugin status values and their classification.
//!
//! Status strings are owned by the backend and may grow new values at any
//! time, so parsing is total: anything unrecognized is kept verbatim in an
//! `Other` variant and classifies as [`StatusClass::Neutral`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label shown for both `Deployed` stacks and `Completed` steps.
pub const ACTIVE_LABEL: &str = "Active";

/// Display/gating class of a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Success,
    InProgress,
    Warning,
    Error,
    Neutral,
}

impl StatusClass {
    /// ANSI color used for the terminal badge.
    pub fn ansi_color(self) -> &'static str {
        match self {
            Self::Success => "\x1b[32m",
            Self::InProgress => "\x1b[34m",
            Self::Warning => "\x1b[33m",
            Self::Error => "\x1b[31m",
            Self::Neutral => "\x1b[90m",
        }
    }
}

/// Status of a stack, and of a plugin (plugins report the same vocabulary).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StackStatus {
    Pending,
    Deploying,
    Deployed,
    /// Reported by plugins and some stack payloads in place of `Deployed`.
    Active,
    Updating,
    Terminating,
    Terminated,
    Stopped,
    FailedToDeploy,
    FailedToUpdate,
    FailedToTerminate,
    Unknown,
    Other(String),
}

impl StackStatus {
    pub const KNOWN: [Self; 12] = [
        Self::Pending,
        Self::Deploying,
        Self::Deployed,
        Self::Active,
        Self::Updating,
        Self::Terminating,
        Self::Terminated,
        Self::Stopped,
        Self::FailedToDeploy,
        Self::FailedToUpdate,
        Self::FailedToTerminate,
        Self::Unknown,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Pending" => Self::Pending,
            "Deploying" => Self::Deploying,
            "Deployed" => Self::Deployed,
            "Active" => Self::Active,
            "Updating" => Self::Updating,
            "Terminating" => Self::Terminating,
            "Terminated" => Self::Terminated,
            "Stopped" => Self::Stopped,
            "FailedToDeploy" => Self::FailedToDeploy,
            "FailedToUpdate" => Self::FailedToUpdate,
            "FailedToTerminate" => Self::FailedToTerminate,
            "Unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Deploying => "Deploying",
            Self::Deployed => "Deployed",
            Self::Active => "Active",
            Self::Updating => "Updating",
            Self::Terminating => "Terminating",
            Self::Terminated => "Terminated",
            Self::Stopped => "Stopped",
            Self::FailedToDeploy => "FailedToDeploy",
            Self::FailedToUpdate => "FailedToUpdate",
            Self::FailedToTerminate => "FailedToTerminate",
            Self::Unknown => "Unknown",
            Self::Other(raw) => raw,
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            Self::Deployed | Self::Active => StatusClass::Success,
            Self::Pending | Self::Deploying | Self::Updating => StatusClass::InProgress,
            Self::Terminating | Self::Stopped => StatusClass::Warning,
            Self::FailedToDeploy | Self::FailedToUpdate | Self::FailedToTerminate => {
                StatusClass::Error
            }
            Self::Terminated | Self::Unknown => StatusClass::Neutral,
            // Plugins may report step-style values such as `InProgress`.
            Self::Other(raw) => DeploymentStepStatus::parse(raw).class(),
        }
    }

    pub fn display_label(&self) -> &str {
        match self {
            Self::Deployed => ACTIVE_LABEL,
            Self::Other(raw) => display_label(raw),
            other => other.as_str(),
        }
    }

    /// `Deployed` and its plugin-side spelling `Active`.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Deployed | Self::Active)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl From<String> for StackStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<StackStatus> for String {
    fn from(status: StackStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one provisioning step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentStepStatus {
    #[default]
    Pending,
    InProgress,
    Failed,
    Stopped,
    Completed,
    Unknown,
    Other(String),
}

impl DeploymentStepStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Pending" => Self::Pending,
            "InProgress" => Self::InProgress,
            "Failed" => Self::Failed,
            "Stopped" => Self::Stopped,
            "Completed" => Self::Completed,
            "Unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Failed => "Failed",
            Self::Stopped => "Stopped",
            Self::Completed => "Completed",
            Self::Unknown => "Unknown",
            Self::Other(raw) => raw,
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            Self::Completed => StatusClass::Success,
            Self::Pending | Self::InProgress => StatusClass::InProgress,
            Self::Stopped => StatusClass::Warning,
            Self::Failed => StatusClass::Error,
            Self::Unknown | Self::Other(_) => StatusClass::Neutral,
        }
    }

    pub fn display_label(&self) -> &str {
        match self {
            Self::Completed => ACTIVE_LABEL,
            other => other.as_str(),
        }
    }
}

impl From<String> for DeploymentStepStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<DeploymentStepStatus> for String {
    fn from(status: DeploymentStepStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for DeploymentStepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a raw status string from either vocabulary.
pub fn classify(raw: &str) -> StatusClass {
    StackStatus::parse(raw).class()
}

/// Label for a raw status string: `Deployed` and `Completed` read as `Active`.
pub fn display_label(raw: &str) -> &str {
    match raw.trim() {
        "Deployed" | "Completed" => ACTIVE_LABEL,
        _ => raw,
    }
}
