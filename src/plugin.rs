//! Plugin types, install payloads and install/uninstall gating.
//!
//! A stack carries at most one live instance per plugin type. A terminated
//! instance does not block a new install; it is offered for reinstall with
//! its previous configuration instead.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::gate::ActionState;
use crate::status::StackStatus;

/// Opaque plugin configuration as stored by the backend.
pub type PluginConfig = serde_json::Map<String, serde_json::Value>;

/// Identifies a plugin kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PluginType {
    Bridge,
    BlockExplorer,
    Monitoring,
    CandidateRegistry,
    /// A kind this console does not know how to configure.
    Other(String),
}

impl PluginType {
    /// Wire name used in payloads and URL paths.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bridge => "bridge",
            Self::BlockExplorer => "block-explorer",
            Self::Monitoring => "monitoring",
            Self::CandidateRegistry => "candidate-registry",
            Self::Other(raw) => raw,
        }
    }

    /// Human-readable display name.
    pub fn label(&self) -> &str {
        match self {
            Self::Bridge => "Thanos Bridge",
            Self::BlockExplorer => "Thanos Explorer",
            Self::Monitoring => "Monitoring",
            Self::CandidateRegistry => "DAO Candidate Registry",
            Self::Other(raw) => raw,
        }
    }

    /// Parse a wire name into a known plugin type.
    pub fn from_str_id(s: &str) -> Option<Self> {
        match s {
            "bridge" => Some(Self::Bridge),
            "block-explorer" => Some(Self::BlockExplorer),
            "monitoring" => Some(Self::Monitoring),
            "candidate-registry" => Some(Self::CandidateRegistry),
            _ => None,
        }
    }

    /// All plugin types offered in the install menu.
    pub fn all() -> [Self; 4] {
        [
            Self::Bridge,
            Self::BlockExplorer,
            Self::Monitoring,
            Self::CandidateRegistry,
        ]
    }
}

impl From<String> for PluginType {
    fn from(raw: String) -> Self {
        Self::from_str_id(&raw).unwrap_or(Self::Other(raw))
    }
}

impl From<PluginType> for String {
    fn from(plugin_type: PluginType) -> Self {
        plugin_type.as_str().to_string()
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    #[serde(default)]
    pub url: String,
}

/// A plugin attached to a stack, as reported by `GET …/{id}/integrations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    pub status: StackStatus,
    #[serde(default, alias = "stackId")]
    pub stack_id: String,
    #[serde(default)]
    pub config: PluginConfig,
    #[serde(default)]
    pub info: PluginInfo,
    #[serde(default, alias = "logPath", skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerConfig {
    pub database_username: String,
    pub database_password: String,
    pub coin_market_cap_key: String,
    pub wallet_connect_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfig {
    pub grafana_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRegistryConfig {
    pub amount: f64,
    pub memo: String,
    pub name_info: String,
}

/// What to send when installing a plugin.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginInstallRequest {
    Bridge,
    BlockExplorer(ExplorerConfig),
    Monitoring(MonitoringConfig),
    CandidateRegistry(CandidateRegistryConfig),
    /// Install again with a previous instance's stored configuration.
    Reinstall {
        plugin_type: PluginType,
        config: PluginConfig,
    },
}

impl PluginInstallRequest {
    pub fn plugin_type(&self) -> PluginType {
        match self {
            Self::Bridge => PluginType::Bridge,
            Self::BlockExplorer(_) => PluginType::BlockExplorer,
            Self::Monitoring(_) => PluginType::Monitoring,
            Self::CandidateRegistry(_) => PluginType::CandidateRegistry,
            Self::Reinstall { plugin_type, .. } => plugin_type.clone(),
        }
    }

    /// Request body for `POST …/{id}/integrations/{type}`.
    pub fn payload(&self) -> Result<PluginConfig> {
        let value = match self {
            Self::Bridge => return Ok(PluginConfig::new()),
            Self::BlockExplorer(config) => serde_json::to_value(config)?,
            Self::Monitoring(config) => serde_json::to_value(config)?,
            Self::CandidateRegistry(config) => serde_json::to_value(config)?,
            Self::Reinstall { config, .. } => return Ok(config.clone()),
        };
        match value {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(AppError::other("Plugin payload is not an object")),
        }
    }
}

/// Plugin commands the caller has in flight, plus the stack update guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PluginFlags {
    pub updating_stack: bool,
    pub creating_plugin: bool,
    pub deleting_plugin: bool,
}

impl PluginFlags {
    /// Plugin mutations wait while the stack itself is being updated or
    /// another plugin command is outstanding.
    pub fn suspended(self) -> bool {
        self.updating_stack || self.creating_plugin || self.deleting_plugin
    }
}

/// A type can be installed when no instance of it is live.
pub fn is_installable(plugin_type: &PluginType, plugins: &[Plugin]) -> bool {
    !plugins
        .iter()
        .any(|p| &p.plugin_type == plugin_type && !p.status.is_terminated())
}

/// Departing or departed plugins cannot be uninstalled again.
pub fn is_uninstallable(plugin: &Plugin) -> bool {
    !matches!(
        plugin.status,
        StackStatus::Terminating | StackStatus::Terminated
    )
}

pub fn is_reinstallable(plugin: &Plugin) -> bool {
    plugin.status.is_terminated()
}

/// Build a reinstall request carrying the plugin's stored configuration.
pub fn reinstall_request(plugin: &Plugin) -> Option<PluginInstallRequest> {
    is_reinstallable(plugin).then(|| PluginInstallRequest::Reinstall {
        plugin_type: plugin.plugin_type.clone(),
        config: plugin.config.clone(),
    })
}

/// Most recent terminated instance of a type, if any.
pub fn find_reinstallable<'a>(plugin_type: &PluginType, plugins: &'a [Plugin]) -> Option<&'a Plugin> {
    plugins
        .iter()
        .rev()
        .find(|p| &p.plugin_type == plugin_type && is_reinstallable(p))
}

/// Live instance of a type, if any.
pub fn find_live<'a>(plugin_type: &PluginType, plugins: &'a [Plugin]) -> Option<&'a Plugin> {
    plugins
        .iter()
        .find(|p| &p.plugin_type == plugin_type && !p.status.is_terminated())
}

/// One entry of the "Add plugin" menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginOption {
    pub plugin_type: PluginType,
    pub label: String,
    pub installed: bool,
    pub enabled: bool,
}

pub fn plugin_options(plugins: &[Plugin], flags: PluginFlags) -> Vec<PluginOption> {
    PluginType::all()
        .into_iter()
        .map(|plugin_type| {
            let installed = !is_installable(&plugin_type, plugins);
            PluginOption {
                label: plugin_type.label().to_string(),
                enabled: !installed && !flags.suspended(),
                installed,
                plugin_type,
            }
        })
        .collect()
}

/// Buttons shown next to an installed plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginAffordance {
    pub uninstall: ActionState,
    pub reinstall: ActionState,
}

pub fn plugin_affordance(plugin: &Plugin, flags: PluginFlags) -> PluginAffordance {
    let allowed = |ok: bool| {
        if ok && !flags.suspended() {
            ActionState::Enabled
        } else {
            ActionState::Disabled
        }
    };

    if is_reinstallable(plugin) {
        PluginAffordance {
            uninstall: ActionState::Hidden,
            reinstall: allowed(true),
        }
    } else {
        PluginAffordance {
            uninstall: allowed(is_uninstallable(plugin)),
            reinstall: ActionState::Hidden,
        }
    }
}
