//! Application error types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Application error that can be serialized for machine-readable output.
#[derive(Debug, Clone)]
pub struct AppError {
    payload: BTreeMap<String, String>,
    kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Stack not found on the backend
    StackNotFound,
    /// Plugin not found on the stack
    PluginNotFound,
    /// The action is not legal for the stack's current status
    ActionNotAllowed,
    /// The same command is already running for this stack
    CommandInFlight,
    /// Input rejected before a command was issued
    Validation,
    /// Configuration error
    Config,
    /// File system error
    Io,
    /// Network error
    Network,
    /// Backend answered but the response was unusable
    Backend,
    /// General error
    Other,
}

impl ErrorKind {
    pub fn code(&self) -> u32 {
        match self {
            Self::StackNotFound => 1001,
            Self::PluginNotFound => 1002,
            Self::ActionNotAllowed => 1003,
            Self::CommandInFlight => 1004,
            Self::Validation => 1005,
            Self::Config => 2001,
            Self::Io => 2002,
            Self::Network => 2003,
            Self::Backend => 3001,
            Self::Other => 9999,
        }
    }
}

impl AppError {
    pub fn new(kind: ErrorKind, payload: BTreeMap<String, String>) -> Self {
        Self { payload, kind }
    }

    /// Create an error with a single "detail" key from a non-empty string,
    /// or an empty payload if the string is empty.
    fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let payload = if detail.is_empty() {
            BTreeMap::new()
        } else {
            BTreeMap::from([("detail".to_string(), detail)])
        };
        Self::new(kind, payload)
    }

    pub fn stack_not_found(id: &str) -> Self {
        Self::new(
            ErrorKind::StackNotFound,
            BTreeMap::from([("id".to_string(), id.to_string())]),
        )
    }

    pub fn plugin_not_found(stack_id: &str, plugin_type: &str) -> Self {
        Self::new(
            ErrorKind::PluginNotFound,
            BTreeMap::from([
                ("stack".to_string(), stack_id.to_string()),
                ("type".to_string(), plugin_type.to_string()),
            ]),
        )
    }

    pub fn action_not_allowed(action: &str, status: &str) -> Self {
        Self::new(
            ErrorKind::ActionNotAllowed,
            BTreeMap::from([
                ("action".to_string(), action.to_string()),
                ("status".to_string(), status.to_string()),
            ]),
        )
    }

    pub fn command_in_flight(stack_id: &str, command: &str) -> Self {
        Self::new(
            ErrorKind::CommandInFlight,
            BTreeMap::from([
                ("stack".to_string(), stack_id.to_string()),
                ("command".to_string(), command.to_string()),
            ]),
        )
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Validation,
            BTreeMap::from([
                ("field".to_string(), field.to_string()),
                ("detail".to_string(), message.into()),
            ]),
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Io, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Network, message)
    }

    pub fn network_with_url(url: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Network,
            BTreeMap::from([
                ("url".to_string(), url.to_string()),
                ("detail".to_string(), detail.into()),
            ]),
        )
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Backend, message)
    }

    pub fn backend_with_url(url: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Backend,
            BTreeMap::from([
                ("url".to_string(), url.to_string()),
                ("detail".to_string(), detail.into()),
            ]),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Other, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn payload(&self) -> &BTreeMap<String, String> {
        &self.payload
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            let pairs: Vec<String> = self
                .payload
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "{:?}: {}", self.kind, pairs.join(", "))
        }
    }
}

impl std::error::Error for AppError {}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct as _;
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("code", &self.kind.code())?;
        s.serialize_field("payload", &self.payload)?;
        s.end()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::backend(err.to_string())
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
