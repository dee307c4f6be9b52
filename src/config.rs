use std::fs;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::paths::{config_path, ensure_data_dirs};

/// Overrides `api_base_url` for the current process without being saved.
pub const API_URL_ENV: &str = "ROLLUP_CONSOLE_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_API_PREFIX: &str = "/api/v1/stacks/thanos";

static CONFIG_LOCK: Mutex<()> = Mutex::new(());
static CONFIG_CACHE: OnceLock<RwLock<Arc<AppConfig>>> = OnceLock::new();

fn load_config_from_disk() -> Result<AppConfig> {
    let path = config_path();
    if !path.exists() {
        let config = AppConfig::default();
        save_config_to_disk(&config)?;
        return Ok(config);
    }
    let content = fs::read_to_string(&path).map_err(|e| AppError::config(e.to_string()))?;
    AppConfig::from_toml(&content)
}

fn save_config_to_disk(config: &AppConfig) -> Result<()> {
    ensure_data_dirs()?;
    let content = config.to_toml()?;
    fs::write(config_path(), content).map_err(|e| AppError::config(e.to_string()))
}

fn get_config_cache() -> Result<&'static RwLock<Arc<AppConfig>>> {
    if let Some(cache) = CONFIG_CACHE.get() {
        return Ok(cache);
    }

    let config = load_config_from_disk()?;
    let _ = CONFIG_CACHE.set(RwLock::new(Arc::new(config)));

    CONFIG_CACHE
        .get()
        .ok_or_else(|| AppError::config("CONFIG_CACHE not initialized"))
}

/// Execute a read-modify-write operation on the config file while holding a lock.
/// This prevents concurrent modifications from causing data loss.
pub fn with_config_mut<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut AppConfig) -> Result<T>,
{
    let _guard = CONFIG_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let cache = get_config_cache()?;

    let current = {
        let config = cache.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&config)
    };

    let mut updated = (*current).clone();
    let result = f(&mut updated)?;
    save_config_to_disk(&updated)?;

    *cache.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(updated);

    Ok(result)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_output: bool,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_prefix: default_api_prefix(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
            json_output: false,
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AppError::config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AppError::config(e.to_string()))
    }

    /// Base URL with the environment override applied.
    pub fn effective_api_base_url(&self) -> String {
        resolve_api_base_url(
            &self.api_base_url,
            std::env::var(API_URL_ENV).ok().as_deref(),
        )
    }

    /// Full URL of the stacks collection, e.g. `http://localhost:8000/api/v1/stacks/thanos`.
    pub fn stacks_url(&self) -> String {
        self.stacks_url_at(&self.effective_api_base_url())
    }

    /// Stacks URL under a base that is not saved yet.
    pub fn stacks_url_at(&self, base: &str) -> String {
        join_url(base, &self.api_prefix)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn resolve_api_base_url(configured: &str, env_override: Option<&str>) -> String {
    match env_override.map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ if configured.trim().is_empty() => default_api_base_url(),
        _ => configured.to_string(),
    }
}

fn join_url(base: &str, prefix: &str) -> String {
    let base = base.trim_end_matches('/');
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, prefix)
    }
}

pub fn load_config() -> Result<Arc<AppConfig>> {
    let cache = get_config_cache()?;
    let config = cache.read().unwrap_or_else(|e| e.into_inner());
    Ok(Arc::clone(&config))
}

#[cfg(test)]
mod tests {
    use super::{join_url, resolve_api_base_url, AppConfig};

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = AppConfig::from_toml("json_output = true\n").expect("parse");
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.api_prefix, "/api/v1/stacks/thanos");
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.json_output);
    }

    #[test]
    fn test_toml_survives_save_and_load() {
        let config = AppConfig {
            api_base_url: "https://console.example.com".to_string(),
            ..AppConfig::default()
        };
        let reloaded = AppConfig::from_toml(&config.to_toml().expect("serialize")).expect("parse");
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_env_override_wins_over_configured_url() {
        assert_eq!(
            resolve_api_base_url("http://a", Some("http://b")),
            "http://b"
        );
        assert_eq!(resolve_api_base_url("http://a", Some("  ")), "http://a");
        assert_eq!(resolve_api_base_url("", None), "http://localhost:8000");
    }

    #[test]
    fn test_join_url_normalizes_slashes() {
        assert_eq!(
            join_url("http://localhost:8000/", "/api/v1/stacks/thanos"),
            "http://localhost:8000/api/v1/stacks/thanos"
        );
        assert_eq!(join_url("http://host", ""), "http://host");
    }
}
