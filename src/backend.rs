//! Backend REST contract and its HTTP implementation.
//!
//! Every response is wrapped in an envelope `{message, status, data}`. A
//! response whose `data` lacks the expected field is a [`ErrorKind::Backend`]
//! error, never a panic.
//!
//! [`ErrorKind::Backend`]: crate::error::ErrorKind::Backend

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::AppConfig;
use crate::deployment::Deployment;
use crate::error::{AppError, Result};
use crate::plugin::{Plugin, PluginConfig, PluginType};
use crate::stack::{CreateStackRequest, Stack, UpdateStackRequest};

const USER_AGENT: &str = concat!("rollup-console/", env!("CARGO_PKG_VERSION"));

/// Operations the console issues against the provisioning backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_stacks(&self) -> Result<Vec<Stack>>;
    async fn get_stack(&self, stack_id: &str) -> Result<Stack>;
    async fn get_deployments(&self, stack_id: &str) -> Result<Vec<Deployment>>;
    async fn get_plugins(&self, stack_id: &str) -> Result<Vec<Plugin>>;

    async fn create_stack(&self, request: &CreateStackRequest) -> Result<Stack>;
    async fn delete_stack(&self, stack_id: &str) -> Result<()>;
    async fn resume_stack(&self, stack_id: &str) -> Result<()>;
    async fn stop_stack(&self, stack_id: &str) -> Result<()>;
    async fn update_stack(&self, stack_id: &str, request: &UpdateStackRequest) -> Result<Stack>;

    /// Returns the created plugin when the backend echoes it back.
    async fn create_plugin(
        &self,
        stack_id: &str,
        plugin_type: &PluginType,
        config: &PluginConfig,
    ) -> Result<Option<Plugin>>;
    /// Returns the departing plugin when the backend echoes it back.
    async fn delete_plugin(&self, stack_id: &str, plugin_type: &PluginType)
        -> Result<Option<Plugin>>;
}

/// [`Backend`] over JSON/HTTP.
pub struct HttpBackend {
    client: Client,
    stacks_url: String,
}

impl HttpBackend {
    pub fn new(client: Client, stacks_url: impl Into<String>) -> Self {
        Self {
            client,
            stacks_url: stacks_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::with_url(config, config.stacks_url())
    }

    /// Client with the configured timeout pointed at an arbitrary stacks URL.
    pub fn with_url(config: &AppConfig, stacks_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::new(client, stacks_url))
    }

    pub fn stacks_url(&self) -> &str {
        &self.stacks_url
    }

    fn stack_url(&self, stack_id: &str) -> String {
        format!("{}/{}", self.stacks_url, stack_id)
    }

    fn plugin_url(&self, stack_id: &str, plugin_type: &PluginType) -> String {
        format!("{}/{}/integrations/{}", self.stacks_url, stack_id, plugin_type)
    }

    /// Check that the stacks endpoint answers successfully.
    pub async fn ping(&self) -> Result<()> {
        let resp = self
            .client
            .get(&self.stacks_url)
            .send()
            .await
            .map_err(|e| AppError::network_with_url(&self.stacks_url, e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AppError::network_with_url(
                &self.stacks_url,
                resp.status().to_string(),
            ));
        }
        Ok(())
    }

    async fn send(&self, request: RequestBuilder, url: &str, not_found: AppError) -> Result<Value> {
        let resp = request
            .send()
            .await
            .map_err(|e| AppError::network_with_url(url, e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AppError::network_with_url(url, e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(not_found);
        }
        if !status.is_success() {
            let detail = match envelope_message(&body) {
                Some(message) => format!("{}: {}", status, message),
                None => status.to_string(),
            };
            return Err(AppError::backend_with_url(url, detail));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| AppError::backend_with_url(url, e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_stacks(&self) -> Result<Vec<Stack>> {
        let url = self.stacks_url.clone();
        let body = self
            .send(self.client.get(&url), &url, AppError::backend_with_url(&url, "404 Not Found"))
            .await?;
        extract_data(&url, body, "stacks")
    }

    async fn get_stack(&self, stack_id: &str) -> Result<Stack> {
        let url = self.stack_url(stack_id);
        let body = self
            .send(self.client.get(&url), &url, AppError::stack_not_found(stack_id))
            .await?;
        extract_data(&url, body, "stack")
    }

    async fn get_deployments(&self, stack_id: &str) -> Result<Vec<Deployment>> {
        let url = format!("{}/deployments", self.stack_url(stack_id));
        let body = self
            .send(self.client.get(&url), &url, AppError::stack_not_found(stack_id))
            .await?;
        extract_data(&url, body, "deployments")
    }

    async fn get_plugins(&self, stack_id: &str) -> Result<Vec<Plugin>> {
        let url = format!("{}/integrations", self.stack_url(stack_id));
        let body = self
            .send(self.client.get(&url), &url, AppError::stack_not_found(stack_id))
            .await?;
        extract_data(&url, body, "integrations")
    }

    async fn create_stack(&self, request: &CreateStackRequest) -> Result<Stack> {
        let url = self.stacks_url.clone();
        let body = self
            .send(
                self.client.post(&url).json(request),
                &url,
                AppError::backend_with_url(&url, "404 Not Found"),
            )
            .await?;
        extract_data(&url, body, "stack")
    }

    async fn delete_stack(&self, stack_id: &str) -> Result<()> {
        let url = self.stack_url(stack_id);
        self.send(self.client.delete(&url), &url, AppError::stack_not_found(stack_id))
            .await?;
        Ok(())
    }

    async fn resume_stack(&self, stack_id: &str) -> Result<()> {
        let url = format!("{}/resume", self.stack_url(stack_id));
        self.send(self.client.post(&url), &url, AppError::stack_not_found(stack_id))
            .await?;
        Ok(())
    }

    async fn stop_stack(&self, stack_id: &str) -> Result<()> {
        let url = format!("{}/stop", self.stack_url(stack_id));
        self.send(self.client.post(&url), &url, AppError::stack_not_found(stack_id))
            .await?;
        Ok(())
    }

    async fn update_stack(&self, stack_id: &str, request: &UpdateStackRequest) -> Result<Stack> {
        let url = self.stack_url(stack_id);
        let body = self
            .send(
                self.client.put(&url).json(request),
                &url,
                AppError::stack_not_found(stack_id),
            )
            .await?;
        extract_data(&url, body, "stack")
    }

    async fn create_plugin(
        &self,
        stack_id: &str,
        plugin_type: &PluginType,
        config: &PluginConfig,
    ) -> Result<Option<Plugin>> {
        let url = self.plugin_url(stack_id, plugin_type);
        let body = self
            .send(
                self.client.post(&url).json(config),
                &url,
                AppError::stack_not_found(stack_id),
            )
            .await?;
        extract_optional_data(&url, body, "integration")
    }

    async fn delete_plugin(
        &self,
        stack_id: &str,
        plugin_type: &PluginType,
    ) -> Result<Option<Plugin>> {
        let url = self.plugin_url(stack_id, plugin_type);
        let body = self
            .send(
                self.client.delete(&url),
                &url,
                AppError::plugin_not_found(stack_id, plugin_type.as_str()),
            )
            .await?;
        extract_optional_data(&url, body, "integration")
    }
}

/// Pull `data.<key>` out of an envelope, failing if either level is missing.
fn extract_data<T: DeserializeOwned>(url: &str, body: Value, key: &str) -> Result<T> {
    extract_optional_data(url, body, key)?
        .ok_or_else(|| AppError::backend_with_url(url, format!("response is missing data.{}", key)))
}

fn extract_optional_data<T: DeserializeOwned>(url: &str, body: Value, key: &str) -> Result<Option<T>> {
    let field = match body {
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Object(mut data)) => data.remove(key),
            _ => None,
        },
        _ => None,
    };
    match field {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AppError::backend_with_url(url, format!("data.{}: {}", key, e))),
    }
}

fn envelope_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use reqwest::Client;
    use serde_json::json;

    use super::{envelope_message, extract_data, extract_optional_data, HttpBackend};
    use crate::error::ErrorKind;
    use crate::plugin::{Plugin, PluginType};
    use crate::stack::Stack;
    use crate::status::StackStatus;

    #[test]
    fn test_extracts_stack_from_envelope() {
        let body = json!({
            "message": "ok",
            "status": "success",
            "data": {"stack": {"id": "s1", "status": "Deploying"}}
        });
        let stack: Stack = extract_data("u", body, "stack").expect("stack");
        assert_eq!(stack.status, StackStatus::Deploying);
    }

    #[test]
    fn test_missing_data_is_backend_error() {
        let err = extract_data::<Stack>("u", json!({"message": "ok"}), "stack")
            .expect_err("missing data");
        assert_eq!(err.kind(), ErrorKind::Backend);

        let err = extract_data::<Vec<Stack>>("u", json!({"data": {}}), "stacks")
            .expect_err("missing field");
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.payload()["detail"], "response is missing data.stacks");
    }

    #[test]
    fn test_malformed_payload_is_backend_error() {
        let body = json!({"data": {"stack": {"status": "Deployed"}}});
        let err = extract_data::<Stack>("u", body, "stack").expect_err("no id");
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn test_optional_plugin_echo() {
        let none: Option<Plugin> =
            extract_optional_data("u", serde_json::Value::Null, "integration").expect("ok");
        assert!(none.is_none());

        let body = json!({"data": {"integration": {"type": "bridge", "status": "Pending"}}});
        let some: Option<Plugin> = extract_optional_data("u", body, "integration").expect("ok");
        assert_eq!(some.map(|p| p.plugin_type), Some(PluginType::Bridge));
    }

    #[test]
    fn test_envelope_message() {
        assert_eq!(
            envelope_message(r#"{"message":"stack is busy","status":"error"}"#),
            Some("stack is busy".to_string())
        );
        assert_eq!(envelope_message("<html>"), None);
    }

    #[test]
    fn test_urls_follow_rest_layout() {
        let backend = HttpBackend::new(Client::new(), "http://localhost:8000/api/v1/stacks/thanos/");
        assert_eq!(backend.stacks_url(), "http://localhost:8000/api/v1/stacks/thanos");
        assert_eq!(
            backend.stack_url("s1"),
            "http://localhost:8000/api/v1/stacks/thanos/s1"
        );
        assert_eq!(
            backend.plugin_url("s1", &PluginType::BlockExplorer),
            "http://localhost:8000/api/v1/stacks/thanos/s1/integrations/block-explorer"
        );
    }
}
