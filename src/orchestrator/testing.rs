//! In-memory backend for orchestrator tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::backend::Backend;
use crate::deployment::Deployment;
use crate::error::{AppError, Result};
use crate::plugin::{Plugin, PluginConfig, PluginInfo, PluginType};
use crate::stack::{CreateStackRequest, Stack, StackConfig, UpdateStackRequest};
use crate::status::StackStatus;

#[derive(Default)]
struct State {
    stacks: HashMap<String, Stack>,
    deployments: HashMap<String, Vec<Deployment>>,
    plugins: HashMap<String, Vec<Plugin>>,
    read_failure: Option<AppError>,
    command_failure: Option<AppError>,
    forget_on_delete: bool,
    silent_plugins: bool,
    hold: Option<Arc<Semaphore>>,
    calls: usize,
    last_plugin_payload: Option<PluginConfig>,
}

/// Applies commands the way the provisioning backend reports them: stop
/// settles to `Stopped`, resume restarts deployment, delete starts
/// terminating.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<State>,
}

pub(crate) fn stack(id: &str, status: StackStatus) -> Stack {
    Stack {
        id: id.to_string(),
        name: format!("thanos-{}", id),
        network: "Testnet".to_string(),
        config: StackConfig::default(),
        deployment_path: format!("/deployments/{}", id),
        status,
        metadata: None,
    }
}

pub(crate) fn plugin(plugin_type: PluginType, status: StackStatus) -> Plugin {
    Plugin {
        id: format!("{}-{}", plugin_type, status.as_str()),
        plugin_type,
        status,
        stack_id: "s1".to_string(),
        config: PluginConfig::new(),
        info: PluginInfo::default(),
        log_path: None,
    }
}

pub(crate) fn create_request(chain_name: &str) -> CreateStackRequest {
    CreateStackRequest {
        network: "Testnet".to_string(),
        chain_name: chain_name.to_string(),
        l1_rpc_url: "https://rpc.example.com".to_string(),
        l1_beacon_url: "https://beacon.example.com".to_string(),
        l2_block_time: 2,
        batch_submission_frequency: 1440,
        output_root_frequency: 240,
        challenge_period: 12,
        admin_account: format!("0x{}", "a".repeat(40)),
        sequencer_account: format!("0x{}", "b".repeat(40)),
        batcher_account: format!("0x{}", "c".repeat(40)),
        proposer_account: format!("0x{}", "d".repeat(40)),
        aws_access_key: "AKIA".to_string(),
        aws_secret_access_key: "secret".to_string(),
        aws_region: "ap-northeast-2".to_string(),
        deployment_path: None,
    }
}

impl FakeBackend {
    pub(crate) fn with_stack(id: &str, status: StackStatus) -> Self {
        let backend = Self::default();
        backend.state().stacks.insert(id.to_string(), stack(id, status));
        backend
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn add_plugin(&self, stack_id: &str, plugin: Plugin) {
        self.state()
            .plugins
            .entry(stack_id.to_string())
            .or_default()
            .push(plugin);
    }

    pub(crate) fn fail_next_read(&self, error: AppError) {
        self.state().read_failure = Some(error);
    }

    pub(crate) fn fail_next_command(&self, error: AppError) {
        self.state().command_failure = Some(error);
    }

    /// Make `delete_stack` remove the stack outright.
    pub(crate) fn forget_on_delete(&self) {
        self.state().forget_on_delete = true;
    }

    /// Plugin commands succeed without echoing the plugin back.
    pub(crate) fn silent_plugin_commands(&self) {
        self.state().silent_plugins = true;
    }

    /// Block every mutating command until a permit is added.
    pub(crate) fn hold_commands(&self) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        self.state().hold = Some(Arc::clone(&semaphore));
        semaphore
    }

    /// Mutating calls that reached the backend.
    pub(crate) fn calls(&self) -> usize {
        self.state().calls
    }

    pub(crate) fn last_plugin_payload(&self) -> Option<PluginConfig> {
        self.state().last_plugin_payload.clone()
    }

    fn read(&self) -> Result<()> {
        let failure = self.state().read_failure.take();
        failure.map_or(Ok(()), Err)
    }

    async fn command(&self) -> Result<()> {
        let hold = {
            let mut state = self.state();
            state.calls += 1;
            state.hold.as_ref().map(Arc::clone)
        };
        if let Some(hold) = hold {
            let _permit = hold
                .acquire()
                .await
                .map_err(|e| AppError::other(e.to_string()))?;
        }
        let failure = self.state().command_failure.take();
        failure.map_or(Ok(()), Err)
    }

    fn set_status(&self, stack_id: &str, status: StackStatus) -> Result<()> {
        let mut state = self.state();
        let stack = state
            .stacks
            .get_mut(stack_id)
            .ok_or_else(|| AppError::stack_not_found(stack_id))?;
        stack.status = status;
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_stacks(&self) -> Result<Vec<Stack>> {
        self.read()?;
        let mut stacks: Vec<Stack> = self.state().stacks.values().cloned().collect();
        stacks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stacks)
    }

    async fn get_stack(&self, stack_id: &str) -> Result<Stack> {
        self.read()?;
        self.state()
            .stacks
            .get(stack_id)
            .cloned()
            .ok_or_else(|| AppError::stack_not_found(stack_id))
    }

    async fn get_deployments(&self, stack_id: &str) -> Result<Vec<Deployment>> {
        Ok(self
            .state()
            .deployments
            .get(stack_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_plugins(&self, stack_id: &str) -> Result<Vec<Plugin>> {
        Ok(self.state().plugins.get(stack_id).cloned().unwrap_or_default())
    }

    async fn create_stack(&self, request: &CreateStackRequest) -> Result<Stack> {
        self.command().await?;
        let mut state = self.state();
        let id = format!("stack-{}", state.stacks.len() + 1);
        let mut created = stack(&id, StackStatus::Pending);
        created.config.chain_name = request.chain_name.clone();
        created.config.network = request.network.clone();
        state.stacks.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_stack(&self, stack_id: &str) -> Result<()> {
        self.command().await?;
        let forget = self.state().forget_on_delete;
        if forget {
            self.state().stacks.remove(stack_id);
            return Ok(());
        }
        self.set_status(stack_id, StackStatus::Terminating)
    }

    async fn resume_stack(&self, stack_id: &str) -> Result<()> {
        self.command().await?;
        self.set_status(stack_id, StackStatus::Deploying)
    }

    async fn stop_stack(&self, stack_id: &str) -> Result<()> {
        self.command().await?;
        self.set_status(stack_id, StackStatus::Stopped)
    }

    async fn update_stack(&self, stack_id: &str, request: &UpdateStackRequest) -> Result<Stack> {
        self.command().await?;
        let mut state = self.state();
        let stack = state
            .stacks
            .get_mut(stack_id)
            .ok_or_else(|| AppError::stack_not_found(stack_id))?;
        stack.status = StackStatus::Updating;
        stack.config.l1_rpc_url = request.l1_rpc_url.clone();
        stack.config.l1_beacon_url = request.l1_beacon_url.clone();
        Ok(stack.clone())
    }

    async fn create_plugin(
        &self,
        stack_id: &str,
        plugin_type: &PluginType,
        config: &PluginConfig,
    ) -> Result<Option<Plugin>> {
        self.command().await?;
        let mut state = self.state();
        state.last_plugin_payload = Some(config.clone());
        let created = Plugin {
            id: uuid::Uuid::new_v4().to_string(),
            plugin_type: plugin_type.clone(),
            status: StackStatus::Pending,
            stack_id: stack_id.to_string(),
            config: config.clone(),
            info: PluginInfo::default(),
            log_path: None,
        };
        state
            .plugins
            .entry(stack_id.to_string())
            .or_default()
            .push(created.clone());
        Ok((!state.silent_plugins).then_some(created))
    }

    async fn delete_plugin(
        &self,
        stack_id: &str,
        plugin_type: &PluginType,
    ) -> Result<Option<Plugin>> {
        self.command().await?;
        let mut state = self.state();
        let silent = state.silent_plugins;
        let plugin = state
            .plugins
            .get_mut(stack_id)
            .and_then(|plugins| {
                plugins
                    .iter_mut()
                    .find(|p| &p.plugin_type == plugin_type && !p.status.is_terminated())
            })
            .ok_or_else(|| AppError::plugin_not_found(stack_id, plugin_type.as_str()))?;
        plugin.status = StackStatus::Terminating;
        Ok((!silent).then(|| plugin.clone()))
    }
}
