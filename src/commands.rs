use std::fs;
use std::future::Future;
use std::path::Path;

use clap::Subcommand;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::backend::HttpBackend;
use crate::config::{load_config, with_config_mut, AppConfig};
use crate::error::{AppError, Result};
use crate::gate::{ActionState, StackActions};
use crate::orchestrator::{Notification, NotificationLevel, Orchestrator, StackSnapshot};
use crate::plugin::{ExplorerConfig, MonitoringConfig, PluginInstallRequest, PluginType};
use crate::stack::{CreateStackRequest, Stack, UpdateStackRequest};
use crate::status::StatusClass;
use crate::validation::{
    parse_candidate_registry, validate_api_base_url, validate_create_request,
    validate_explorer_config, validate_monitoring_config, validate_stack_id,
    validate_update_request,
};

const RESET: &str = "\x1b[0m";

pub struct AppState {
    pub orchestrator: Orchestrator<HttpBackend>,
    pub json_output: bool,
}

impl AppState {
    pub fn new(config: &AppConfig, json_output: bool) -> Result<Self> {
        Ok(Self {
            orchestrator: Orchestrator::new(HttpBackend::from_config(config)?),
            json_output,
        })
    }

    fn print<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json_output {
            print_json(value)
        } else {
            human(value);
            Ok(())
        }
    }
}

/// Plugin kinds that can be installed, with the fields each one asks for.
#[derive(Debug, Clone, Subcommand)]
pub enum InstallTarget {
    /// Thanos Bridge
    Bridge,
    /// Thanos Explorer
    BlockExplorer {
        #[arg(long)]
        database_username: String,
        #[arg(long)]
        database_password: String,
        #[arg(long)]
        coin_market_cap_key: String,
        #[arg(long)]
        wallet_connect_id: String,
    },
    /// Monitoring
    Monitoring {
        #[arg(long)]
        grafana_password: String,
    },
    /// DAO Candidate Registry
    CandidateRegistry {
        /// Staking amount in TON
        #[arg(long)]
        amount: String,
        #[arg(long)]
        memo: String,
        #[arg(long)]
        name_info: String,
    },
}

impl InstallTarget {
    fn into_request(self) -> Result<PluginInstallRequest> {
        match self {
            Self::Bridge => Ok(PluginInstallRequest::Bridge),
            Self::BlockExplorer {
                database_username,
                database_password,
                coin_market_cap_key,
                wallet_connect_id,
            } => {
                let config = ExplorerConfig {
                    database_username,
                    database_password,
                    coin_market_cap_key,
                    wallet_connect_id,
                };
                validate_explorer_config(&config)?;
                Ok(PluginInstallRequest::BlockExplorer(config))
            }
            Self::Monitoring { grafana_password } => {
                let config = MonitoringConfig { grafana_password };
                validate_monitoring_config(&config)?;
                Ok(PluginInstallRequest::Monitoring(config))
            }
            Self::CandidateRegistry {
                amount,
                memo,
                name_info,
            } => Ok(PluginInstallRequest::CandidateRegistry(
                parse_candidate_registry(&amount, &memo, &name_info)?,
            )),
        }
    }
}

// === Stacks ===

pub async fn list_stacks(state: &AppState) -> Result<()> {
    let stacks = state.orchestrator.list_stacks().await?;
    state.print(&stacks, |stacks| {
        if stacks.is_empty() {
            println!("No stacks yet.");
            return;
        }
        for stack in stacks {
            println!(
                "{:<38} {:<24} {:<8} {}",
                stack.id,
                stack.display_name(),
                stack.network,
                badge(stack.status.class(), stack.status.display_label())
            );
        }
    })
}

pub async fn show_stack(state: &AppState, stack_id: &str) -> Result<()> {
    let snapshot = state.orchestrator.snapshot(stack_id).await?;
    state.print(&snapshot, print_stack_detail)
}

/// Deployment steps with their progress, plus each step's recorded config.
pub async fn show_steps(state: &AppState, stack_id: &str) -> Result<()> {
    let snapshot = state.orchestrator.snapshot(stack_id).await?;
    let deployments = state
        .orchestrator
        .view(stack_id)
        .map(|view| view.deployments)
        .unwrap_or_default();

    if state.json_output {
        return print_json(&serde_json::json!({
            "steps": snapshot.steps,
            "progress": snapshot.progress,
            "deployments": deployments,
        }));
    }

    let progress = &snapshot.progress;
    println!(
        "{} of {} steps completed ({}%)",
        progress.completed, progress.total, progress.percent
    );
    for step in &snapshot.steps {
        println!(
            "  {}. {:<32} {}",
            step.step,
            step.label,
            badge(step.status.class(), step.status.display_label())
        );
        if let Some(deployment) = deployments.iter().rev().find(|d| d.step == step.step) {
            if !deployment.log_path.is_empty() {
                println!("     log: {}", deployment.log_path);
            }
            for (key, value) in &deployment.config {
                println!("     {}: {}", key, value);
            }
        }
    }
    Ok(())
}

/// Read a create-stack request from a `.json` or `.toml` file.
pub fn read_create_request(path: &Path) -> Result<CreateStackRequest> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("{}: {}", path.display(), e)))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let request = if is_json {
        serde_json::from_str(&content)
            .map_err(|e| AppError::validation("file", e.to_string()))?
    } else {
        toml::from_str(&content).map_err(|e| AppError::validation("file", e.to_string()))?
    };
    Ok(request)
}

pub async fn create_stack(state: &AppState, file: &Path) -> Result<()> {
    let request = read_create_request(file)?;
    validate_create_request(&request)?;
    let stack = run_reporting(state, state.orchestrator.create_stack(&request)).await?;
    state.print(&stack, print_stack_line)
}

pub async fn destroy_stack(state: &AppState, stack_id: &str) -> Result<()> {
    run_reporting(state, state.orchestrator.delete_stack(stack_id)).await?;
    print_current(state, stack_id)
}

pub async fn resume_stack(state: &AppState, stack_id: &str) -> Result<()> {
    run_reporting(state, state.orchestrator.resume_stack(stack_id)).await?;
    print_current(state, stack_id)
}

pub async fn stop_stack(state: &AppState, stack_id: &str) -> Result<()> {
    run_reporting(state, state.orchestrator.stop_stack(stack_id)).await?;
    print_current(state, stack_id)
}

pub async fn update_stack(
    state: &AppState,
    stack_id: &str,
    l1_rpc_url: String,
    l1_beacon_url: String,
) -> Result<()> {
    let request = UpdateStackRequest {
        l1_rpc_url,
        l1_beacon_url,
    };
    validate_update_request(&request)?;
    let stack = run_reporting(state, state.orchestrator.update_stack(stack_id, &request)).await?;
    state.print(&stack, print_stack_line)
}

// === Plugins ===

pub async fn list_plugins(state: &AppState, stack_id: &str) -> Result<()> {
    let snapshot = state.orchestrator.snapshot(stack_id).await?;
    if state.json_output {
        return print_json(&serde_json::json!({
            "options": snapshot.plugin_options,
            "plugins": snapshot.plugins,
        }));
    }
    print_plugins(&snapshot);
    Ok(())
}

pub async fn install_plugin(state: &AppState, stack_id: &str, target: InstallTarget) -> Result<()> {
    let request = target.into_request()?;
    run_reporting(state, state.orchestrator.create_plugin(stack_id, request)).await?;
    list_plugins(state, stack_id).await
}

pub async fn reinstall_plugin(state: &AppState, stack_id: &str, plugin_type: &str) -> Result<()> {
    let plugin_type = parse_plugin_type(plugin_type)?;
    run_reporting(state, state.orchestrator.reinstall_plugin(stack_id, &plugin_type)).await?;
    list_plugins(state, stack_id).await
}

pub async fn uninstall_plugin(state: &AppState, stack_id: &str, plugin_type: &str) -> Result<()> {
    let plugin_type = parse_plugin_type(plugin_type)?;
    run_reporting(state, state.orchestrator.delete_plugin(stack_id, &plugin_type)).await?;
    list_plugins(state, stack_id).await
}

fn parse_plugin_type(raw: &str) -> Result<PluginType> {
    PluginType::from_str_id(raw).ok_or_else(|| {
        AppError::validation(
            "type",
            "Expected bridge, block-explorer, monitoring or candidate-registry",
        )
    })
}

// === Config ===

pub fn show_config(json_output: bool) -> Result<()> {
    let config = load_config()?;
    if json_output {
        return print_json(&*config);
    }
    println!("api_base_url         = {}", config.api_base_url);
    println!("api_prefix           = {}", config.api_prefix);
    println!("request_timeout_secs = {}", config.request_timeout_secs);
    println!("log_level            = {}", config.log_level);
    println!("json_output          = {}", config.json_output);
    println!("stacks endpoint      = {}", config.stacks_url());
    Ok(())
}

pub async fn save_api_base_url(api_base_url: String) -> Result<()> {
    validate_api_base_url(&api_base_url)?;

    // Test connectivity first
    let config = load_config()?;
    let backend = HttpBackend::with_url(&config, config.stacks_url_at(&api_base_url))?;
    backend.ping().await?;

    // Test passed, save
    with_config_mut(move |config| {
        config.api_base_url = api_base_url;
        Ok(())
    })
}

pub fn save_request_timeout(request_timeout_secs: u64) -> Result<()> {
    if request_timeout_secs == 0 {
        return Err(AppError::validation(
            "request_timeout_secs",
            "Must be greater than 0",
        ));
    }
    with_config_mut(move |config| {
        config.request_timeout_secs = request_timeout_secs;
        Ok(())
    })
}

// === Output ===

/// Await a command and print the notifications it produced.
async fn run_reporting<T: Send>(
    state: &AppState,
    command: impl Future<Output = Result<T>> + Send,
) -> Result<T> {
    let mut notifications = state.orchestrator.subscribe_notifications();
    let result = command.await;
    drain_notifications(&mut notifications);
    result
}

fn drain_notifications(rx: &mut broadcast::Receiver<Notification>) {
    while let Ok(notification) = rx.try_recv() {
        let class = match notification.level {
            NotificationLevel::Success => StatusClass::Success,
            NotificationLevel::Error => StatusClass::Error,
        };
        eprintln!("{}{}{}", class.ansi_color(), notification.message, RESET);
    }
}

fn print_current(state: &AppState, stack_id: &str) -> Result<()> {
    validate_stack_id(stack_id)?;
    match state.orchestrator.view(stack_id) {
        Some(view) => state.print(&view.stack, print_stack_line),
        None if state.json_output => print_json(&serde_json::json!({ "id": stack_id, "removed": true })),
        None => {
            println!("Stack {} is gone", stack_id);
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).map_err(|e| AppError::other(e.to_string()))?;
    println!("{}", out);
    Ok(())
}

pub fn badge(class: StatusClass, label: &str) -> String {
    format!("{}● {}{}", class.ansi_color(), label, RESET)
}

fn print_stack_line(stack: &Stack) {
    println!(
        "{} ({}) {}",
        stack.display_name(),
        stack.id,
        badge(stack.status.class(), stack.status.display_label())
    );
}

fn print_stack_detail(snapshot: &StackSnapshot) {
    let stack = &snapshot.stack;
    println!("{} ({})", stack.display_name(), stack.id);
    println!("  Status:   {}", badge(snapshot.status_class, &snapshot.status_label));
    println!("  Network:  {}", stack.network);
    if !stack.config.l1_rpc_url.is_empty() {
        println!("  L1 RPC:   {}", stack.config.l1_rpc_url);
    }
    if let Some(url) = stack.l2_url() {
        println!("  L2 RPC:   {}", url);
    }
    if let Some(metadata) = &stack.metadata {
        if let Some(url) = &metadata.bridge_url {
            println!("  Bridge:   {}", url);
        }
        if let Some(url) = &metadata.block_explorer_url {
            println!("  Explorer: {}", url);
        }
    }
    println!(
        "  Progress: {}/{} steps ({}%)",
        snapshot.progress.completed, snapshot.progress.total, snapshot.progress.percent
    );
    println!("  Actions:  {}", format_actions(&snapshot.actions));
    if !snapshot.plugins.is_empty() {
        println!("  Plugins:");
        for entry in &snapshot.plugins {
            println!(
                "    {:<24} {}",
                entry.label,
                badge(entry.status_class, &entry.status_label)
            );
        }
    }
}

fn print_plugins(snapshot: &StackSnapshot) {
    println!("Available:");
    for option in &snapshot.plugin_options {
        let note = match (option.installed, option.enabled) {
            (true, _) => "installed",
            (false, true) => "",
            (false, false) => "unavailable",
        };
        println!("  {:<20} {:<24} {}", option.plugin_type, option.label, note);
    }
    if snapshot.plugins.is_empty() {
        return;
    }
    println!("Installed:");
    for entry in &snapshot.plugins {
        let mut buttons = Vec::new();
        for (name, action) in [
            ("uninstall", entry.affordance.uninstall),
            ("reinstall", entry.affordance.reinstall),
        ] {
            match action {
                ActionState::Enabled => buttons.push(name.to_string()),
                ActionState::Disabled => buttons.push(format!("[{}]", name)),
                ActionState::Hidden => {}
            }
        }
        let url = entry.plugin.info.url.as_str();
        println!(
            "  {:<24} {} {} {}",
            entry.label,
            badge(entry.status_class, &entry.status_label),
            url,
            buttons.join(" ")
        );
    }
}

/// Offered actions, disabled ones in brackets.
pub fn format_actions(actions: &StackActions) -> String {
    let offered = actions.offered();
    if offered.is_empty() {
        return "none".to_string();
    }
    offered
        .into_iter()
        .map(|action| {
            if actions.allows(action) {
                action.to_string()
            } else {
                format!("[{}]", action)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
