//! Plugin install and uninstall commands.

use super::client::Orchestrator;
use super::snapshot::effective_plugin_flags;
use super::types::{Command, NotificationLevel};
use crate::backend::Backend;
use crate::error::{AppError, Result};
use crate::plugin::{
    find_live, find_reinstallable, is_installable, is_uninstallable, reinstall_request, Plugin,
    PluginInstallRequest, PluginType,
};
use crate::validation::validate_stack_id;

impl<B: Backend> Orchestrator<B> {
    /// Install a plugin on a stack. Refused while the stack is updating,
    /// while another plugin command is outstanding, or while a live instance
    /// of the same type exists.
    pub async fn create_plugin(&self, stack_id: &str, request: PluginInstallRequest) -> Result<()> {
        validate_stack_id(stack_id)?;
        let plugin_type = request.plugin_type();
        let view = self.ensure_view(stack_id).await?;

        let flags = effective_plugin_flags(&view.stack.status, self.plugin_flags(stack_id));
        if flags.suspended() {
            return Err(self.suspended_error(stack_id, flags.creating_plugin));
        }
        if !is_installable(&plugin_type, &view.plugins) {
            return Err(AppError::action_not_allowed(
                &format!("install {}", plugin_type),
                "installed",
            ));
        }

        let payload = request.payload()?;
        let _guard = self.in_flight.begin(stack_id, Command::CreatePlugin)?;
        log::info!("Installing plugin {} on stack {}", plugin_type, stack_id);

        let result = self
            .backend
            .create_plugin(stack_id, &plugin_type, &payload)
            .await;
        let echoed = self.report_plugin_result(stack_id, Command::CreatePlugin, &plugin_type, result)?;
        self.apply_plugin_change(stack_id, echoed).await;
        Ok(())
    }

    /// Uninstall the live instance of a plugin type.
    pub async fn delete_plugin(&self, stack_id: &str, plugin_type: &PluginType) -> Result<()> {
        validate_stack_id(stack_id)?;
        let view = self.ensure_view(stack_id).await?;

        let flags = effective_plugin_flags(&view.stack.status, self.plugin_flags(stack_id));
        if flags.suspended() {
            return Err(self.suspended_error(stack_id, flags.deleting_plugin));
        }
        let plugin = find_live(plugin_type, &view.plugins)
            .ok_or_else(|| AppError::plugin_not_found(stack_id, plugin_type.as_str()))?;
        if !is_uninstallable(plugin) {
            return Err(AppError::action_not_allowed(
                &format!("uninstall {}", plugin_type),
                plugin.status.as_str(),
            ));
        }

        let _guard = self.in_flight.begin(stack_id, Command::DeletePlugin)?;
        log::info!("Uninstalling plugin {} from stack {}", plugin_type, stack_id);

        let result = self.backend.delete_plugin(stack_id, plugin_type).await;
        let echoed = self.report_plugin_result(stack_id, Command::DeletePlugin, plugin_type, result)?;
        self.apply_plugin_change(stack_id, echoed).await;
        Ok(())
    }

    /// Install a type again with the configuration of its last terminated
    /// instance.
    pub async fn reinstall_plugin(&self, stack_id: &str, plugin_type: &PluginType) -> Result<()> {
        validate_stack_id(stack_id)?;
        let view = self.ensure_view(stack_id).await?;
        let request = find_reinstallable(plugin_type, &view.plugins)
            .and_then(reinstall_request)
            .ok_or_else(|| AppError::plugin_not_found(stack_id, plugin_type.as_str()))?;
        self.create_plugin(stack_id, request).await
    }

    fn suspended_error(&self, stack_id: &str, same_command: bool) -> AppError {
        if same_command {
            return AppError::command_in_flight(stack_id, "plugin");
        }
        let command = if self.is_in_flight(stack_id, Command::UpdateStack) {
            Command::UpdateStack
        } else if self.is_in_flight(stack_id, Command::CreatePlugin) {
            Command::CreatePlugin
        } else if self.is_in_flight(stack_id, Command::DeletePlugin) {
            Command::DeletePlugin
        } else {
            return AppError::action_not_allowed("plugin change", "Updating");
        };
        AppError::command_in_flight(stack_id, command.as_str())
    }

    fn report_plugin_result(
        &self,
        stack_id: &str,
        command: Command,
        plugin_type: &PluginType,
        result: Result<Option<Plugin>>,
    ) -> Result<Option<Plugin>> {
        match result {
            Ok(echoed) => {
                self.notify(
                    NotificationLevel::Success,
                    command,
                    Some(stack_id),
                    format!("{}: {}", command.done_phrase(), plugin_type.label()),
                );
                Ok(echoed)
            }
            Err(e) => {
                self.notify(
                    NotificationLevel::Error,
                    command,
                    Some(stack_id),
                    format!("{} {}: {}", command.failed_phrase(), plugin_type.label(), e),
                );
                Err(e)
            }
        }
    }

    /// Merge a confirmed plugin change into the cached view, re-reading the
    /// plugin list when the backend did not echo the plugin back.
    async fn apply_plugin_change(&self, stack_id: &str, echoed: Option<Plugin>) {
        match echoed {
            Some(plugin) => self.update_view(stack_id, |view| upsert_plugin(&mut view.plugins, plugin)),
            None => match self.backend.get_plugins(stack_id).await {
                Ok(plugins) => self.update_view(stack_id, |view| view.plugins = plugins),
                Err(e) => log::warn!("Failed to refresh plugins of stack {}: {}", stack_id, e),
            },
        }
    }
}

/// Replace the entry of the same type that is not yet terminated, or append.
fn upsert_plugin(plugins: &mut Vec<Plugin>, plugin: Plugin) {
    let existing = plugins.iter_mut().find(|p| {
        p.plugin_type == plugin.plugin_type
            && ((!plugin.id.is_empty() && p.id == plugin.id) || !p.status.is_terminated())
    });
    match existing {
        Some(slot) => *slot = plugin,
        None => plugins.push(plugin),
    }
}
