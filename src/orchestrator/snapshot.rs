//! View-model assembly for a single stack.

use super::types::{PluginEntry, StackSnapshot, StackView};
use crate::deployment::{resolve_steps, DeploymentProgress};
use crate::gate::{compute_actions, InFlight};
use crate::plugin::{plugin_affordance, plugin_options, PluginFlags};
use crate::status::StackStatus;

/// Plugin mutations also wait while the backend reports the stack as updating.
pub(crate) fn effective_plugin_flags(status: &StackStatus, flags: PluginFlags) -> PluginFlags {
    PluginFlags {
        updating_stack: flags.updating_stack || matches!(status, StackStatus::Updating),
        ..flags
    }
}

pub fn build_stack_snapshot(
    view: &StackView,
    in_flight: InFlight,
    plugin_flags: PluginFlags,
) -> StackSnapshot {
    let status = &view.stack.status;
    let plugin_flags = effective_plugin_flags(status, plugin_flags);
    let steps = resolve_steps(&view.deployments);
    let progress = DeploymentProgress::from_steps(&steps);

    let plugins = view
        .plugins
        .iter()
        .map(|plugin| PluginEntry {
            label: plugin.plugin_type.label().to_string(),
            status_label: plugin.status.display_label().to_string(),
            status_class: plugin.status.class(),
            affordance: plugin_affordance(plugin, plugin_flags),
            plugin: plugin.clone(),
        })
        .collect();

    StackSnapshot {
        status_label: status.display_label().to_string(),
        status_class: status.class(),
        actions: compute_actions(status, in_flight),
        steps,
        progress,
        plugin_options: plugin_options(&view.plugins, plugin_flags),
        plugins,
        stack: view.stack.clone(),
        fetched_at: view.fetched_at,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::build_stack_snapshot;
    use crate::gate::{InFlight, StackAction};
    use crate::orchestrator::StackView;
    use crate::plugin::{Plugin, PluginConfig, PluginFlags, PluginInfo, PluginType};
    use crate::stack::Stack;
    use crate::status::{StackStatus, StatusClass};

    fn view(status: StackStatus, plugins: Vec<Plugin>) -> StackView {
        StackView {
            stack: Stack {
                id: "s1".to_string(),
                name: String::new(),
                network: "Testnet".to_string(),
                config: Default::default(),
                deployment_path: String::new(),
                status,
                metadata: None,
            },
            deployments: Vec::new(),
            plugins,
            fetched_at: Utc::now(),
        }
    }

    fn bridge(status: StackStatus) -> Plugin {
        Plugin {
            id: "p1".to_string(),
            plugin_type: PluginType::Bridge,
            status,
            stack_id: "s1".to_string(),
            config: PluginConfig::new(),
            info: PluginInfo::default(),
            log_path: None,
        }
    }

    #[test]
    fn test_active_stack_with_bridge() {
        let snapshot = build_stack_snapshot(
            &view(StackStatus::Deployed, vec![bridge(StackStatus::Active)]),
            InFlight::default(),
            PluginFlags::default(),
        );
        assert_eq!(snapshot.status_label, "Active");
        assert_eq!(snapshot.status_class, StatusClass::Success);
        assert_eq!(
            snapshot.actions.enabled(),
            vec![StackAction::Update, StackAction::Destroy]
        );
        assert!(snapshot.plugin_options[0].installed);
        assert!(!snapshot.plugin_options[0].enabled);
        assert!(snapshot.plugin_options[1].enabled);
        assert_eq!(snapshot.steps.len(), 2);
        assert_eq!(snapshot.progress.percent, 0);
    }

    #[test]
    fn test_plugin_step_style_statuses_are_classified() {
        let mut explorer = bridge(StackStatus::parse("Completed"));
        explorer.plugin_type = PluginType::BlockExplorer;
        let snapshot = build_stack_snapshot(
            &view(
                StackStatus::Deployed,
                vec![bridge(StackStatus::parse("InProgress")), explorer],
            ),
            InFlight::default(),
            PluginFlags::default(),
        );
        assert_eq!(snapshot.plugins[0].status_class, StatusClass::InProgress);
        assert_eq!(snapshot.plugins[0].status_label, "InProgress");
        assert_eq!(snapshot.plugins[1].status_class, StatusClass::Success);
        assert_eq!(snapshot.plugins[1].status_label, "Active");
    }

    #[test]
    fn test_updating_status_suspends_plugins() {
        let snapshot = build_stack_snapshot(
            &view(StackStatus::Updating, vec![bridge(StackStatus::Active)]),
            InFlight::default(),
            PluginFlags::default(),
        );
        assert!(snapshot.plugin_options.iter().all(|o| !o.enabled));
        assert!(!snapshot.plugins[0].affordance.uninstall.is_enabled());
    }
}
