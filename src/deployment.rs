//! Deployment step tracking.
//!
//! The backend records one row per provisioning step attempt. The console
//! shows a fixed, ordered list of steps and resolves each one to the latest
//! row reported for it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::status::{DeploymentStepStatus, StatusClass};

/// Provisioning steps in pipeline order, with their display labels.
pub const KNOWN_STEPS: [(u32, &str); 2] = [
    (1, "L1 Smartcontract Deployment"),
    (2, "Thanos Infra Deployment"),
];

/// One deployment record as returned by `GET …/{id}/deployments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub stack_id: String,
    pub step: u32,
    pub status: DeploymentStepStatus,
    #[serde(default)]
    pub log_path: String,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

/// A known step with its effective status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStep {
    pub step: u32,
    pub label: &'static str,
    pub status: DeploymentStepStatus,
}

/// Resolve the effective status of every known step.
///
/// Later records for the same step replace earlier ones. Steps without any
/// record are `Pending`. Records for step numbers outside [`KNOWN_STEPS`] are
/// ignored.
pub fn resolve_steps(deployments: &[Deployment]) -> Vec<ResolvedStep> {
    let latest: HashMap<u32, &DeploymentStepStatus> = deployments
        .iter()
        .map(|deployment| (deployment.step, &deployment.status))
        .collect();

    KNOWN_STEPS
        .iter()
        .map(|&(step, label)| ResolvedStep {
            step,
            label,
            status: latest.get(&step).map(|s| (*s).clone()).unwrap_or_default(),
        })
        .collect()
}

/// Overall pipeline progress derived from resolved steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentProgress {
    pub completed: usize,
    pub total: usize,
    /// First step reporting `Failed`, if any.
    pub failed_step: Option<u32>,
    /// First step that is neither completed nor failed.
    pub current_step: Option<u32>,
    pub percent: u8,
}

impl DeploymentProgress {
    pub fn from_steps(steps: &[ResolvedStep]) -> Self {
        let total = steps.len();
        let completed = steps
            .iter()
            .filter(|s| s.status.class() == StatusClass::Success)
            .count();
        let failed_step = steps
            .iter()
            .find(|s| s.status == DeploymentStepStatus::Failed)
            .map(|s| s.step);
        let current_step = steps
            .iter()
            .find(|s| {
                !matches!(
                    s.status,
                    DeploymentStepStatus::Completed | DeploymentStepStatus::Failed
                )
            })
            .map(|s| s.step);
        let percent = if total == 0 {
            0
        } else {
            u8::try_from(completed * 100 / total).unwrap_or(100)
        };

        Self {
            completed,
            total,
            failed_step,
            current_step,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_steps, Deployment, DeploymentProgress};
    use crate::status::DeploymentStepStatus;

    fn record(step: u32, status: DeploymentStepStatus) -> Deployment {
        Deployment {
            id: format!("dep-{}", step),
            stack_id: "stack-1".to_string(),
            step,
            status,
            log_path: String::new(),
            config: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_empty_input_yields_pending_steps() {
        let steps = resolve_steps(&[]);
        let pairs: Vec<(u32, DeploymentStepStatus)> =
            steps.iter().map(|s| (s.step, s.status.clone())).collect();
        assert_eq!(
            pairs,
            vec![
                (1, DeploymentStepStatus::Pending),
                (2, DeploymentStepStatus::Pending)
            ]
        );
        assert_eq!(steps[0].label, "L1 Smartcontract Deployment");
    }

    #[test]
    fn test_duplicate_step_takes_last_record() {
        let steps = resolve_steps(&[
            record(1, DeploymentStepStatus::Completed),
            record(1, DeploymentStepStatus::Failed),
        ]);
        assert_eq!(steps[0].status, DeploymentStepStatus::Failed);
        assert_eq!(steps[1].status, DeploymentStepStatus::Pending);
    }

    #[test]
    fn test_unknown_steps_are_ignored() {
        let steps = resolve_steps(&[
            record(7, DeploymentStepStatus::Failed),
            record(2, DeploymentStepStatus::InProgress),
        ]);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].status, DeploymentStepStatus::InProgress);
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let input = vec![
            record(2, DeploymentStepStatus::Completed),
            record(1, DeploymentStepStatus::Completed),
        ];
        assert_eq!(resolve_steps(&input), resolve_steps(&input));
    }

    #[test]
    fn test_progress_reports_failed_and_current_step() {
        let steps = resolve_steps(&[
            record(1, DeploymentStepStatus::Completed),
            record(2, DeploymentStepStatus::Failed),
        ]);
        let progress = DeploymentProgress::from_steps(&steps);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.percent, 50);
        assert_eq!(progress.failed_step, Some(2));
        assert_eq!(progress.current_step, None);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_progress_complete_when_all_steps_done() {
        let steps = resolve_steps(&[
            record(1, DeploymentStepStatus::Completed),
            record(2, DeploymentStepStatus::Completed),
        ]);
        let progress = DeploymentProgress::from_steps(&steps);
        assert!(progress.is_complete());
        assert_eq!(progress.percent, 100);
    }

    #[test]
    fn test_deployment_parses_backend_row() {
        let row = serde_json::json!({
            "id": "d1",
            "stack_id": "s1",
            "step": 1,
            "status": "InProgress",
            "log_path": "/logs/d1.log",
            "config": {}
        });
        let deployment: Deployment = serde_json::from_value(row).expect("parse");
        assert_eq!(deployment.status, DeploymentStepStatus::InProgress);
    }
}
