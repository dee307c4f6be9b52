//! Operator action gating for stacks.
//!
//! A pure decision over the stack status and the commands the caller
//! currently has in flight. Every surface that shows stack buttons, and the
//! orchestrator before dispatching a command, asks this module.

use std::fmt;

use serde::Serialize;

use crate::status::StackStatus;

/// Commands whose previous dispatch has not returned yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InFlight {
    pub resuming: bool,
    pub stopping: bool,
    pub destroying: bool,
    pub updating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StackAction {
    Resume,
    Stop,
    Update,
    Destroy,
}

impl StackAction {
    pub const ALL: [Self; 4] = [Self::Resume, Self::Stop, Self::Update, Self::Destroy];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Update => "update",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for StackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an action is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Hidden,
    Disabled,
    Enabled,
}

impl ActionState {
    fn offered(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }

    pub fn is_offered(self) -> bool {
        self != Self::Hidden
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StackActions {
    pub resume: ActionState,
    pub stop: ActionState,
    pub update: ActionState,
    pub destroy: ActionState,
    pub primary: StackAction,
}

impl StackActions {
    fn only(primary: StackAction, state: ActionState) -> Self {
        let mut actions = Self {
            resume: ActionState::Hidden,
            stop: ActionState::Hidden,
            update: ActionState::Hidden,
            destroy: ActionState::Hidden,
            primary,
        };
        *actions.slot_mut(primary) = state;
        actions
    }

    fn slot_mut(&mut self, action: StackAction) -> &mut ActionState {
        match action {
            StackAction::Resume => &mut self.resume,
            StackAction::Stop => &mut self.stop,
            StackAction::Update => &mut self.update,
            StackAction::Destroy => &mut self.destroy,
        }
    }

    pub fn get(&self, action: StackAction) -> ActionState {
        match action {
            StackAction::Resume => self.resume,
            StackAction::Stop => self.stop,
            StackAction::Update => self.update,
            StackAction::Destroy => self.destroy,
        }
    }

    pub fn allows(&self, action: StackAction) -> bool {
        self.get(action).is_enabled()
    }

    pub fn enabled(&self) -> Vec<StackAction> {
        StackAction::ALL
            .into_iter()
            .filter(|a| self.allows(*a))
            .collect()
    }

    pub fn offered(&self) -> Vec<StackAction> {
        StackAction::ALL
            .into_iter()
            .filter(|a| self.get(*a).is_offered())
            .collect()
    }
}

/// Only a stack that is actively provisioning can be stopped.
pub fn can_stop(status: &StackStatus) -> bool {
    matches!(status, StackStatus::Deploying)
}

/// The complete set of resumable statuses. Failures other than
/// `FailedToDeploy` are not resumable.
pub fn can_resume(status: &StackStatus) -> bool {
    matches!(
        status,
        StackStatus::Terminated | StackStatus::FailedToDeploy | StackStatus::Stopped
    )
}

pub fn can_update(status: &StackStatus) -> bool {
    status.is_active()
}

/// Destroy is allowed on an active stack and as the recovery path out of a
/// failed update or a failed termination.
pub fn can_destroy(status: &StackStatus) -> bool {
    status.is_active()
        || matches!(
            status,
            StackStatus::FailedToUpdate | StackStatus::FailedToTerminate
        )
}

/// Statuses the backend is still moving on its own. These offer destroy
/// only, disabled, until the backend settles.
pub fn is_transitional(status: &StackStatus) -> bool {
    matches!(
        status,
        StackStatus::Pending | StackStatus::Updating | StackStatus::Terminating
    )
}

/// Compute which stack actions are offered and enabled.
///
/// Every status offers at least one action. Only the transitional statuses
/// (`Pending`, `Updating`, `Terminating`) and unrecognized ones (`Unknown`,
/// `Other`) may end up with no enabled action; they show a disabled destroy
/// until the backend reports a settled status.
pub fn compute_actions(status: &StackStatus, in_flight: InFlight) -> StackActions {
    if can_stop(status) {
        return StackActions::only(
            StackAction::Stop,
            ActionState::offered(!in_flight.stopping),
        );
    }

    if can_resume(status) {
        return StackActions::only(
            StackAction::Resume,
            ActionState::offered(!in_flight.resuming),
        );
    }

    if status.is_active() {
        let mut actions = StackActions::only(
            StackAction::Update,
            ActionState::offered(!in_flight.updating),
        );
        actions.destroy = ActionState::offered(!in_flight.updating && !in_flight.destroying);
        return actions;
    }

    let destroy_enabled = can_destroy(status)
        && !matches!(status, StackStatus::Terminating | StackStatus::Updating)
        && !in_flight.updating
        && !in_flight.destroying;
    StackActions::only(StackAction::Destroy, ActionState::offered(destroy_enabled))
}

#[cfg(test)]
mod tests {
    use super::{
        can_resume, compute_actions, is_transitional, ActionState, InFlight, StackAction,
    };
    use crate::status::StackStatus;

    fn idle(status: StackStatus) -> Vec<StackAction> {
        compute_actions(&status, InFlight::default()).enabled()
    }

    #[test]
    fn test_deploying_only_stops() {
        assert_eq!(idle(StackStatus::Deploying), vec![StackAction::Stop]);
        let actions = compute_actions(&StackStatus::Deploying, InFlight::default());
        assert_eq!(actions.destroy, ActionState::Hidden);
        assert_eq!(actions.primary, StackAction::Stop);
    }

    #[test]
    fn test_resumable_statuses_only_resume() {
        for status in [
            StackStatus::Terminated,
            StackStatus::FailedToDeploy,
            StackStatus::Stopped,
        ] {
            assert_eq!(idle(status.clone()), vec![StackAction::Resume]);
            assert_eq!(
                compute_actions(&status, InFlight::default()).offered(),
                vec![StackAction::Resume]
            );
        }
    }

    #[test]
    fn test_other_failures_are_not_resumable() {
        assert!(!can_resume(&StackStatus::FailedToUpdate));
        assert!(!can_resume(&StackStatus::FailedToTerminate));
        assert!(!can_resume(&StackStatus::Other("Broken".to_string())));
    }

    #[test]
    fn test_deployed_offers_update_and_destroy() {
        assert_eq!(
            idle(StackStatus::Deployed),
            vec![StackAction::Update, StackAction::Destroy]
        );
        assert_eq!(
            idle(StackStatus::Active),
            vec![StackAction::Update, StackAction::Destroy]
        );
    }

    #[test]
    fn test_update_in_flight_disables_update_and_destroy() {
        let flags = InFlight {
            updating: true,
            ..InFlight::default()
        };
        let actions = compute_actions(&StackStatus::Deployed, flags);
        assert_eq!(actions.update, ActionState::Disabled);
        assert_eq!(actions.destroy, ActionState::Disabled);
        assert!(actions.enabled().is_empty());
    }

    #[test]
    fn test_destroy_in_flight_keeps_update_available() {
        let flags = InFlight {
            destroying: true,
            ..InFlight::default()
        };
        let actions = compute_actions(&StackStatus::Deployed, flags);
        assert!(actions.allows(StackAction::Update));
        assert_eq!(actions.destroy, ActionState::Disabled);
    }

    #[test]
    fn test_in_flight_guards_stop_and_resume() {
        let stopping = InFlight {
            stopping: true,
            ..InFlight::default()
        };
        assert_eq!(
            compute_actions(&StackStatus::Deploying, stopping).stop,
            ActionState::Disabled
        );
        let resuming = InFlight {
            resuming: true,
            ..InFlight::default()
        };
        assert_eq!(
            compute_actions(&StackStatus::Stopped, resuming).resume,
            ActionState::Disabled
        );
    }

    #[test]
    fn test_failed_update_and_termination_only_destroy() {
        assert_eq!(idle(StackStatus::FailedToUpdate), vec![StackAction::Destroy]);
        assert_eq!(
            idle(StackStatus::FailedToTerminate),
            vec![StackAction::Destroy]
        );
    }

    #[test]
    fn test_transitional_statuses_wait_on_disabled_destroy() {
        for status in [
            StackStatus::Pending,
            StackStatus::Updating,
            StackStatus::Terminating,
        ] {
            let actions = compute_actions(&status, InFlight::default());
            assert_eq!(actions.offered(), vec![StackAction::Destroy]);
            assert_eq!(actions.destroy, ActionState::Disabled);
        }
    }

    #[test]
    fn test_unrecognized_status_is_conservative() {
        let actions = compute_actions(
            &StackStatus::Other("Reconfiguring".to_string()),
            InFlight::default(),
        );
        assert_eq!(actions.offered(), vec![StackAction::Destroy]);
        assert!(actions.enabled().is_empty());
    }

    #[test]
    fn test_every_status_offers_something_and_settled_ones_enable_something() {
        for status in StackStatus::KNOWN {
            let actions = compute_actions(&status, InFlight::default());
            assert!(!actions.offered().is_empty(), "{status} offers nothing");
            if is_transitional(&status) || status == StackStatus::Unknown {
                assert!(
                    actions.enabled().is_empty(),
                    "{status} waits on the backend with a disabled destroy"
                );
            } else {
                assert!(!actions.enabled().is_empty(), "{status} is stuck");
            }
        }
    }

    #[test]
    fn test_resume_and_destroy_never_offered_together() {
        for status in StackStatus::KNOWN {
            let actions = compute_actions(&status, InFlight::default());
            assert!(!(actions.resume.is_offered() && actions.destroy.is_offered()));
            if actions.update.is_offered() {
                assert!(actions.destroy.is_offered());
            }
        }
    }

    #[test]
    fn test_deploying_never_destroyable() {
        let everything = InFlight::default();
        let actions = compute_actions(&StackStatus::Deploying, everything);
        assert!(!actions.allows(StackAction::Destroy));
    }
}
