//! Stack fetches and stack lifecycle commands.

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use chrono::Utc;
use tokio::sync::broadcast;

use super::in_flight::InFlightTracker;
use super::snapshot::build_stack_snapshot;
use super::types::{Command, Notification, NotificationLevel, StackSnapshot, StackView};
use crate::backend::Backend;
use crate::error::{AppError, ErrorKind, Result};
use crate::gate::{compute_actions, InFlight, StackAction, StackActions};
use crate::plugin::PluginFlags;
use crate::stack::{CreateStackRequest, Stack, UpdateStackRequest};
use crate::validation::validate_stack_id;

/// Issues commands against the backend and keeps a local view of each stack
/// that only changes from confirmed backend results.
pub struct Orchestrator<B> {
    pub(super) backend: B,
    pub(super) views: RwLock<HashMap<String, StackView>>,
    pub(super) in_flight: InFlightTracker,
    notifications: broadcast::Sender<Notification>,
}

impl<B: Backend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        let (notifications, _) = broadcast::channel(64);

        Self {
            backend,
            views: RwLock::new(HashMap::new()),
            in_flight: InFlightTracker::default(),
            notifications,
        }
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub(super) fn notify(
        &self,
        level: NotificationLevel,
        command: Command,
        stack_id: Option<&str>,
        message: String,
    ) {
        match level {
            NotificationLevel::Success => log::info!("{}", message),
            NotificationLevel::Error => log::error!("{}", message),
        }
        let _ = self.notifications.send(Notification {
            id: uuid::Uuid::new_v4().to_string(),
            level,
            command,
            stack_id: stack_id.map(str::to_string),
            message,
            at: Utc::now(),
        });
    }

    // === Fetch ===

    pub async fn list_stacks(&self) -> Result<Vec<Stack>> {
        self.backend.list_stacks().await.inspect_err(|e| {
            log::warn!("Failed to fetch stacks: {}", e);
        })
    }

    /// Fetch a stack with its deployments and plugins and replace the cached
    /// view. Any failed read leaves the cache as it was.
    pub async fn load_stack(&self, stack_id: &str) -> Result<StackView> {
        validate_stack_id(stack_id)?;

        let (stack, deployments, plugins) = tokio::try_join!(
            self.backend.get_stack(stack_id),
            self.backend.get_deployments(stack_id),
            self.backend.get_plugins(stack_id),
        )
        .inspect_err(|e| log::warn!("Failed to load stack {}: {}", stack_id, e))?;

        let view = StackView {
            stack,
            deployments,
            plugins,
            fetched_at: Utc::now(),
        };
        self.store_view(stack_id, view.clone());
        Ok(view)
    }

    /// Cached view, loading it first if this stack has not been seen yet.
    pub async fn ensure_view(&self, stack_id: &str) -> Result<StackView> {
        match self.view(stack_id) {
            Some(view) => Ok(view),
            None => self.load_stack(stack_id).await,
        }
    }

    pub fn view(&self, stack_id: &str) -> Option<StackView> {
        let views = self.views.read().unwrap_or_else(|e| e.into_inner());
        views.get(stack_id).cloned()
    }

    pub(super) fn store_view(&self, stack_id: &str, view: StackView) {
        let mut views = self.views.write().unwrap_or_else(|e| e.into_inner());
        views.insert(stack_id.to_string(), view);
    }

    /// Apply `f` to the cached view of a stack, if there is one.
    pub(super) fn update_view(&self, stack_id: &str, f: impl FnOnce(&mut StackView)) {
        let mut views = self.views.write().unwrap_or_else(|e| e.into_inner());
        if let Some(view) = views.get_mut(stack_id) {
            f(view);
            view.fetched_at = Utc::now();
        }
    }

    fn forget_view(&self, stack_id: &str) {
        let mut views = self.views.write().unwrap_or_else(|e| e.into_inner());
        views.remove(stack_id);
    }

    /// Re-read just the stack record after a confirmed command.
    async fn refresh_stack(&self, stack_id: &str) {
        match self.backend.get_stack(stack_id).await {
            Ok(stack) => {
                if self.view(stack_id).is_some() {
                    self.update_view(stack_id, |view| view.stack = stack);
                } else {
                    self.store_view(
                        stack_id,
                        StackView {
                            stack,
                            deployments: Vec::new(),
                            plugins: Vec::new(),
                            fetched_at: Utc::now(),
                        },
                    );
                }
            }
            Err(e) if e.kind() == ErrorKind::StackNotFound => {
                log::info!("Stack {} no longer exists on the backend", stack_id);
                self.forget_view(stack_id);
            }
            Err(e) => log::warn!("Failed to refresh stack {}: {}", stack_id, e),
        }
    }

    // === Gating ===

    pub fn is_in_flight(&self, stack_id: &str, command: Command) -> bool {
        self.in_flight.is_running(stack_id, command)
    }

    pub fn in_flight_flags(&self, stack_id: &str) -> InFlight {
        self.in_flight.stack_flags(stack_id)
    }

    pub fn plugin_flags(&self, stack_id: &str) -> PluginFlags {
        self.in_flight.plugin_flags(stack_id)
    }

    pub async fn actions(&self, stack_id: &str) -> Result<StackActions> {
        let view = self.ensure_view(stack_id).await?;
        Ok(compute_actions(&view.stack.status, self.in_flight_flags(stack_id)))
    }

    pub async fn snapshot(&self, stack_id: &str) -> Result<StackSnapshot> {
        let view = self.ensure_view(stack_id).await?;
        Ok(build_stack_snapshot(
            &view,
            self.in_flight_flags(stack_id),
            self.plugin_flags(stack_id),
        ))
    }

    /// Reject a command the gate does not currently allow.
    async fn check_allowed(&self, stack_id: &str, action: StackAction, command: Command) -> Result<()> {
        let view = self.ensure_view(stack_id).await?;
        if self.is_in_flight(stack_id, command) {
            return Err(AppError::command_in_flight(stack_id, command.as_str()));
        }
        let actions = compute_actions(&view.stack.status, self.in_flight_flags(stack_id));
        if !actions.allows(action) {
            return Err(AppError::action_not_allowed(
                action.as_str(),
                view.stack.status.as_str(),
            ));
        }
        Ok(())
    }

    /// Run one gated stack command: guard, dispatch, notify, refresh.
    async fn run_stack_command<T, F, Fut>(
        &self,
        stack_id: &str,
        action: StackAction,
        command: Command,
        dispatch: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        validate_stack_id(stack_id)?;
        self.check_allowed(stack_id, action, command).await?;
        let _guard = self.in_flight.begin(stack_id, command)?;

        log::info!("Dispatching {} for stack {}", command, stack_id);
        match dispatch().await {
            Ok(value) => {
                self.notify(
                    NotificationLevel::Success,
                    command,
                    Some(stack_id),
                    format!("{} for stack {}", command.done_phrase(), stack_id),
                );
                Ok(value)
            }
            Err(e) => {
                self.notify(
                    NotificationLevel::Error,
                    command,
                    Some(stack_id),
                    format!("{} {}: {}", command.failed_phrase(), stack_id, e),
                );
                Err(e)
            }
        }
    }

    // === Stack commands ===

    /// Request a new stack. The request must already be validated.
    pub async fn create_stack(&self, request: &CreateStackRequest) -> Result<Stack> {
        let key = format!("new:{}", request.chain_name);
        let _guard = self.in_flight.begin(&key, Command::CreateStack)?;

        log::info!("Dispatching {} for chain {}", Command::CreateStack, request.chain_name);
        let stack = match self.backend.create_stack(request).await {
            Ok(stack) => stack,
            Err(e) => {
                self.notify(
                    NotificationLevel::Error,
                    Command::CreateStack,
                    None,
                    format!("{} {}: {}", Command::CreateStack.failed_phrase(), request.chain_name, e),
                );
                return Err(e);
            }
        };

        self.notify(
            NotificationLevel::Success,
            Command::CreateStack,
            Some(&stack.id),
            format!("{} for stack {}", Command::CreateStack.done_phrase(), stack.id),
        );
        self.store_view(
            &stack.id,
            StackView {
                stack: stack.clone(),
                deployments: Vec::new(),
                plugins: Vec::new(),
                fetched_at: Utc::now(),
            },
        );
        self.refresh_stack(&stack.id).await;
        Ok(self.view(&stack.id).map(|v| v.stack).unwrap_or(stack))
    }

    pub async fn delete_stack(&self, stack_id: &str) -> Result<()> {
        self.run_stack_command(stack_id, StackAction::Destroy, Command::DeleteStack, || {
            self.backend.delete_stack(stack_id)
        })
        .await?;
        self.refresh_stack(stack_id).await;
        Ok(())
    }

    pub async fn resume_stack(&self, stack_id: &str) -> Result<()> {
        self.run_stack_command(stack_id, StackAction::Resume, Command::ResumeStack, || {
            self.backend.resume_stack(stack_id)
        })
        .await?;
        self.refresh_stack(stack_id).await;
        Ok(())
    }

    pub async fn stop_stack(&self, stack_id: &str) -> Result<()> {
        self.run_stack_command(stack_id, StackAction::Stop, Command::StopStack, || {
            self.backend.stop_stack(stack_id)
        })
        .await?;
        self.refresh_stack(stack_id).await;
        Ok(())
    }

    /// Update the L1 endpoints. The backend answers with the updated stack,
    /// which replaces the cached record directly.
    pub async fn update_stack(&self, stack_id: &str, request: &UpdateStackRequest) -> Result<Stack> {
        let stack = self
            .run_stack_command(stack_id, StackAction::Update, Command::UpdateStack, || {
                self.backend.update_stack(stack_id, request)
            })
            .await?;
        let cached = stack.clone();
        self.update_view(stack_id, |view| view.stack = cached);
        Ok(stack)
    }
}
