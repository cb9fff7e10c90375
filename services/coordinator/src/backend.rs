//! Lifecycle backends.
//!
//! A closed set of reactions to lifecycle events, constructed explicitly at
//! startup from configuration. Keeping the set closed (an enum, not a global
//! registration list) makes the dispatch order and the active backends
//! visible in one place.

use crate::coordinator::SecretCoordinator;
use crate::events::StatusEvent;
use std::sync::Arc;
use tracing::{debug, info};

/// One reaction to lifecycle events.
#[derive(Clone)]
pub enum Backend {
    /// Provisions per-application Vault credentials
    SecretDistributor(Arc<SecretCoordinator>),
    /// Logs every event; useful when wiring up a new event source
    Debug,
}

impl Backend {
    /// Backend name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SecretDistributor(_) => "secret-distributor",
            Self::Debug => "debug",
        }
    }

    /// React to a task reaching the running state.
    pub async fn handle_running(&self, event: &StatusEvent) {
        match self {
            Self::SecretDistributor(coordinator) => {
                coordinator.handle_running(&event.app_id).await;
            }
            Self::Debug => {
                info!(backend = self.name(), app_id = %event.app_id, "task running");
            }
        }
    }

    /// React to a task leaving the cluster.
    ///
    /// The secret distributor deliberately does nothing here: it holds no
    /// credential state after hand-off, and minted tokens expire via TTL.
    pub async fn handle_terminated(&self, event: &StatusEvent) {
        match self {
            Self::SecretDistributor(_) => {
                debug!(backend = self.name(), app_id = %event.app_id, "ignoring terminated task");
            }
            Self::Debug => {
                info!(backend = self.name(), app_id = %event.app_id, "task terminated");
            }
        }
    }

    /// Route one event to the right handler; non-terminal, non-running
    /// states are dropped.
    pub async fn handle(&self, event: &StatusEvent) {
        if event.task_status == crate::events::TaskStatus::Running {
            self.handle_running(event).await;
        } else if event.task_status.is_terminal() {
            self.handle_terminated(event).await;
        } else {
            debug!(backend = self.name(), app_id = %event.app_id, status = ?event.task_status,
                "no reaction for task status");
        }
    }
}

/// Fan an event out to every backend, each on its own task.
pub fn dispatch(backends: &[Backend], event: &StatusEvent) {
    for backend in backends {
        debug!(backend = backend.name(), app_id = %event.app_id, "dispatching event");
        let backend = backend.clone();
        let event = event.clone();
        tokio::spawn(async move {
            backend.handle(&event).await;
        });
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Backend").field(&self.name()).finish()
    }
}
