//! Lifecycle event types delivered by the orchestrator's event bus.
//!
//! Field names mirror the Marathon status-update payload (camelCase on the
//! wire). Fields this service never reads are left out; serde ignores them.

use serde::{Deserialize, Serialize};

/// Task state carried by a status-update event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TaskStatus {
    /// Task is being staged onto an agent
    #[serde(rename = "TASK_STAGING")]
    Staging,
    /// Task has started and is running
    #[serde(rename = "TASK_RUNNING")]
    Running,
    /// Task finished on its own
    #[serde(rename = "TASK_FINISHED")]
    Finished,
    /// Task failed
    #[serde(rename = "TASK_FAILED")]
    Failed,
    /// Task was killed by the orchestrator
    #[serde(rename = "TASK_KILLED")]
    Killed,
    /// Agent carrying the task was lost
    #[serde(rename = "TASK_LOST")]
    Lost,
    /// Any state this service has no reaction to
    #[serde(other)]
    Other,
}

impl TaskStatus {
    /// Whether this state means the task is gone.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Killed | Self::Lost)
    }
}

/// A task status-update event.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    /// Event-bus type tag, `status_update_event` for this payload
    pub event_type: String,
    /// Orchestrator-assigned application path, e.g. `/myteam/myapp`
    pub app_id: String,
    /// Task state this event reports
    pub task_status: TaskStatus,
    /// Task instance identifier
    #[serde(default)]
    pub task_id: String,
    /// Agent host the task runs on
    #[serde(default)]
    pub host: String,
    /// Host ports assigned to the task
    #[serde(default)]
    pub ports: Vec<u16>,
    /// Event timestamp as reported by the bus
    #[serde(default)]
    pub timestamp: String,
}

impl StatusEvent {
    /// The application identity: the app path with its leading separator
    /// stripped. Must still pass the safe grammar before any use.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.app_id.strip_prefix('/').unwrap_or(&self.app_id)
    }
}
