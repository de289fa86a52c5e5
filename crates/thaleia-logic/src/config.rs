//! Scheduler configuration: the behavioral switches of a production queue.
//!
//! Every switch defaults to the corrected behavior. The legacy variants
//! reproduce individual quirks of the old scheduler for save-game
//! compatibility.

use serde::{Deserialize, Serialize};

pub use crate::task::AccrualPolicy;

/// What happens to an active task once its finish date has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// The task leaves the active set and is reported to the colony once.
    #[default]
    RemoveFinished,
    /// Legacy: the task stays active and is reported again on every tick.
    RetainFinished,
}

/// Which waiting-list moves notify observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderNotification {
    /// Both `move_up` and `move_down` notify.
    #[default]
    Symmetric,
    /// Legacy: only `move_up` notifies.
    MoveUpOnly,
}

/// Configuration of a [`ProductionQueue`](crate::queue::ProductionQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Accrual policy of tasks created through the queue.
    pub accrual: AccrualPolicy,
    pub completion: CompletionPolicy,
    pub reorder_notification: ReorderNotification,
}

impl SchedulerConfig {
    /// Old scheduler behavior for whole-day accrual, retained finished tasks
    /// and move-up-only notification. Promotion into an idle active set and
    /// halting on removal keep the corrected behavior.
    pub fn legacy() -> Self {
        Self {
            accrual: AccrualPolicy::WholeDays,
            completion: CompletionPolicy::RetainFinished,
            reorder_notification: ReorderNotification::MoveUpOnly,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
