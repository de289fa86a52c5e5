//! Read-only views of a production queue for display.

use serde::{Deserialize, Serialize};

use crate::colony::Colony;
use crate::product::Buildable;
use crate::queue::{ProductionQueue, TaskId};
use crate::task::ProductionTask;
use crate::time::Timestamp;

/// One row of the production panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub product: String,
    pub quantity: u32,
    pub total_cost: i64,
    /// Remaining cost projected to the snapshot time.
    pub remaining_cost: i64,
    pub output_per_day: u32,
    pub output_share: f32,
    pub share_locked: bool,
    pub finish_date: Option<Timestamp>,
}

impl TaskView {
    pub fn of<P: Buildable>(id: TaskId, task: &ProductionTask<P>, now: Timestamp) -> Self {
        Self {
            id,
            product: task.product().name().to_string(),
            quantity: task.quantity(),
            total_cost: task.total_cost(),
            remaining_cost: task.projected_remaining(now),
            output_per_day: task.output_per_day(),
            output_share: if task.is_active() { task.output_share() } else { 0.0 },
            share_locked: task.is_share_locked(),
            finish_date: task.finish_date().ok(),
        }
    }
}

/// The whole queue at one instant: active tasks first, then the waiting list
/// in activation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub taken_at: Timestamp,
    pub last_tick: Timestamp,
    pub active: Vec<TaskView>,
    pub waiting: Vec<TaskView>,
}

impl QueueSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<C: Colony> ProductionQueue<C> {
    /// Capture the queue for display, projecting active work to `now`.
    pub fn snapshot(&self, now: Timestamp) -> QueueSnapshot {
        QueueSnapshot {
            taken_at: now,
            last_tick: self.last_tick(),
            active: self
                .active()
                .map(|(id, task)| TaskView::of(id, task, now))
                .collect(),
            waiting: self
                .waiting()
                .map(|(id, task)| TaskView::of(id, task, now))
                .collect(),
        }
    }
}
