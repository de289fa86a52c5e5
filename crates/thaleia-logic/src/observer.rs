//! Change notifications for production queues.
//!
//! Observers are called synchronously, in registration order, from inside the
//! queue operation that caused the change. They get read-only access and must
//! not try to mutate the queue.
//!
//! Two implementations are provided:
//! - [`LogObserver`] writes every change to the `log` facade;
//! - [`ChannelObserver`] turns changes into [`QueueEvent`] messages, for
//!   consumers that would rather drain a channel than run inside the queue's
//!   call (e.g. a UI thread).

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::product::Buildable;
use crate::queue::TaskId;
use crate::task::ProductionTask;

/// Receives change notifications from a [`ProductionQueue`].
///
/// [`ProductionQueue`]: crate::queue::ProductionQueue
pub trait QueueObserver<P> {
    fn on_task_added(&mut self, id: TaskId, task: &ProductionTask<P>);

    fn on_task_removed(&mut self, id: TaskId, task: &ProductionTask<P>);

    /// The order of the waiting list changed.
    fn on_queue_reordered(&mut self);

    /// A task finished and left the queue.
    fn on_task_finished(&mut self, _id: TaskId, _task: &ProductionTask<P>) {}
}

/// Handle returned by `add_observer`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// Writes queue changes to the `log` facade under the given colony label.
#[derive(Debug, Clone)]
pub struct LogObserver {
    label: String,
}

impl LogObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl<P: Buildable> QueueObserver<P> for LogObserver {
    fn on_task_added(&mut self, id: TaskId, task: &ProductionTask<P>) {
        log::info!(
            "[{}] queued {} {} x {} (cost {})",
            self.label,
            id,
            task.quantity(),
            task.product().name(),
            task.remaining_cost()
        );
    }

    fn on_task_removed(&mut self, id: TaskId, task: &ProductionTask<P>) {
        log::info!(
            "[{}] removed {} {} x {} ({} cost left)",
            self.label,
            id,
            task.quantity(),
            task.product().name(),
            task.remaining_cost()
        );
    }

    fn on_queue_reordered(&mut self) {
        log::debug!("[{}] waiting list reordered", self.label);
    }

    fn on_task_finished(&mut self, id: TaskId, task: &ProductionTask<P>) {
        log::info!(
            "[{}] finished {} {} x {}",
            self.label,
            id,
            task.quantity(),
            task.product().name()
        );
    }
}

/// A queue change, as sent by [`ChannelObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "task", rename_all = "snake_case")]
pub enum QueueEvent {
    Added(TaskId),
    Removed(TaskId),
    Reordered,
    Finished(TaskId),
}

/// Forwards queue changes into an mpsc channel.
///
/// A disconnected receiver is not an error: events are dropped.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<QueueEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<QueueEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: QueueEvent) {
        if self.tx.send(event).is_err() {
            log::trace!("queue event {:?} dropped, receiver gone", event);
        }
    }
}

impl<P> QueueObserver<P> for ChannelObserver {
    fn on_task_added(&mut self, id: TaskId, _task: &ProductionTask<P>) {
        self.send(QueueEvent::Added(id));
    }

    fn on_task_removed(&mut self, id: TaskId, _task: &ProductionTask<P>) {
        self.send(QueueEvent::Removed(id));
    }

    fn on_queue_reordered(&mut self) {
        self.send(QueueEvent::Reordered);
    }

    fn on_task_finished(&mut self, id: TaskId, _task: &ProductionTask<P>) {
        self.send(QueueEvent::Finished(id));
    }
}
