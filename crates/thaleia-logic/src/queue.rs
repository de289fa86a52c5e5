//! The production queue of one colony.
//!
//! The queue holds an ordered waiting list and a set of active tasks that are
//! being worked on with the colony's industrial output. The game loop drives
//! it with [`ProductionQueue::advance`]; everything else is player input.
//!
//! # Activation
//!
//! When a slot is free the head of the waiting list is activated with
//! `floor(daily_output * share)` points per day, where `share` comes from the
//! queue's [`CapacityPolicy`]. The default policy hands the whole capacity to
//! a single task.
//!
//! # Ticks
//!
//! ```text
//! advance(now)
//!   ├─ active task with finish_date <= now ─► colony.on_building_finished()
//!   │                                          └─ RemoveFinished: leave active set
//!   └─ slot freed or nothing active ─► activate head of waiting list at `now`
//! ```

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::colony::Colony;
use crate::config::{CompletionPolicy, ReorderNotification, SchedulerConfig};
use crate::error::{ProductionError, Result};
use crate::observer::{ObserverId, QueueObserver};
use crate::product::Buildable;
use crate::task::ProductionTask;
use crate::time::Timestamp;

/// Identity of a task within its queue, assigned by [`ProductionQueue::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Decides how much of the colony's capacity the next activated task gets.
pub trait CapacityPolicy {
    /// Share in (0, 1] for a task activated while `active_tasks` others run.
    fn available_share(&self, active_tasks: usize) -> f32;
}

/// Every activated task gets the full colony output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullCapacity;

impl CapacityPolicy for FullCapacity {
    fn available_share(&self, _active_tasks: usize) -> f32 {
        1.0
    }
}

/// What happened during one [`ProductionQueue::advance`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Tasks reported to the colony as finished, in active-set order.
    pub finished: Vec<TaskId>,
    /// Task promoted from the waiting list, if any.
    pub activated: Option<TaskId>,
}

type Entry<P> = (TaskId, ProductionTask<P>);
type BoxedObserver<P> = Box<dyn QueueObserver<P> + Send>;

/// Waiting list plus active set for one colony.
pub struct ProductionQueue<C: Colony> {
    colony: C,
    waiting: VecDeque<Entry<C::Product>>,
    active: Vec<Entry<C::Product>>,
    observers: Vec<(ObserverId, BoxedObserver<C::Product>)>,
    capacity: Box<dyn CapacityPolicy + Send>,
    config: SchedulerConfig,
    last_tick: Timestamp,
    next_task_id: u64,
    next_observer_id: u64,
}

impl<C: Colony> ProductionQueue<C> {
    /// Create an empty queue. `start` is the time used for activations before
    /// the first [`advance`](Self::advance).
    pub fn new(colony: C, start: Timestamp) -> Self {
        Self::with_config(colony, start, SchedulerConfig::default())
    }

    pub fn with_config(colony: C, start: Timestamp, config: SchedulerConfig) -> Self {
        Self {
            colony,
            waiting: VecDeque::new(),
            active: Vec::new(),
            observers: Vec::new(),
            capacity: Box::new(FullCapacity),
            config,
            last_tick: start,
            next_task_id: 1,
            next_observer_id: 1,
        }
    }

    pub fn set_capacity_policy(&mut self, policy: Box<dyn CapacityPolicy + Send>) {
        self.capacity = policy;
    }

    /// Build a task with this queue's accrual policy. The task is not queued.
    pub fn create_task(
        &self,
        product: C::Product,
        quantity: u32,
    ) -> Result<ProductionTask<C::Product>> {
        Ok(ProductionTask::new(product, quantity)?.with_accrual(self.config.accrual))
    }

    /// Append an inactive task to the waiting list.
    ///
    /// If nothing is being worked on, the head of the waiting list is
    /// activated right away at the last tick's time.
    pub fn add(&mut self, task: ProductionTask<C::Product>) -> Result<TaskId> {
        if task.is_active() {
            return Err(ProductionError::invalid_argument(format!(
                "cannot queue {} x {}: it is already active",
                task.quantity(),
                task.product().name()
            )));
        }

        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        self.waiting.push_back((id, task));

        if self.active.is_empty() {
            self.activate_next_waiting(self.last_tick);
        }

        if let Some(task) = find(&self.waiting, &self.active, id) {
            for (_, observer) in self.observers.iter_mut() {
                observer.on_task_added(id, task);
            }
        }
        Ok(id)
    }

    /// Take a task out of the queue, waiting or active. An active task is
    /// halted first, so the returned task is inactive and can be queued again.
    pub fn remove(&mut self, id: TaskId) -> Result<ProductionTask<C::Product>> {
        let task = if let Some(pos) = self.waiting.iter().position(|(i, _)| *i == id) {
            self.waiting.remove(pos).map(|(_, task)| task)
        } else if let Some(pos) = self.active.iter().position(|(i, _)| *i == id) {
            let (_, task) = &mut self.active[pos];
            if task.is_active() {
                let at = task
                    .last_updated()
                    .map_or(self.last_tick, |t| t.max(self.last_tick));
                task.halt(at)?;
            }
            Some(self.active.remove(pos).1)
        } else {
            None
        };
        let task = task.ok_or(ProductionError::NotFound(id))?;

        for (_, observer) in self.observers.iter_mut() {
            observer.on_task_removed(id, &task);
        }
        Ok(task)
    }

    /// Swap a waiting task with the one ahead of it. No-op if it is first.
    pub fn move_up(&mut self, id: TaskId) -> Result<()> {
        let pos = self.waiting_position(id)?;
        if pos == 0 {
            return Ok(());
        }
        self.waiting.swap(pos - 1, pos);
        log::debug!("moved {} up to waiting position {}", id, pos - 1);
        self.notify_reordered();
        Ok(())
    }

    /// Swap a waiting task with the one behind it. No-op if it is last.
    pub fn move_down(&mut self, id: TaskId) -> Result<()> {
        let pos = self.waiting_position(id)?;
        if pos + 1 >= self.waiting.len() {
            return Ok(());
        }
        self.waiting.swap(pos, pos + 1);
        log::debug!("moved {} down to waiting position {}", id, pos + 1);
        if self.config.reorder_notification == ReorderNotification::Symmetric {
            self.notify_reordered();
        }
        Ok(())
    }

    /// Deliver every active task whose finish date is due and fill the freed
    /// slot from the waiting list.
    ///
    /// A colony error is returned as-is; the failing task and every task after
    /// it stay active and are retried on the next call.
    pub fn advance(&mut self, now: Timestamp) -> Result<AdvanceReport> {
        if now < self.last_tick {
            return Err(ProductionError::invalid_argument(format!(
                "cannot advance production back in time: {} < {}",
                now, self.last_tick
            )));
        }
        self.last_tick = now;

        let mut report = AdvanceReport::default();
        let mut slot_freed = false;
        let mut i = 0;
        while i < self.active.len() {
            let (id, task) = &self.active[i];
            let due = matches!(task.finish_date(), Ok(date) if date <= now);
            if !due {
                i += 1;
                continue;
            }

            let id = *id;
            self.colony
                .on_building_finished(task.product(), task.quantity())?;
            log::info!(
                "{} delivered {} x {} at {}",
                id,
                task.quantity(),
                task.product().name(),
                now
            );
            report.finished.push(id);
            slot_freed = true;

            match self.config.completion {
                CompletionPolicy::RemoveFinished => {
                    let (id, task) = self.active.remove(i);
                    for (_, observer) in self.observers.iter_mut() {
                        observer.on_task_finished(id, &task);
                    }
                }
                CompletionPolicy::RetainFinished => i += 1,
            }
        }

        if slot_freed || self.active.is_empty() {
            report.activated = self.activate_next_waiting(now);
        }
        Ok(report)
    }

    /// Re-assign every active task's output from the colony's current daily
    /// output, keeping each task's share. Either all tasks are updated or none.
    pub fn rebalance(&mut self, now: Timestamp) -> Result<()> {
        let daily = self.colony.daily_output();
        let mut updated = Vec::with_capacity(self.active.len());
        for (id, task) in &self.active {
            let share = task.output_share();
            let output = output_for(daily, share);
            if output < 1 {
                return Err(ProductionError::invalid_argument(format!(
                    "daily output {} leaves nothing for {} at share {}",
                    daily, id, share
                )));
            }
            let mut task = task.clone();
            task.assign_output(now, output, share)?;
            updated.push(task);
        }

        for ((_, slot), task) in self.active.iter_mut().zip(updated) {
            *slot = task;
        }
        log::debug!(
            "rebalanced {} active tasks to {} points/day",
            self.active.len(),
            daily
        );
        Ok(())
    }

    /// Pin or release the output share of a queued task.
    pub fn set_share_locked(&mut self, id: TaskId, locked: bool) -> Result<()> {
        let task = self
            .waiting
            .iter_mut()
            .chain(self.active.iter_mut())
            .find(|(i, _)| *i == id)
            .map(|(_, task)| task)
            .ok_or(ProductionError::NotFound(id))?;
        task.set_share_locked(locked);
        Ok(())
    }

    pub fn add_observer(&mut self, observer: BoxedObserver<C::Product>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Returns `false` if the observer was not registered.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(i, _)| *i != id);
        self.observers.len() != before
    }

    pub fn task(&self, id: TaskId) -> Option<&ProductionTask<C::Product>> {
        find(&self.waiting, &self.active, id)
    }

    /// Waiting tasks, next to be activated first.
    pub fn waiting(&self) -> impl Iterator<Item = (TaskId, &ProductionTask<C::Product>)> {
        self.waiting.iter().map(|(id, task)| (*id, task))
    }

    pub fn active(&self) -> impl Iterator<Item = (TaskId, &ProductionTask<C::Product>)> {
        self.active.iter().map(|(id, task)| (*id, task))
    }

    pub fn waiting_ids(&self) -> Vec<TaskId> {
        self.waiting.iter().map(|(id, _)| *id).collect()
    }

    pub fn active_ids(&self) -> Vec<TaskId> {
        self.active.iter().map(|(id, _)| *id).collect()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.task(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.waiting.len() + self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty() && self.active.is_empty()
    }

    pub fn last_tick(&self) -> Timestamp {
        self.last_tick
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn colony(&self) -> &C {
        &self.colony
    }

    /// Mutable access to the colony, e.g. to change its output. Call
    /// [`rebalance`](Self::rebalance) afterwards to apply new capacity.
    pub fn colony_mut(&mut self) -> &mut C {
        &mut self.colony
    }

    fn waiting_position(&self, id: TaskId) -> Result<usize> {
        self.waiting
            .iter()
            .position(|(i, _)| *i == id)
            .ok_or(ProductionError::NotFound(id))
    }

    fn notify_reordered(&mut self) {
        for (_, observer) in self.observers.iter_mut() {
            observer.on_queue_reordered();
        }
    }

    /// Promote the head of the waiting list. Leaves it waiting if the colony
    /// cannot spare at least one point per day.
    fn activate_next_waiting(&mut self, now: Timestamp) -> Option<TaskId> {
        if self.waiting.is_empty() {
            return None;
        }

        let share = self.capacity.available_share(self.active.len());
        if !(share.is_finite() && share > 0.0 && share <= 1.0) {
            log::warn!("no capacity share available (got {}), waiting list stalled", share);
            return None;
        }
        let daily = self.colony.daily_output();
        let output = output_for(daily, share);
        if output < 1 {
            log::warn!(
                "daily output {} at share {} is too low to start production",
                daily,
                share
            );
            return None;
        }

        let (id, mut task) = self.waiting.pop_front()?;
        if let Err(e) = task.assign_output(now, output, share) {
            log::error!("could not activate {}: {}", id, e);
            self.waiting.push_front((id, task));
            return None;
        }
        if let Ok(due) = task.finish_date() {
            log::debug!(
                "activated {} with {} points/day ({:.0}%), due {}",
                id,
                output,
                share * 100.0,
                due
            );
        }
        self.active.push((id, task));
        Some(id)
    }
}

fn output_for(daily: u32, share: f32) -> u32 {
    (daily as f64 * share as f64).floor() as u32
}

fn find<'a, P>(
    waiting: &'a VecDeque<Entry<P>>,
    active: &'a [Entry<P>],
    id: TaskId,
) -> Option<&'a ProductionTask<P>> {
    waiting
        .iter()
        .chain(active.iter())
        .find(|(i, _)| *i == id)
        .map(|(_, task)| task)
}
