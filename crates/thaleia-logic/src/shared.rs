//! Thread-safe handle to a production queue.
//!
//! Each call takes the queue's single lock for its whole duration, so an
//! `advance` running on the game-loop thread and player input arriving from a
//! UI thread never interleave. The colony callback and observers run while the
//! lock is held and must not call back into the same handle.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::colony::Colony;
use crate::error::{ProductionError, Result};
use crate::queue::{AdvanceReport, ProductionQueue, TaskId};
use crate::snapshot::QueueSnapshot;
use crate::task::ProductionTask;
use crate::time::Timestamp;

pub struct SharedQueue<C: Colony> {
    inner: Arc<Mutex<ProductionQueue<C>>>,
}

impl<C: Colony> Clone for SharedQueue<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Colony> SharedQueue<C> {
    pub fn new(queue: ProductionQueue<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
        }
    }

    pub fn add(&self, task: ProductionTask<C::Product>) -> Result<TaskId> {
        self.lock()?.add(task)
    }

    pub fn remove(&self, id: TaskId) -> Result<ProductionTask<C::Product>> {
        self.lock()?.remove(id)
    }

    pub fn move_up(&self, id: TaskId) -> Result<()> {
        self.lock()?.move_up(id)
    }

    pub fn move_down(&self, id: TaskId) -> Result<()> {
        self.lock()?.move_down(id)
    }

    pub fn advance(&self, now: Timestamp) -> Result<AdvanceReport> {
        self.lock()?.advance(now)
    }

    pub fn snapshot(&self, now: Timestamp) -> Result<QueueSnapshot> {
        Ok(self.lock()?.snapshot(now))
    }

    /// Run `f` with exclusive access to the queue.
    pub fn with<R>(&self, f: impl FnOnce(&mut ProductionQueue<C>) -> R) -> Result<R> {
        let mut queue = self.lock()?;
        Ok(f(&mut queue))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProductionQueue<C>>> {
        self.inner.lock().map_err(|_| {
            ProductionError::invalid_state("production queue lock poisoned by a panicked caller")
        })
    }
}
