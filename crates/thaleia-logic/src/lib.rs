//! Colony production scheduling for Thaleia.
//!
//! This crate decides how a colony's daily industrial output turns into
//! finished buildings. It never reads a clock and never renders anything:
//! the game loop passes in timestamps, the colony supplies capacity through
//! the [`colony::Colony`] trait, and UI panels listen through
//! [`observer::QueueObserver`] or read a [`snapshot::QueueSnapshot`].
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`colony`] | Contract for the colony that owns a queue |
//! | [`config`] | Scheduler switches (accrual, completion, reorder notification) |
//! | [`error`] | `ProductionError` and the crate `Result` alias |
//! | [`observer`] | Change notifications, log and channel observers |
//! | [`product`] | `Buildable` trait, building types and the catalog |
//! | [`queue`] | Waiting list, active set, activation and ticks |
//! | [`shared`] | Mutex-guarded queue handle for multi-threaded hosts |
//! | [`snapshot`] | Serializable read-only views for display |
//! | [`task`] | One production task and its time-to-work conversion |
//! | [`time`] | Game-time timestamps and the day constant |

pub mod colony;
pub mod config;
pub mod error;
pub mod observer;
pub mod product;
pub mod queue;
pub mod shared;
pub mod snapshot;
pub mod task;
pub mod time;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::colony::Colony;
    pub use crate::config::{AccrualPolicy, CompletionPolicy, ReorderNotification, SchedulerConfig};
    pub use crate::error::{CallbackError, ProductionError};
    pub use crate::observer::{ChannelObserver, LogObserver, QueueEvent, QueueObserver};
    pub use crate::product::{Buildable, BuildingCatalog, BuildingType};
    pub use crate::queue::{AdvanceReport, CapacityPolicy, FullCapacity, ProductionQueue, TaskId};
    pub use crate::shared::SharedQueue;
    pub use crate::snapshot::{QueueSnapshot, TaskView};
    pub use crate::task::ProductionTask;
    pub use crate::time::{Timestamp, MS_PER_DAY};
}
