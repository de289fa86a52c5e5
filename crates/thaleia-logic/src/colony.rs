//! The colony side of the production queue.

use crate::error::CallbackError;
use crate::product::Buildable;

/// The colony that owns a production queue.
///
/// It supplies the industrial capacity that tasks are built with and takes
/// delivery of finished buildings.
pub trait Colony {
    type Product: Buildable + Clone;

    /// Industrial points produced per day. Queried whenever a task is
    /// activated or the queue is rebalanced.
    fn daily_output(&self) -> u32;

    /// Called synchronously from [`ProductionQueue::advance`] when a task is
    /// done. Must not touch the queue. An error aborts the tick and is handed
    /// back to the caller of `advance`.
    ///
    /// [`ProductionQueue::advance`]: crate::queue::ProductionQueue::advance
    fn on_building_finished(
        &mut self,
        product: &Self::Product,
        quantity: u32,
    ) -> Result<(), CallbackError>;
}
