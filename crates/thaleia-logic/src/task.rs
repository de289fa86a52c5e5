//! A single production task: a building type times a quantity.
//!
//! A task is created inactive. Activation assigns it a daily output and a
//! share of the colony's capacity, from which the finish date is projected.
//! Work is only booked when the output changes or the task is halted: the
//! elapsed time since the last booking is converted into spent cost.
//!
//! Lifecycle:
//! ```text
//! new ──assign_output──► active ──halt──► inactive
//!                          │  ▲             │
//!                          └──┘ (re-assign) └──assign_output──► active
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ProductionError, Result};
use crate::product::Buildable;
use crate::time::{Timestamp, MS_PER_DAY};

/// How elapsed time is converted into finished work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualPolicy {
    /// Only whole elapsed days count; the partial day is dropped on every
    /// booking. Matches the numbers of existing save games.
    #[default]
    WholeDays,
    /// Every elapsed millisecond counts. The booked cost is truncated toward
    /// zero.
    FractionalDays,
}

impl AccrualPolicy {
    /// Cost left after working `elapsed_ms` at `output_per_day`.
    pub fn remaining_after(self, remaining: i64, output_per_day: u32, elapsed_ms: i64) -> i64 {
        match self {
            AccrualPolicy::WholeDays => {
                let days = elapsed_ms / MS_PER_DAY;
                remaining.saturating_sub((output_per_day as i64).saturating_mul(days))
            }
            AccrualPolicy::FractionalDays => {
                let days = elapsed_ms as f64 / MS_PER_DAY as f64;
                (remaining as f64 - output_per_day as f64 * days) as i64
            }
        }
    }
}

/// One queued or active unit of construction work.
#[derive(Debug, Clone)]
pub struct ProductionTask<P> {
    product: P,
    quantity: u32,
    total_cost: i64,
    remaining_cost: i64,
    active: bool,
    last_updated: Option<Timestamp>,
    output_per_day: u32,
    finish_date: Option<Timestamp>,
    output_share: f32,
    share_locked: bool,
    accrual: AccrualPolicy,
}

impl<P: Buildable> ProductionTask<P> {
    /// Create an inactive task for `quantity` units of `product`.
    pub fn new(product: P, quantity: u32) -> Result<Self> {
        if quantity < 1 {
            return Err(ProductionError::invalid_argument(format!(
                "cannot build {} x '{}': quantity must be at least 1",
                quantity,
                product.name()
            )));
        }
        if product.unit_cost() < 1 {
            return Err(ProductionError::invalid_argument(format!(
                "'{}' has no unit cost",
                product.name()
            )));
        }

        let Some(total_cost) = (product.unit_cost() as i64).checked_mul(quantity as i64) else {
            return Err(ProductionError::invalid_argument(format!(
                "cannot build {} x '{}': total cost is too large",
                quantity,
                product.name()
            )));
        };
        Ok(Self {
            product,
            quantity,
            total_cost,
            remaining_cost: total_cost,
            active: false,
            last_updated: None,
            output_per_day: 0,
            finish_date: None,
            output_share: 0.0,
            share_locked: false,
            accrual: AccrualPolicy::default(),
        })
    }

    pub fn with_accrual(mut self, accrual: AccrualPolicy) -> Self {
        self.accrual = accrual;
        self
    }

    /// Start the task, resume it, or change the output it is worked with.
    ///
    /// If the task was already running, the work done since the last booking
    /// is booked first at the old output. While the share is locked only the
    /// daily output may change, not the share itself.
    pub fn assign_output(&mut self, now: Timestamp, output_per_day: u32, share: f32) -> Result<()> {
        if output_per_day < 1 {
            return Err(ProductionError::invalid_argument(format!(
                "cannot work on {} with an output below 1",
                self.describe()
            )));
        }
        if !(share.is_finite() && share > 0.0 && share <= 1.0) {
            return Err(ProductionError::invalid_argument(format!(
                "output share {} for {} is outside (0, 1]",
                share,
                self.describe()
            )));
        }

        let remaining = match self.last_updated {
            Some(_) => {
                if self.share_locked && self.output_share != share {
                    return Err(ProductionError::invalid_state(format!(
                        "cannot change output share of {} while locked",
                        self.describe()
                    )));
                }
                self.remaining_at(now)?
            }
            None => self.remaining_cost,
        };

        let days_to_finish = remaining as f64 / output_per_day as f64;
        let Some(finish_date) = now.checked_plus_days(days_to_finish) else {
            return Err(ProductionError::invalid_argument(format!(
                "{} at {} per day would finish beyond the end of game time",
                self.describe(),
                output_per_day
            )));
        };
        self.remaining_cost = remaining;
        self.finish_date = Some(finish_date);
        self.last_updated = Some(now);
        self.output_per_day = output_per_day;
        self.active = true;
        self.output_share = share;
        Ok(())
    }

    /// Pause the task, booking the work done up to `now` and releasing its
    /// output. Also releases the share lock.
    pub fn halt(&mut self, now: Timestamp) -> Result<()> {
        if !self.active {
            return Err(ProductionError::invalid_state(format!(
                "cannot halt {}: it is not active",
                self.describe()
            )));
        }

        self.remaining_cost = self.remaining_at(now)?;
        self.finish_date = None;
        self.last_updated = None;
        self.output_per_day = 0;
        self.active = false;
        self.share_locked = false;
        Ok(())
    }

    /// Projected completion. Only defined while active.
    pub fn finish_date(&self) -> Result<Timestamp> {
        match (self.active, self.finish_date) {
            (true, Some(date)) => Ok(date),
            _ => Err(ProductionError::invalid_state(format!(
                "{} has no finish date while inactive",
                self.describe()
            ))),
        }
    }

    /// Remaining cost if the work since the last booking were booked at
    /// `now`. Does not change the task. Times before the last booking count
    /// as no progress.
    pub fn projected_remaining(&self, now: Timestamp) -> i64 {
        match self.last_updated {
            Some(last) if self.active && now >= last => self.accrual.remaining_after(
                self.remaining_cost,
                self.output_per_day,
                now.millis_since(last),
            ),
            _ => self.remaining_cost,
        }
    }

    pub fn set_share_locked(&mut self, locked: bool) {
        self.share_locked = locked;
    }

    /// Whether the output share is pinned. Always `false` for an inactive
    /// task.
    pub fn is_share_locked(&self) -> bool {
        self.active && self.share_locked
    }

    /// Cost units still to be produced as of the last booking. May be
    /// negative when a booking overshoots.
    pub fn remaining_cost(&self) -> i64 {
        self.remaining_cost
    }

    /// Cost of the whole task at creation.
    pub fn total_cost(&self) -> i64 {
        self.total_cost
    }

    /// Share of the total cost already booked, in [0, 1].
    pub fn completed_fraction(&self) -> f32 {
        let done = (self.total_cost - self.remaining_cost) as f64 / self.total_cost as f64;
        done.clamp(0.0, 1.0) as f32
    }

    pub fn product(&self) -> &P {
        &self.product
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Daily output currently assigned; 0 while inactive.
    pub fn output_per_day(&self) -> u32 {
        self.output_per_day
    }

    pub fn output_share(&self) -> f32 {
        self.output_share
    }

    pub fn last_updated(&self) -> Option<Timestamp> {
        self.last_updated
    }

    pub fn accrual(&self) -> AccrualPolicy {
        self.accrual
    }

    fn remaining_at(&self, now: Timestamp) -> Result<i64> {
        let Some(last) = self.last_updated else {
            return Ok(self.remaining_cost);
        };
        if now < last {
            return Err(ProductionError::invalid_argument(format!(
                "cannot book work on {} in the past: {} < {}",
                self.describe(),
                now,
                last
            )));
        }
        Ok(self
            .accrual
            .remaining_after(self.remaining_cost, self.output_per_day, now.millis_since(last)))
    }

    fn describe(&self) -> String {
        format!("{} x {}", self.quantity, self.product.name())
    }
}
