//! Game-time instants for the production scheduler.
//!
//! The scheduler never reads a clock. Every operation that depends on time is
//! handed a [`Timestamp`] by the caller (normally the game loop), and all
//! day-based arithmetic goes through the exact [`MS_PER_DAY`] constant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Milliseconds in one game day.
pub const MS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

/// A point in game time, in milliseconds since the game epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp(0);

    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    /// Start of the given game day.
    pub const fn from_days(days: i64) -> Self {
        Self(days * MS_PER_DAY)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Whole days since the epoch, rounded toward negative infinity.
    pub fn day(self) -> i64 {
        self.0.div_euclid(MS_PER_DAY)
    }

    /// Shift by a whole number of days.
    pub const fn plus_whole_days(self, days: i64) -> Self {
        Self(self.0 + days * MS_PER_DAY)
    }

    /// Shift by a fractional number of days. Sub-millisecond remainders are
    /// truncated.
    /// Saturates at the ends of the time line.
    pub fn plus_days(self, days: f64) -> Self {
        Self(self.0.saturating_add((days * MS_PER_DAY as f64) as i64))
    }

    /// Like [`plus_days`](Self::plus_days), but `None` when the result does
    /// not fit in a timestamp.
    pub fn checked_plus_days(self, days: f64) -> Option<Self> {
        let ms = days * MS_PER_DAY as f64;
        if !ms.is_finite() || ms >= i64::MAX as f64 || ms < i64::MIN as f64 {
            return None;
        }
        self.0.checked_add(ms as i64).map(Self)
    }

    pub const fn plus_millis(self, ms: i64) -> Self {
        Self(self.0 + ms)
    }

    /// Milliseconds elapsed since `earlier`. Negative if `earlier` is later.
    pub const fn millis_since(self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = self.day();
        let rem = self.0 - day * MS_PER_DAY;
        let hours = rem / (60 * 60 * 1000);
        let minutes = (rem / (60 * 1000)) % 60;
        write!(f, "day {} {:02}:{:02}", day, hours, minutes)
    }
}
