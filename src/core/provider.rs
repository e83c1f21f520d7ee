use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{core::price::PricePair, prelude::*, quantity::energy::KilowattHours};

/// Maximum number of quarter-hours in a day.
pub const MAX_INTERVALS_PER_DAY: usize = 96;

/// Measured energy within a single quarter-hour.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSample {
    /// Start of the quarter-hour.
    pub timestamp: NaiveDateTime,

    pub production: KilowattHours,
    pub consumption: KilowattHours,
}

impl IntervalSample {
    /// Positive on deficit, negative on surplus.
    pub fn net_demand(&self) -> KilowattHours {
        self.consumption - self.production
    }
}

/// Source of the household production and consumption.
pub trait IntervalProvider: Send + Sync {
    /// Get the chronologically ordered samples of the day.
    ///
    /// A complete day has [`MAX_INTERVALS_PER_DAY`] samples, a missing day has none.
    fn get_daily_intervals(&self, date: NaiveDate) -> Result<Vec<IntervalSample>>;
}

/// Source of the dynamic market prices.
pub trait PriceProvider: Send + Sync {
    /// Get the prices of the quarter-hour starting at the timestamp, if known.
    fn get_price(&self, timestamp: NaiveDateTime) -> Option<PricePair>;
}
