use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    core::{
        flow::Flow,
        record::{Costs, DailyRecord},
    },
    quantity::energy::KilowattHours,
};

/// Totals over a run of consecutive days.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub n_days: usize,
    pub production: KilowattHours,
    pub consumption: KilowattHours,
    pub baseline: Flow<KilowattHours>,
    pub grid: Flow<KilowattHours>,
    pub battery: Flow<KilowattHours>,
    pub costs: Costs,
}

impl PeriodSummary {
    /// Summarize the days, [`None`] when there are none.
    pub fn from_days<'a>(days: impl IntoIterator<Item = &'a DailyRecord>) -> Option<Self> {
        let mut days = days.into_iter();
        let first = days.next()?;
        let initial = Self {
            first_day: first.date,
            last_day: first.date,
            n_days: 1,
            production: first.production(),
            consumption: first.consumption(),
            baseline: first.baseline(),
            grid: first.grid(),
            battery: first.battery(),
            costs: first.costs(),
        };
        Some(days.fold(initial, |mut summary, day| {
            summary.last_day = day.date;
            summary.n_days += 1;
            summary.production += day.production();
            summary.consumption += day.consumption();
            summary.baseline += day.baseline();
            summary.grid += day.grid();
            summary.battery += day.battery();
            summary.costs += day.costs();
            summary
        }))
    }

    /// Summarize the days per calendar month.
    ///
    /// The days must be in ascending order.
    pub fn monthly(days: &[DailyRecord]) -> Vec<Self> {
        days.iter()
            .chunk_by(|day| (day.date.year(), day.date.month()))
            .into_iter()
            .filter_map(|(_, month)| Self::from_days(month))
            .collect()
    }
}
