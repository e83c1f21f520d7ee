use std::{iter::Sum, ops::Add};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{
    core::{
        battery::BatteryConfig,
        dispatch::Dispatch,
        flow::Flow,
        price::{PricePair, Pricing, PricingMode},
    },
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Both price pairs of an interval.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntervalPrices {
    /// Market prices after the fallback.
    ///
    /// Equal to the fixed pair when the market price is unknown,
    /// or when dynamic pricing is not in effect on the date.
    pub dynamic: PricePair,

    pub fixed: PricePair,
}

impl IntervalPrices {
    pub const fn get(self, mode: PricingMode) -> PricePair {
        match mode {
            PricingMode::Fixed => self.fixed,
            PricingMode::Dynamic => self.dynamic,
        }
    }
}

/// Net grid cost under every combination of the scenario and the pricing mode.
#[must_use]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    derive_more::Add,
    derive_more::AddAssign,
)]
pub struct Costs {
    pub no_battery_dynamic: Cost,
    pub with_battery_dynamic: Cost,
    pub no_battery_fixed: Cost,
    pub with_battery_fixed: Cost,
}

impl Costs {
    pub fn new(
        baseline: Flow<KilowattHours>,
        with_battery: Flow<KilowattHours>,
        prices: IntervalPrices,
    ) -> Self {
        Self {
            no_battery_dynamic: baseline.cost(prices.dynamic),
            with_battery_dynamic: with_battery.cost(prices.dynamic),
            no_battery_fixed: baseline.cost(prices.fixed),
            with_battery_fixed: with_battery.cost(prices.fixed),
        }
    }

    pub const fn no_battery(self, mode: PricingMode) -> Cost {
        match mode {
            PricingMode::Fixed => self.no_battery_fixed,
            PricingMode::Dynamic => self.no_battery_dynamic,
        }
    }

    pub const fn with_battery(self, mode: PricingMode) -> Cost {
        match mode {
            PricingMode::Fixed => self.with_battery_fixed,
            PricingMode::Dynamic => self.with_battery_dynamic,
        }
    }

    /// What the battery saves under the pricing mode.
    pub fn battery_savings(self, mode: PricingMode) -> Cost {
        self.no_battery(mode) - self.with_battery(mode)
    }

    /// What dynamic pricing saves compared to the fixed rate.
    pub fn dynamic_pricing_advantage(self) -> DynamicPricingAdvantage {
        DynamicPricingAdvantage {
            no_battery: self.no_battery_fixed - self.no_battery_dynamic,
            with_battery: self.with_battery_fixed - self.with_battery_dynamic,
        }
    }
}

impl Sum for Costs {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DynamicPricingAdvantage {
    pub no_battery: Cost,
    pub with_battery: Cost,
}

/// Simulated quarter-hour.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct IntervalRecord {
    pub timestamp: NaiveDateTime,
    pub production: KilowattHours,
    pub consumption: KilowattHours,

    /// Positive on deficit, negative on surplus.
    pub net_demand: KilowattHours,

    /// Grid flow without any battery.
    pub baseline: Flow<KilowattHours>,

    /// Battery and grid flows with the battery.
    pub dispatch: Dispatch,

    /// Battery level at the end of the interval, percent of the usable capacity.
    pub state_of_charge: f64,

    pub prices: IntervalPrices,
    pub costs: Costs,
}

impl IntervalRecord {
    /// Cost of importing the entire consumption, as if there were no solar panels.
    pub fn consumption_cost(&self, mode: PricingMode) -> Cost {
        self.consumption * self.prices.get(mode).import
    }
}

/// Simulated day, all the totals are derived from the intervals.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub intervals: Vec<IntervalRecord>,
}

impl DailyRecord {
    pub fn costs(&self) -> Costs {
        self.intervals.iter().map(|interval| interval.costs).sum()
    }

    pub fn production(&self) -> KilowattHours {
        self.intervals.iter().map(|interval| interval.production).sum()
    }

    pub fn consumption(&self) -> KilowattHours {
        self.intervals.iter().map(|interval| interval.consumption).sum()
    }

    /// Total grid flow without the battery.
    pub fn baseline(&self) -> Flow<KilowattHours> {
        self.intervals.iter().map(|interval| interval.baseline).sum()
    }

    /// Total grid flow with the battery.
    pub fn grid(&self) -> Flow<KilowattHours> {
        self.intervals.iter().map(|interval| interval.dispatch.grid).sum()
    }

    /// Total charge (import) and discharge (export) of the battery.
    pub fn battery(&self) -> Flow<KilowattHours> {
        self.intervals.iter().map(|interval| interval.dispatch.battery).sum()
    }

    pub fn consumption_cost(&self, mode: PricingMode) -> Cost {
        self.intervals.iter().map(|interval| interval.consumption_cost(mode)).sum()
    }

    /// Battery level left for the next day.
    pub fn closing_level(&self) -> Option<KilowattHours> {
        self.intervals.last().map(|interval| interval.dispatch.level_after)
    }
}

/// Simulated calendar year.
#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct YearSimulationResult {
    pub year: i32,
    pub battery: BatteryConfig,
    pub pricing: Pricing,

    /// Simulated days in ascending order, days without data are absent.
    pub days: Vec<DailyRecord>,
}

impl YearSimulationResult {
    pub fn day(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.days.binary_search_by_key(&date, |day| day.date).ok().map(|index| &self.days[index])
    }

    pub fn costs(&self) -> Costs {
        self.days.iter().map(DailyRecord::costs).sum()
    }

    pub fn battery_flow(&self) -> Flow<KilowattHours> {
        self.days.iter().map(DailyRecord::battery).sum()
    }

    pub fn dynamic_pricing_advantage(&self) -> DynamicPricingAdvantage {
        self.costs().dynamic_pricing_advantage()
    }

    /// Total discharge expressed in full discharges of the usable capacity.
    #[must_use]
    pub fn equivalent_full_cycles(&self) -> f64 {
        self.battery_flow().export / self.battery.usable_capacity()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::quantity::rate::KilowattHourRate;

    fn prices() -> IntervalPrices {
        IntervalPrices {
            dynamic: PricePair {
                import: KilowattHourRate::from(0.20),
                export: KilowattHourRate::from(0.10),
            },
            fixed: PricePair {
                import: KilowattHourRate::from(0.30),
                export: KilowattHourRate::from(0.05),
            },
        }
    }

    #[test]
    fn test_costs() {
        let baseline = Flow { import: KilowattHours::from(1.0), export: KilowattHours::ZERO };
        let with_battery = Flow { import: KilowattHours::from(0.5), export: KilowattHours::ZERO };
        let costs = Costs::new(baseline, with_battery, prices());
        assert_abs_diff_eq!(costs.no_battery_dynamic.0, 0.20);
        assert_abs_diff_eq!(costs.with_battery_dynamic.0, 0.10);
        assert_abs_diff_eq!(costs.no_battery_fixed.0, 0.30);
        assert_abs_diff_eq!(costs.with_battery_fixed.0, 0.15);
        assert_abs_diff_eq!(costs.battery_savings(PricingMode::Fixed).0, 0.15);
        assert_abs_diff_eq!(costs.battery_savings(PricingMode::Dynamic).0, 0.10);

        let advantage = costs.dynamic_pricing_advantage();
        assert_abs_diff_eq!(advantage.no_battery.0, 0.10);
        assert_abs_diff_eq!(advantage.with_battery.0, 0.05);
    }

    #[test]
    fn test_export_earns() {
        let baseline = Flow { import: KilowattHours::ZERO, export: KilowattHours::from(2.0) };
        let costs = Costs::new(baseline, baseline, prices());
        assert_abs_diff_eq!(costs.no_battery_fixed.0, -0.10);
        assert_abs_diff_eq!(costs.no_battery_dynamic.0, -0.20);
    }

    #[test]
    fn test_costs_sum() {
        let costs = Costs {
            no_battery_dynamic: Cost::from(1.0),
            with_battery_dynamic: Cost::from(2.0),
            no_battery_fixed: Cost::from(3.0),
            with_battery_fixed: Cost::from(4.0),
        };
        let total: Costs = [costs, costs].into_iter().sum();
        assert_abs_diff_eq!(total.no_battery_dynamic.0, 2.0);
        assert_abs_diff_eq!(total.with_battery_fixed.0, 8.0);
    }
}
