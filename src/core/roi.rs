use std::{collections::BTreeMap, sync::Arc};

use bon::Builder;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    core::{
        flow::Flow,
        investment::Investments,
        price::{PricePair, Pricing, PricingMode},
        provider::{IntervalProvider, IntervalSample, PriceProvider},
        record::YearSimulationResult,
        simulator::simulate_years,
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Cumulative savings and payback of the investments over a date range.
#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct RoiCalculator<P> {
    provider: Arc<P>,
    investments: Investments,
    pricing: Pricing,

    /// First day of the analysis window.
    start: NaiveDate,

    /// Last day of the analysis window, inclusive.
    end: NaiveDate,
}

impl<P, S> RoiCalculatorBuilder<P, S>
where
    P: IntervalProvider + PriceProvider + 'static,
    S: roi_calculator_builder::IsComplete,
{
    pub async fn calculate(self) -> Result<RoiAnalysis> {
        self.build().calculate().await
    }
}

impl<P: IntervalProvider + PriceProvider + 'static> RoiCalculator<P> {
    #[instrument(skip_all, fields(start = %self.start, end = %self.end))]
    async fn calculate(self) -> Result<RoiAnalysis> {
        ensure!(
            self.start <= self.end,
            "the analysis window is empty: {} is after {}",
            self.start,
            self.end,
        );
        let simulations = match self.investments.battery {
            Some(battery) => {
                // Days before the installation do not need the simulation:
                let first_year = self.start.year().max(battery.installed_on.year());
                simulate_years(
                    Arc::clone(&self.provider),
                    battery.config,
                    self.pricing,
                    first_year..=self.end.year(),
                )
                .await?
            }
            None => BTreeMap::new(),
        };
        Ok(self.aggregate(&simulations))
    }

    fn aggregate(&self, simulations: &BTreeMap<i32, YearSimulationResult>) -> RoiAnalysis {
        let solar = self.investments.solar;
        let battery = self.investments.battery;

        let mut solar_payback =
            solar.map(|solar| PaybackTracker::new(solar.installed_on, solar.cost));
        let mut battery_payback =
            battery.map(|battery| PaybackTracker::new(battery.installed_on, battery.cost));
        let mut combined_payback = solar.zip(battery).map(|(solar, battery)| {
            PaybackTracker::new(
                solar.installed_on.min(battery.installed_on),
                solar.cost + battery.cost,
            )
        });

        let mut points = Vec::new();
        let mut cumulative_solar_savings = Cost::ZERO;
        let mut cumulative_battery_savings = Cost::ZERO;

        for date in self.start.iter_days().take_while(|date| *date <= self.end) {
            let Some(costs) = self.daily_costs(date, simulations) else {
                continue;
            };
            let is_solar_active = solar.is_some_and(|solar| date >= solar.installed_on);
            let is_battery_active = battery.is_some_and(|battery| date >= battery.installed_on);

            let solar_cost = if is_solar_active { costs.no_battery } else { costs.baseline };
            let solar_and_battery_cost =
                if is_solar_active && is_battery_active { costs.with_battery } else { solar_cost };
            let solar_savings = costs.baseline - solar_cost;
            let battery_savings = solar_cost - solar_and_battery_cost;

            cumulative_solar_savings += solar_savings;
            cumulative_battery_savings += battery_savings;

            points.push(RoiPoint {
                date,
                mode: costs.mode,
                baseline_cost: costs.baseline,
                solar_cost,
                solar_and_battery_cost,
                solar_savings,
                battery_savings,
                cumulative_solar_savings,
                cumulative_battery_savings,
                solar_net_position: solar_payback
                    .as_mut()
                    .map(|tracker| tracker.push(date, solar_savings)),
                battery_net_position: battery_payback
                    .as_mut()
                    .map(|tracker| tracker.push(date, battery_savings)),
                combined_net_position: combined_payback
                    .as_mut()
                    .map(|tracker| tracker.push(date, solar_savings + battery_savings)),
            });
        }

        info!(
            n_points = points.len(),
            solar_savings = %cumulative_solar_savings,
            battery_savings = %cumulative_battery_savings,
            "aggregated",
        );
        RoiAnalysis {
            start: self.start,
            end: self.end,
            investments: self.investments,
            points,
            solar: solar_payback.map(PaybackTracker::finish),
            battery: battery_payback.map(PaybackTracker::finish),
            combined: combined_payback.map(PaybackTracker::finish),
        }
    }

    /// Costs of the day under the pricing mode in effect, [`None`] when the day has no data.
    fn daily_costs(
        &self,
        date: NaiveDate,
        simulations: &BTreeMap<i32, YearSimulationResult>,
    ) -> Option<DailyCosts> {
        let mode = self.pricing.dynamic.mode_on(date);

        if let Some(day) = simulations.get(&date.year()).and_then(|result| result.day(date)) {
            let costs = day.costs();
            return Some(DailyCosts {
                mode,
                baseline: day.consumption_cost(mode),
                no_battery: costs.no_battery(mode),
                with_battery: costs.with_battery(mode),
            });
        }

        let samples = match self.provider.get_daily_intervals(date) {
            Ok(samples) => samples,
            Err(error) => {
                warn!(%date, "skipping the day: {error:#}");
                return None;
            }
        };
        if samples.is_empty() {
            return None;
        }
        let prices: Vec<PricePair> = samples
            .iter()
            .map(|sample| self.pricing.resolve(self.provider.as_ref(), mode, sample.timestamp))
            .collect();
        let baseline: Cost = samples
            .iter()
            .zip(&prices)
            .map(|(sample, prices)| sample.consumption * prices.import)
            .sum();

        // Without the battery the day is netted as a whole, at the day's average prices:
        let net_demand: KilowattHours = samples.iter().map(IntervalSample::net_demand).sum();
        let no_battery = PricePair::average(&prices)
            .map_or(Cost::ZERO, |prices| Flow::from_net_demand(net_demand).cost(prices));
        Some(DailyCosts { mode, baseline, no_battery, with_battery: no_battery })
    }
}

#[derive(Copy, Clone)]
struct DailyCosts {
    mode: PricingMode,

    /// All consumption imported.
    baseline: Cost,

    no_battery: Cost,
    with_battery: Cost,
}

/// Day of the analysis.
#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
pub struct RoiPoint {
    pub date: NaiveDate,
    pub mode: PricingMode,

    pub baseline_cost: Cost,
    pub solar_cost: Cost,
    pub solar_and_battery_cost: Cost,

    pub solar_savings: Cost,
    pub battery_savings: Cost,
    pub cumulative_solar_savings: Cost,
    pub cumulative_battery_savings: Cost,

    /// Cumulative savings minus the investment cost.
    pub solar_net_position: Option<Cost>,
    pub battery_net_position: Option<Cost>,
    pub combined_net_position: Option<Cost>,
}

#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
pub struct Payback {
    pub installed_on: NaiveDate,
    pub cost: Cost,

    /// Savings over the entire analysis window.
    pub savings: Cost,

    /// First day when the savings covered the cost.
    pub break_even_on: Option<NaiveDate>,

    /// Whole months between the installation and the break-even.
    pub months: Option<i64>,
}

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct RoiAnalysis {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub investments: Investments,

    /// One point per day with data.
    pub points: Vec<RoiPoint>,

    pub solar: Option<Payback>,
    pub battery: Option<Payback>,

    /// Both investments together, only when both are present.
    pub combined: Option<Payback>,
}

struct PaybackTracker {
    installed_on: NaiveDate,
    cost: Cost,
    savings: Cost,
    break_even_on: Option<NaiveDate>,
}

impl PaybackTracker {
    const fn new(installed_on: NaiveDate, cost: Cost) -> Self {
        Self { installed_on, cost, savings: Cost::ZERO, break_even_on: None }
    }

    /// Add the day's savings and return the net position.
    ///
    /// The first break-even is final, later dips below zero do not reset it.
    fn push(&mut self, date: NaiveDate, savings: Cost) -> Cost {
        self.savings += savings;
        let net_position = self.savings - self.cost;
        if self.break_even_on.is_none() && date >= self.installed_on && net_position >= Cost::ZERO
        {
            debug!(%date, installed_on = %self.installed_on, cost = %self.cost, "break-even");
            self.break_even_on = Some(date);
        }
        net_position
    }

    fn finish(self) -> Payback {
        Payback {
            installed_on: self.installed_on,
            cost: self.cost,
            savings: self.savings,
            break_even_on: self.break_even_on,
            months: self.break_even_on.map(|date| whole_months_between(self.installed_on, date)),
        }
    }
}

/// Number of completed calendar months.
fn whole_months_between(since: NaiveDate, until: NaiveDate) -> i64 {
    let months = i64::from(until.year() - since.year()) * 12 + i64::from(until.month())
        - i64::from(since.month());
    if until.day() < since.day() { months - 1 } else { months }
}
