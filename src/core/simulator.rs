use std::{collections::BTreeMap, sync::Arc};

use bon::Builder;
use chrono::{Datelike, NaiveDate};
use tokio::task::JoinSet;

use crate::{
    core::{
        battery::BatteryConfig,
        dispatch::dispatch,
        flow::Flow,
        price::Pricing,
        provider::{IntervalProvider, IntervalSample, PriceProvider},
        record::{Costs, DailyRecord, IntervalPrices, IntervalRecord, YearSimulationResult},
        summary::PeriodSummary,
    },
    prelude::*,
    quantity::energy::KilowattHours,
};

/// Runs the dispatch engine over days and years.
#[derive(Builder)]
pub struct Simulator<'a, P> {
    provider: &'a P,
    battery: BatteryConfig,
    pricing: Pricing,
}

impl<P: IntervalProvider + PriceProvider> Simulator<'_, P> {
    /// Simulate the calendar year starting with an empty battery.
    ///
    /// Days without data, or with malformed data, are skipped.
    #[instrument(skip_all, fields(year = year))]
    pub fn run_year(&self, year: i32) -> Result<YearSimulationResult> {
        let first_day = NaiveDate::from_ymd_opt(year, 1, 1)
            .with_context(|| format!("year {year} is out of range"))?;

        let mut level = KilowattHours::ZERO;
        let mut days = Vec::new();
        for date in first_day.iter_days().take_while(|date| date.year() == year) {
            let samples = match self.provider.get_daily_intervals(date) {
                Ok(samples) => samples,
                Err(error) => {
                    warn!(%date, "skipping the day: {error:#}");
                    continue;
                }
            };
            if samples.is_empty() {
                trace!(%date, "no data");
                continue;
            }
            let day = self.simulate_day(date, &samples, level);
            level = day.closing_level().unwrap_or(level);
            days.push(day);
        }

        let result = YearSimulationResult { year, battery: self.battery, pricing: self.pricing, days };
        if let Some(summary) = PeriodSummary::from_days(&result.days) {
            let costs = summary.costs;
            info!(
                n_days = summary.n_days,
                no_battery = %costs.no_battery_fixed,
                with_battery = %costs.with_battery_fixed,
                no_battery_dynamic = %costs.no_battery_dynamic,
                with_battery_dynamic = %costs.with_battery_dynamic,
                "simulated the year",
            );
        } else {
            warn!("no data for the entire year");
        }
        Ok(result)
    }

    /// Simulate the day's samples in order, threading the battery level through them.
    pub fn simulate_day(
        &self,
        date: NaiveDate,
        samples: &[IntervalSample],
        opening_level: KilowattHours,
    ) -> DailyRecord {
        let mode = self.pricing.dynamic.mode_on(date);
        let mut level = opening_level;
        let intervals = samples
            .iter()
            .map(|sample| {
                let prices = IntervalPrices {
                    dynamic: self.pricing.resolve(self.provider, mode, sample.timestamp),
                    fixed: self.pricing.fixed,
                };
                let record = self.simulate_interval(sample, level, prices);
                level = record.dispatch.level_after;
                record
            })
            .collect();
        let day = DailyRecord { date, intervals };
        debug!(
            %date,
            %mode,
            production = %day.production(),
            consumption = %day.consumption(),
            closing_level = %level,
            "simulated the day",
        );
        day
    }

    fn simulate_interval(
        &self,
        sample: &IntervalSample,
        level: KilowattHours,
        prices: IntervalPrices,
    ) -> IntervalRecord {
        let net_demand = sample.net_demand();
        let baseline = Flow::from_net_demand(net_demand);
        let dispatch =
            dispatch(&self.battery, level, sample.production, sample.consumption, prices.dynamic);
        IntervalRecord {
            timestamp: sample.timestamp,
            production: sample.production,
            consumption: sample.consumption,
            net_demand,
            baseline,
            dispatch,
            state_of_charge: self.battery.state_of_charge(dispatch.level_after),
            prices,
            costs: Costs::new(baseline, dispatch.grid, prices),
        }
    }
}

/// Simulate the years concurrently, one blocking task per year.
#[instrument(skip_all)]
pub async fn simulate_years<P>(
    provider: Arc<P>,
    battery: BatteryConfig,
    pricing: Pricing,
    years: impl IntoIterator<Item = i32>,
) -> Result<BTreeMap<i32, YearSimulationResult>>
where
    P: IntervalProvider + PriceProvider + 'static,
{
    let mut tasks = JoinSet::new();
    for year in years {
        let provider = Arc::clone(&provider);
        tasks.spawn_blocking(move || {
            Simulator::builder()
                .provider(provider.as_ref())
                .battery(battery)
                .pricing(pricing)
                .build()
                .run_year(year)
        });
    }

    let mut results = BTreeMap::new();
    while let Some(result) = tasks.join_next().await {
        let result = result.context("the simulation task has failed")??;
        results.insert(result.year, result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{NaiveDateTime, TimeDelta};

    use super::*;
    use crate::{
        core::{
            dispatch::STEP,
            price::{DynamicPricing, PricePair, PricingMode},
        },
        dataset::Dataset,
        quantity::{cost::Cost, power::Kilowatts, rate::KilowattHourRate},
    };

    fn battery() -> Result<BatteryConfig> {
        BatteryConfig::builder()
            .capacity(KilowattHours::from(5.0))
            .max_charge_power(Kilowatts::from(2.5))
            .max_discharge_power(Kilowatts::from(2.5))
            .try_build()
    }

    fn fixed_prices() -> PricePair {
        PricePair { import: KilowattHourRate::from(0.30), export: KilowattHourRate::from(0.05) }
    }

    fn fixed_pricing() -> Pricing {
        Pricing { fixed: fixed_prices(), dynamic: DynamicPricing::DISABLED }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    /// Full day with the production and consumption produced by the function of the quarter-hour index.
    fn full_day(date: NaiveDate, energy: impl Fn(i32) -> (f64, f64)) -> Vec<IntervalSample> {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap();
        (0..96)
            .map(|index| {
                let (production, consumption) = energy(index);
                IntervalSample {
                    timestamp: midnight + STEP * index,
                    production: KilowattHours::from(production),
                    consumption: KilowattHours::from(consumption),
                }
            })
            .collect()
    }

    /// Sunny middle of the day, consumption in the evening.
    fn sunny_day(date: NaiveDate) -> Vec<IntervalSample> {
        full_day(date, |index| match index {
            40..56 => (1.0, 0.1),
            72..88 => (0.0, 0.5),
            _ => (0.0, 0.05),
        })
    }

    #[test]
    fn test_no_production_never_engages_the_battery() -> Result {
        let day = date(2024, 1, 10);
        let samples = full_day(day, |_| (0.0, 0.3));
        let dataset = Dataset::from_samples(samples.clone())?;
        let simulator = Simulator::builder()
            .provider(&dataset)
            .battery(battery()?)
            .pricing(fixed_pricing())
            .build();

        let record = simulator.simulate_day(day, &samples, KilowattHours::ZERO);
        assert_eq!(record.intervals.len(), 96);
        assert_eq!(record.closing_level(), Some(KilowattHours::ZERO));
        for interval in &record.intervals {
            assert_eq!(interval.costs.with_battery_fixed, interval.costs.no_battery_fixed);
            assert_eq!(interval.costs.with_battery_dynamic, interval.costs.no_battery_dynamic);
            assert_eq!(interval.dispatch.battery, Flow::ZERO);
        }
        Ok(())
    }

    #[test]
    fn test_sunny_day_saves() -> Result {
        let day = date(2024, 6, 1);
        let samples = sunny_day(day);
        let dataset = Dataset::from_samples(samples.clone())?;
        let simulator = Simulator::builder()
            .provider(&dataset)
            .battery(battery()?)
            .pricing(fixed_pricing())
            .build();

        let record = simulator.simulate_day(day, &samples, KilowattHours::ZERO);
        let costs = record.costs();
        assert!(costs.battery_savings(PricingMode::Fixed) > Cost::ZERO);
        assert_abs_diff_eq!(record.production().0, 16.0, epsilon = 1e-9);
        for interval in &record.intervals {
            assert_eq!(interval.baseline, Flow::from_net_demand(interval.net_demand));
            assert!(interval.state_of_charge >= 0.0 && interval.state_of_charge <= 100.0);
        }
        Ok(())
    }

    #[test]
    fn test_level_is_threaded_across_days() -> Result {
        let dataset = Dataset::from_samples(
            sunny_day(date(2024, 6, 1)).into_iter().chain(sunny_day(date(2024, 6, 2))),
        )?;
        let simulator = Simulator::builder()
            .provider(&dataset)
            .battery(battery()?)
            .pricing(fixed_pricing())
            .build();

        let result = simulator.run_year(2024)?;
        assert_eq!(result.days.len(), 2);
        let first_closing = result.days[0].closing_level().unwrap();
        let second = &result.days[1].intervals[0];
        let expected = dispatch(
            &simulator.battery,
            first_closing,
            second.production,
            second.consumption,
            fixed_prices(),
        );
        assert_eq!(second.dispatch, expected);
        Ok(())
    }

    #[test]
    fn test_missing_days_are_skipped() -> Result {
        let dataset = Dataset::from_samples(
            sunny_day(date(2023, 3, 1)).into_iter().chain(sunny_day(date(2023, 3, 5))),
        )?;
        let simulator = Simulator::builder()
            .provider(&dataset)
            .battery(battery()?)
            .pricing(fixed_pricing())
            .build();

        let result = simulator.run_year(2023)?;
        let dates: Vec<_> = result.days.iter().map(|day| day.date).collect();
        assert_eq!(dates, [date(2023, 3, 1), date(2023, 3, 5)]);
        assert!(result.day(date(2023, 3, 3)).is_none());
        assert!(result.day(date(2023, 3, 5)).is_some());
        Ok(())
    }

    #[test]
    fn test_partial_day_is_simulated() -> Result {
        let samples: Vec<_> = sunny_day(date(2024, 6, 1)).into_iter().take(50).collect();
        let dataset = Dataset::from_samples(samples)?;
        let simulator = Simulator::builder()
            .provider(&dataset)
            .battery(battery()?)
            .pricing(fixed_pricing())
            .build();

        let result = simulator.run_year(2024)?;
        assert_eq!(result.days.len(), 1);
        assert_eq!(result.days[0].intervals.len(), 50);
        Ok(())
    }

    #[test]
    fn test_deterministic() -> Result {
        let dataset = Dataset::from_samples(
            sunny_day(date(2024, 6, 1)).into_iter().chain(sunny_day(date(2024, 6, 2))),
        )?;
        let simulator = Simulator::builder()
            .provider(&dataset)
            .battery(battery()?)
            .pricing(fixed_pricing())
            .build();

        assert_eq!(simulator.run_year(2024)?.days, simulator.run_year(2024)?.days);
        Ok(())
    }

    #[test]
    fn test_missing_price_falls_back_to_fixed() -> Result {
        let day = date(2024, 6, 1);
        let samples = sunny_day(day);
        let market = PricePair { import: KilowattHourRate::from(0.50), export: KilowattHourRate::ZERO };
        let priced_at: NaiveDateTime = samples[0].timestamp;
        let dataset = Dataset::from_samples(samples.clone())?.with_prices([(priced_at, market)]);
        let pricing =
            Pricing { fixed: fixed_prices(), dynamic: DynamicPricing { is_enabled: true, since: None } };
        let simulator =
            Simulator::builder().provider(&dataset).battery(battery()?).pricing(pricing).build();

        let record = simulator.simulate_day(day, &samples, KilowattHours::ZERO);
        assert_eq!(record.intervals[0].prices.dynamic, market);
        assert_eq!(record.intervals[0].prices.fixed, fixed_prices());
        assert_eq!(record.intervals[95].prices.dynamic, fixed_prices());
        Ok(())
    }

    #[test]
    fn test_dynamic_pricing_not_yet_in_effect() -> Result {
        let day = date(2024, 6, 1);
        let samples = sunny_day(day);
        let market = PricePair { import: KilowattHourRate::from(0.50), export: KilowattHourRate::ZERO };
        let dataset =
            Dataset::from_samples(samples.clone())?.with_prices([(samples[0].timestamp, market)]);
        let pricing = Pricing {
            fixed: fixed_prices(),
            dynamic: DynamicPricing { is_enabled: true, since: Some(date(2024, 7, 1)) },
        };
        let simulator =
            Simulator::builder().provider(&dataset).battery(battery()?).pricing(pricing).build();

        let record = simulator.simulate_day(day, &samples, KilowattHours::ZERO);
        assert_eq!(record.intervals[0].prices.dynamic, fixed_prices());
        assert_eq!(record.costs().no_battery_dynamic, record.costs().no_battery_fixed);
        Ok(())
    }

    #[tokio::test]
    async fn test_simulate_years() -> Result {
        let dataset = Dataset::from_samples(
            sunny_day(date(2023, 6, 1)).into_iter().chain(sunny_day(date(2024, 6, 1))),
        )?;
        let results =
            simulate_years(Arc::new(dataset), battery()?, fixed_pricing(), [2023, 2024])
                .await?;
        assert_eq!(results.keys().copied().collect::<Vec<_>>(), [2023, 2024]);
        assert_eq!(results[&2023].days.len(), 1);
        assert_eq!(results[&2024].days[0].date, date(2024, 6, 1));

        // Each year starts with an empty battery:
        assert_eq!(
            results[&2023].days[0].intervals,
            results[&2024].days[0]
                .intervals
                .iter()
                .map(|interval| IntervalRecord {
                    timestamp: interval.timestamp - TimeDelta::days(366),
                    ..*interval
                })
                .collect::<Vec<_>>(),
        );
        Ok(())
    }
}
