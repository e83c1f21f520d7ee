//! In-memory time series loaded from JSON files.

use std::{collections::BTreeMap, fs, path::Path};

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::Deserialize;

use crate::{
    core::{
        price::PricePair,
        provider::{IntervalProvider, IntervalSample, MAX_INTERVALS_PER_DAY, PriceProvider},
    },
    prelude::*,
    quantity::{energy::KilowattHours, rate::KilowattHourRate},
};

#[derive(Default)]
pub struct Dataset {
    intervals: BTreeMap<NaiveDate, Vec<IntervalSample>>,

    /// [`None`] marks a published record without a usable price.
    prices: BTreeMap<NaiveDateTime, Option<PricePair>>,
}

impl Dataset {
    /// Group the samples by date, ordering each day chronologically.
    pub fn from_samples(samples: impl IntoIterator<Item = IntervalSample>) -> Result<Self> {
        let mut intervals: BTreeMap<NaiveDate, Vec<IntervalSample>> = BTreeMap::new();
        for sample in samples {
            ensure!(
                sample.production.is_finite() && sample.consumption.is_finite(),
                "non-finite energy at {}",
                sample.timestamp,
            );
            intervals.entry(sample.timestamp.date()).or_default().push(sample);
        }
        for samples in intervals.values_mut() {
            samples.sort_by_key(|sample| sample.timestamp);
        }
        Ok(Self { intervals, prices: BTreeMap::new() })
    }

    #[must_use]
    pub fn with_prices(
        mut self,
        prices: impl IntoIterator<Item = (NaiveDateTime, PricePair)>,
    ) -> Self {
        self.prices
            .extend(prices.into_iter().map(|(timestamp, prices)| (timestamp, Some(prices))));
        self
    }

    /// Unusable records stay in place, so that they are not covered by an earlier price.
    fn with_price_records(mut self, records: &[PriceRecord]) -> Self {
        self.prices.extend(records.iter().map(|record| (record.timestamp, record.resolve())));
        self
    }

    /// Read the intervals file and the optional prices file.
    #[instrument(skip_all)]
    pub fn read_json(intervals_path: &Path, prices_path: Option<&Path>) -> Result<Self> {
        let samples: Vec<IntervalSample> = read_json(intervals_path)?;
        let n_samples = samples.len();
        let mut dataset = Self::from_samples(samples)?;

        if let Some(prices_path) = prices_path {
            let records: Vec<PriceRecord> = read_json(prices_path)?;
            let n_records = records.len();
            dataset = dataset.with_price_records(&records);
            let n_complete = dataset.prices.values().flatten().count();
            if n_complete < n_records {
                warn!(n_records, n_complete, "some price records are incomplete or duplicate");
            }
        }

        info!(
            n_samples,
            n_days = dataset.intervals.len(),
            n_prices = dataset.prices.values().flatten().count(),
            "loaded the dataset",
        );
        Ok(dataset)
    }

    /// Calendar years present in the intervals, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.intervals.keys().map(Datelike::year).collect();
        years.dedup();
        years
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.intervals.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.intervals.keys().next_back().copied()
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse `{}`", path.display()))
}

impl IntervalProvider for Dataset {
    fn get_daily_intervals(&self, date: NaiveDate) -> Result<Vec<IntervalSample>> {
        let Some(samples) = self.intervals.get(&date) else {
            return Ok(Vec::new());
        };
        ensure!(
            samples.len() <= MAX_INTERVALS_PER_DAY,
            "{date} has {} samples, expected at most {MAX_INTERVALS_PER_DAY}",
            samples.len(),
        );
        if let Some(sample) = samples.iter().find(|sample| {
            sample.production < KilowattHours::ZERO || sample.consumption < KilowattHours::ZERO
        }) {
            bail!("negative energy at {}", sample.timestamp);
        }
        if let Some(pair) = samples.windows(2).find(|pair| pair[0].timestamp == pair[1].timestamp) {
            bail!("duplicate samples at {}", pair[0].timestamp);
        }
        Ok(samples.clone())
    }
}

impl PriceProvider for Dataset {
    /// Exact quarter-hour price.
    ///
    /// An hourly price covers the entire hour, but only when nothing else
    /// has been published within that hour.
    fn get_price(&self, timestamp: NaiveDateTime) -> Option<PricePair> {
        if let Some(prices) = self.prices.get(&timestamp) {
            return *prices;
        }
        let hour_start = timestamp.with_minute(0)?.with_second(0)?.with_nanosecond(0)?;
        let mut hour = self.prices.range(hour_start..hour_start + TimeDelta::hours(1));
        match (hour.next(), hour.next()) {
            (Some((published_at, prices)), None) if *published_at == hour_start => *prices,
            _ => None,
        }
    }
}

/// Raw price record, every price is optional.
#[derive(Deserialize)]
struct PriceRecord {
    timestamp: NaiveDateTime,
    import: Option<KilowattHourRate>,
    export: Option<KilowattHourRate>,

    /// Used when the primary export price is unavailable.
    #[serde(default)]
    export_fallback: Option<KilowattHourRate>,
}

impl PriceRecord {
    /// Resolve the pair, [`None`] when either side is not known.
    fn resolve(&self) -> Option<PricePair> {
        let import = self.import.filter(|price| price.is_finite())?;
        let export = [self.export, self.export_fallback]
            .into_iter()
            .flatten()
            .find(|price| price.is_finite())?;
        Some(PricePair { import, export })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(hour, minute, 0).unwrap()
    }

    fn sample(timestamp: NaiveDateTime, production: f64, consumption: f64) -> IntervalSample {
        IntervalSample {
            timestamp,
            production: KilowattHours::from(production),
            consumption: KilowattHours::from(consumption),
        }
    }

    fn prices(import: f64, export: f64) -> PricePair {
        PricePair { import: KilowattHourRate::from(import), export: KilowattHourRate::from(export) }
    }

    #[test]
    fn test_samples_are_sorted() -> Result {
        let dataset = Dataset::from_samples([
            sample(timestamp(10, 15), 1.0, 0.0),
            sample(timestamp(10, 0), 2.0, 0.0),
        ])?;
        let samples = dataset.get_daily_intervals(timestamp(0, 0).date())?;
        assert_eq!(samples[0].timestamp, timestamp(10, 0));
        assert_eq!(samples[1].timestamp, timestamp(10, 15));
        Ok(())
    }

    #[test]
    fn test_missing_day_is_empty() -> Result {
        let dataset = Dataset::default();
        assert!(dataset.get_daily_intervals(timestamp(0, 0).date())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_negative_energy_is_malformed() -> Result {
        let dataset = Dataset::from_samples([sample(timestamp(10, 0), -1.0, 0.0)])?;
        assert!(dataset.get_daily_intervals(timestamp(0, 0).date()).is_err());
        Ok(())
    }

    #[test]
    fn test_rejects_non_finite_energy() {
        assert!(Dataset::from_samples([sample(timestamp(10, 0), f64::NAN, 0.0)]).is_err());
    }

    #[test]
    fn test_years() -> Result {
        let dataset = Dataset::from_samples([
            sample(timestamp(10, 0), 1.0, 0.0),
            sample(timestamp(10, 0) + chrono::TimeDelta::days(365), 1.0, 0.0),
            sample(timestamp(10, 0) + chrono::TimeDelta::days(366), 1.0, 0.0),
        ])?;
        assert_eq!(dataset.years(), [2024, 2025]);
        Ok(())
    }

    #[test]
    fn test_duplicate_samples_are_malformed() -> Result {
        let dataset = Dataset::from_samples([
            sample(timestamp(10, 0), 1.0, 0.0),
            sample(timestamp(10, 15), 1.0, 0.0),
            sample(timestamp(10, 0), 1.0, 0.0),
        ])?;
        assert!(dataset.get_daily_intervals(timestamp(0, 0).date()).is_err());
        Ok(())
    }

    #[test]
    fn test_hourly_price_covers_the_hour() {
        let dataset = Dataset::default().with_prices([
            (timestamp(10, 0), prices(0.30, 0.05)),
            (timestamp(11, 0), prices(0.40, 0.10)),
        ]);
        assert_eq!(dataset.get_price(timestamp(10, 0)), Some(prices(0.30, 0.05)));
        assert_eq!(dataset.get_price(timestamp(10, 45)), Some(prices(0.30, 0.05)));
        assert_eq!(dataset.get_price(timestamp(11, 15)), Some(prices(0.40, 0.10)));
        assert_eq!(dataset.get_price(timestamp(9, 45)), None);
        assert_eq!(dataset.get_price(timestamp(12, 0)), None);
    }

    #[test]
    fn test_quarter_hour_prices_are_exact() {
        let dataset = Dataset::default().with_prices([
            (timestamp(10, 0), prices(0.30, 0.05)),
            (timestamp(10, 30), prices(0.40, 0.10)),
        ]);
        assert_eq!(dataset.get_price(timestamp(10, 0)), Some(prices(0.30, 0.05)));
        assert_eq!(dataset.get_price(timestamp(10, 15)), None);
        assert_eq!(dataset.get_price(timestamp(10, 30)), Some(prices(0.40, 0.10)));
        assert_eq!(dataset.get_price(timestamp(10, 45)), None);
    }

    #[test]
    fn test_dropped_price_record_is_not_inherited() -> Result {
        let records: Vec<PriceRecord> = serde_json::from_str(
            r#"[
                {"timestamp": "2024-03-01T10:00:00", "import": 0.9, "export": 0.01},
                {"timestamp": "2024-03-01T10:15:00", "import": null, "export": 0.01}
            ]"#,
        )?;
        let dataset = Dataset::default().with_price_records(&records);
        assert_eq!(dataset.get_price(timestamp(10, 0)), Some(prices(0.9, 0.01)));
        assert_eq!(dataset.get_price(timestamp(10, 15)), None);
        assert_eq!(dataset.get_price(timestamp(10, 30)), None);
        Ok(())
    }

    #[test]
    fn test_price_record_fallback() -> Result {
        let records: Vec<PriceRecord> = serde_json::from_str(
            r#"[
                {"timestamp": "2024-03-01T10:00:00", "import": 0.3, "export": 0.05},
                {"timestamp": "2024-03-01T10:15:00", "import": 0.3, "export": null, "export_fallback": 0.04},
                {"timestamp": "2024-03-01T10:30:00", "import": 0.3, "export": null},
                {"timestamp": "2024-03-01T10:45:00", "import": null, "export": 0.05}
            ]"#,
        )?;
        assert_eq!(records[0].resolve(), Some(prices(0.3, 0.05)));
        assert_eq!(records[1].resolve(), Some(prices(0.3, 0.04)));
        assert_eq!(records[2].resolve(), None);
        assert_eq!(records[3].resolve(), None);
        Ok(())
    }

    #[test]
    fn test_zero_price_is_a_price() -> Result {
        let records: Vec<PriceRecord> = serde_json::from_str(
            r#"[{"timestamp": "2024-03-01T10:00:00", "import": 0.0, "export": 0.0}]"#,
        )?;
        assert_eq!(records[0].resolve(), Some(prices(0.0, 0.0)));
        Ok(())
    }
}
