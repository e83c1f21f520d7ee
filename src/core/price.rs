use std::fmt::{Display, Formatter};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{core::provider::PriceProvider, quantity::rate::KilowattHourRate};

/// Grid import and export prices in effect for an interval.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePair {
    pub import: KilowattHourRate,
    pub export: KilowattHourRate,
}

impl PricePair {
    /// Arithmetic mean of the pairs, [`None`] when there are none.
    pub fn average(pairs: &[Self]) -> Option<Self> {
        if pairs.is_empty() {
            return None;
        }
        #[expect(clippy::cast_precision_loss)]
        let n_pairs = pairs.len() as f64;
        Some(Self {
            import: pairs.iter().map(|pair| pair.import).sum::<KilowattHourRate>() / n_pairs,
            export: pairs.iter().map(|pair| pair.export).sum::<KilowattHourRate>() / n_pairs,
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum PricingMode {
    /// Flat rate, the same for every interval.
    Fixed,

    /// Per-interval market price.
    Dynamic,
}

impl Display for PricingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "Fixed"),
            Self::Dynamic => write!(f, "Dynamic"),
        }
    }
}

/// Dynamic pricing contract switch.
#[must_use]
#[derive(Copy, Clone, Debug, Default, Serialize)]
pub struct DynamicPricing {
    pub is_enabled: bool,

    /// First day of the dynamic contract, [`None`] means it has always been in effect.
    pub since: Option<NaiveDate>,
}

impl DynamicPricing {
    pub const DISABLED: Self = Self { is_enabled: false, since: None };

    pub fn mode_on(self, date: NaiveDate) -> PricingMode {
        if self.is_enabled && self.since.is_none_or(|since| since <= date) {
            PricingMode::Dynamic
        } else {
            PricingMode::Fixed
        }
    }
}

/// Complete pricing setup of a simulation run.
#[must_use]
#[derive(Copy, Clone, Debug, Serialize)]
pub struct Pricing {
    pub fixed: PricePair,
    pub dynamic: DynamicPricing,
}

impl Pricing {
    /// Resolve the prices the household pays at the timestamp.
    ///
    /// Missing market prices fall back onto the fixed pair, never onto zero.
    pub fn resolve<P: PriceProvider + ?Sized>(
        self,
        provider: &P,
        mode: PricingMode,
        timestamp: NaiveDateTime,
    ) -> PricePair {
        match mode {
            PricingMode::Fixed => self.fixed,
            PricingMode::Dynamic => provider.get_price(timestamp).unwrap_or(self.fixed),
        }
    }
}
