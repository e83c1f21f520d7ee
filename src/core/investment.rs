use std::{
    fmt::{Display, Formatter},
    fs,
    path::Path,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    core::battery::BatteryConfig,
    prelude::*,
    quantity::{cost::Cost, power::Kilowatts},
};

#[must_use]
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolarInvestment {
    pub installed_on: NaiveDate,
    pub cost: Cost,

    #[serde(rename = "peak_power_kw")]
    pub peak_power: Kilowatts,
}

#[must_use]
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatteryInvestment {
    pub installed_on: NaiveDate,
    pub cost: Cost,
    pub config: BatteryConfig,
}

#[must_use]
#[derive(Copy, Clone, Debug)]
pub enum Investment {
    Solar(SolarInvestment),
    Battery(BatteryInvestment),
}

impl Investment {
    pub const fn installed_on(self) -> NaiveDate {
        match self {
            Self::Solar(solar) => solar.installed_on,
            Self::Battery(battery) => battery.installed_on,
        }
    }

    pub const fn cost(self) -> Cost {
        match self {
            Self::Solar(solar) => solar.cost,
            Self::Battery(battery) => battery.cost,
        }
    }
}

impl Display for Investment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solar(solar) => write!(f, "Solar panels ({})", solar.peak_power),
            Self::Battery(battery) => write!(f, "Battery ({})", battery.config.capacity()),
        }
    }
}

/// Investments file.
///
/// ```toml
/// [solar]
/// installed_on = "2023-03-01"
/// cost = 6500.0
/// peak_power_kw = 4.8
///
/// [battery]
/// installed_on = "2024-01-15"
/// cost = 4200.0
/// config = { capacity_kwh = 10.0, max_charge_kw = 5.0, max_discharge_kw = 5.0 }
/// ```
#[must_use]
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Investments {
    pub solar: Option<SolarInvestment>,
    pub battery: Option<BatteryInvestment>,
}

impl Investments {
    pub fn read_toml(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let investments: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse `{}`", path.display()))?;
        investments.validated()
    }

    fn validated(self) -> Result<Self> {
        ensure!(self.solar.is_some() || self.battery.is_some(), "no investments configured");
        for investment in self.iter() {
            ensure!(
                investment.cost().is_finite() && investment.cost() >= Cost::ZERO,
                "{investment} has invalid cost: {}",
                investment.cost(),
            );
        }
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = Investment> {
        self.solar
            .map(Investment::Solar)
            .into_iter()
            .chain(self.battery.map(Investment::Battery))
    }
}
