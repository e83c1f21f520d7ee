use bon::Builder;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

const DEFAULT_EFFICIENCY: f64 = 0.95;

/// Fraction of the nameplate capacity available to the dispatch.
///
/// The rest is the depth-of-discharge reserve.
const USABLE_FRACTION: f64 = 0.9;

/// Immutable home battery description.
///
/// Only constructible through [`BatteryConfig::builder`] and its validating `try_build()`.
#[must_use]
#[derive(Copy, Clone, Debug, Builder, Serialize, Deserialize)]
#[builder(finish_fn(name = build_unchecked, vis = ""))]
#[serde(try_from = "BatteryParameters", into = "BatteryParameters")]
pub struct BatteryConfig {
    /// Nameplate capacity.
    capacity: KilowattHours,

    max_charge_power: Kilowatts,
    max_discharge_power: Kilowatts,

    /// Round-trip efficiency, applied once on the way in and once on the way out.
    #[builder(default = DEFAULT_EFFICIENCY)]
    efficiency: f64,
}

impl<S: battery_config_builder::IsComplete> BatteryConfigBuilder<S> {
    pub fn try_build(self) -> Result<BatteryConfig> {
        self.build_unchecked().validated()
    }
}

impl BatteryConfig {
    fn validated(self) -> Result<Self> {
        ensure!(
            self.capacity.is_finite() && self.capacity > KilowattHours::ZERO,
            "battery capacity must be positive, got {}",
            self.capacity,
        );
        ensure!(
            self.max_charge_power.is_finite() && self.max_charge_power > Kilowatts::ZERO,
            "maximum charging power must be positive, got {}",
            self.max_charge_power,
        );
        ensure!(
            self.max_discharge_power.is_finite() && self.max_discharge_power > Kilowatts::ZERO,
            "maximum discharging power must be positive, got {}",
            self.max_discharge_power,
        );
        ensure!(
            self.efficiency > 0.0 && self.efficiency <= 1.0,
            "round-trip efficiency must be within (0, 1], got {}",
            self.efficiency,
        );
        Ok(self)
    }

    pub const fn capacity(&self) -> KilowattHours {
        self.capacity
    }

    pub const fn max_charge_power(&self) -> Kilowatts {
        self.max_charge_power
    }

    pub const fn max_discharge_power(&self) -> Kilowatts {
        self.max_discharge_power
    }

    #[must_use]
    pub const fn efficiency(&self) -> f64 {
        self.efficiency
    }

    /// Capacity available to the dispatch.
    pub fn usable_capacity(&self) -> KilowattHours {
        self.capacity * USABLE_FRACTION
    }

    /// Maximum energy the battery may take in within the time step.
    pub fn max_charge_energy(&self, for_: TimeDelta) -> KilowattHours {
        self.max_charge_power * for_
    }

    /// Maximum energy the battery may give out within the time step.
    pub fn max_discharge_energy(&self, for_: TimeDelta) -> KilowattHours {
        self.max_discharge_power * for_
    }

    /// Battery level as percentage of the usable capacity.
    #[must_use]
    pub fn state_of_charge(&self, level: KilowattHours) -> f64 {
        100.0 * (level / self.usable_capacity())
    }
}

/// Plain serialized form of [`BatteryConfig`].
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatteryParameters {
    capacity_kwh: KilowattHours,
    max_charge_kw: Kilowatts,
    max_discharge_kw: Kilowatts,

    #[serde(default = "default_efficiency")]
    efficiency: f64,
}

const fn default_efficiency() -> f64 {
    DEFAULT_EFFICIENCY
}

impl TryFrom<BatteryParameters> for BatteryConfig {
    type Error = Error;

    fn try_from(parameters: BatteryParameters) -> Result<Self> {
        Self::builder()
            .capacity(parameters.capacity_kwh)
            .max_charge_power(parameters.max_charge_kw)
            .max_discharge_power(parameters.max_discharge_kw)
            .efficiency(parameters.efficiency)
            .try_build()
    }
}

impl From<BatteryConfig> for BatteryParameters {
    fn from(config: BatteryConfig) -> Self {
        Self {
            capacity_kwh: config.capacity,
            max_charge_kw: config.max_charge_power,
            max_discharge_kw: config.max_discharge_power,
            efficiency: config.efficiency,
        }
    }
}
