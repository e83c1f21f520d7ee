//! Battery-related CLI arguments.

use clap::Parser;

use crate::{
    core::battery::BatteryConfig,
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct BatteryArgs {
    /// Nameplate battery capacity in kilowatt-hours.
    #[clap(long = "battery-capacity-kwh", env = "BATTERY_CAPACITY_KWH")]
    capacity: KilowattHours,

    /// Maximum charging power in kilowatts.
    #[clap(long = "battery-max-charge-kw", env = "BATTERY_MAX_CHARGE_KW")]
    max_charge_power: Kilowatts,

    /// Maximum discharging power in kilowatts.
    #[clap(long = "battery-max-discharge-kw", env = "BATTERY_MAX_DISCHARGE_KW")]
    max_discharge_power: Kilowatts,

    /// Round-trip efficiency.
    #[clap(long = "battery-efficiency", default_value = "0.95", env = "BATTERY_EFFICIENCY")]
    efficiency: f64,
}

impl BatteryArgs {
    pub fn try_into_config(self) -> Result<BatteryConfig> {
        BatteryConfig::builder()
            .capacity(self.capacity)
            .max_charge_power(self.max_charge_power)
            .max_discharge_power(self.max_discharge_power)
            .efficiency(self.efficiency)
            .try_build()
    }
}
