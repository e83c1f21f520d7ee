use chrono::TimeDelta;
use serde::Serialize;

use crate::{
    core::{battery::BatteryConfig, flow::Flow, price::PricePair},
    quantity::energy::KilowattHours,
};

/// Simulation resolution.
pub const STEP: TimeDelta = TimeDelta::minutes(15);

/// Discharge only when the export price is below this fraction of the import price.
const DISCHARGE_THRESHOLD: f64 = 0.9;

/// Charge only when the import price exceeds the export price by this factor.
const CHARGE_THRESHOLD: f64 = 1.1;

/// Outcome of a single quarter-hour.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dispatch {
    /// Battery flow: import is the charge, export is the discharge.
    pub battery: Flow<KilowattHours>,

    pub grid: Flow<KilowattHours>,

    /// Battery level at the end of the interval.
    pub level_after: KilowattHours,
}

/// Decide how the battery handles the interval's net demand.
///
/// Greedy and myopic: only the current level and the interval's own prices are taken into account.
/// The discharge condition deliberately compares the export price (and not the price at which
/// the stored energy was bought) with the import price.
pub fn dispatch(
    battery: &BatteryConfig,
    level: KilowattHours,
    production: KilowattHours,
    consumption: KilowattHours,
    prices: PricePair,
) -> Dispatch {
    let usable_capacity = battery.usable_capacity();
    let net_demand = consumption - production;

    let (battery_flow, grid_flow) = if net_demand > KilowattHours::ZERO {
        let can_discharge =
            level.min(battery.max_discharge_energy(STEP)).min(net_demand).max(KilowattHours::ZERO);
        if can_discharge > KilowattHours::ZERO
            && prices.export < prices.import * DISCHARGE_THRESHOLD
        {
            // Efficiency loss is charged on the way out:
            (
                Flow { import: KilowattHours::ZERO, export: can_discharge / battery.efficiency() },
                Flow { import: net_demand - can_discharge, export: KilowattHours::ZERO },
            )
        } else {
            (Flow::ZERO, Flow { import: net_demand, export: KilowattHours::ZERO })
        }
    } else {
        let surplus = production - consumption;
        let can_store = (usable_capacity - level)
            .min(battery.max_charge_energy(STEP))
            .min(surplus)
            .max(KilowattHours::ZERO);
        if can_store > KilowattHours::ZERO && prices.import > prices.export * CHARGE_THRESHOLD {
            // Efficiency loss is charged on the way in:
            (
                Flow { import: can_store * battery.efficiency(), export: KilowattHours::ZERO },
                Flow { import: KilowattHours::ZERO, export: surplus - can_store },
            )
        } else {
            (Flow::ZERO, Flow { import: KilowattHours::ZERO, export: surplus })
        }
    };

    Dispatch {
        battery: battery_flow,
        grid: grid_flow,
        level_after: (level - battery_flow.export + battery_flow.import)
            .clamp(KilowattHours::ZERO, usable_capacity),
    }
}
