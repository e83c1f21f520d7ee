use std::{iter::Sum, ops::Add};

use serde::Serialize;

use crate::{
    core::price::PricePair,
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Generic bidirectional energy flow.
#[must_use]
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::Sub,
)]
pub struct Flow<T> {
    /// Importing from the grid or charging the battery.
    pub import: T,

    /// Exporting to the grid or discharging the battery.
    pub export: T,
}

impl Flow<KilowattHours> {
    pub const ZERO: Self = Self { import: KilowattHours::ZERO, export: KilowattHours::ZERO };

    /// Split the net demand into a pure grid flow, as if there were no battery at all.
    ///
    /// Positive net demand is imported, negative is exported.
    pub fn from_net_demand(net_demand: KilowattHours) -> Self {
        Self {
            import: net_demand.max(KilowattHours::ZERO),
            export: (-net_demand).max(KilowattHours::ZERO),
        }
    }

    /// Net grid cost: what is paid for the import minus what is earned with the export.
    pub fn cost(self, prices: PricePair) -> Cost {
        self.import * prices.import - self.export * prices.export
    }
}

impl Default for Flow<KilowattHours> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<T> Sum for Flow<T>
where
    Self: Default + Add<Output = Self>,
{
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
