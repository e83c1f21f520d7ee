use chrono::NaiveDate;
use clap::Parser;

use crate::{
    core::price::{DynamicPricing, PricePair, Pricing},
    quantity::rate::KilowattHourRate,
};

#[must_use]
#[derive(Copy, Clone, Parser)]
pub struct PricingArgs {
    /// Flat-rate import price per kilowatt-hour.
    #[clap(long = "fixed-import-price", env = "FIXED_IMPORT_PRICE")]
    fixed_import_price: KilowattHourRate,

    /// Flat-rate export price per kilowatt-hour.
    #[clap(long = "fixed-export-price", env = "FIXED_EXPORT_PRICE")]
    fixed_export_price: KilowattHourRate,

    /// Use the market prices from the price file.
    #[clap(long = "dynamic-pricing", env = "DYNAMIC_PRICING")]
    dynamic_pricing: bool,

    /// First day of the dynamic contract, by default it has always been in effect.
    #[clap(long = "dynamic-pricing-since", env = "DYNAMIC_PRICING_SINCE")]
    dynamic_pricing_since: Option<NaiveDate>,
}

impl PricingArgs {
    pub const fn pricing(self) -> Pricing {
        Pricing {
            fixed: PricePair { import: self.fixed_import_price, export: self.fixed_export_price },
            dynamic: DynamicPricing {
                is_enabled: self.dynamic_pricing,
                since: self.dynamic_pricing_since,
            },
        }
    }
}
