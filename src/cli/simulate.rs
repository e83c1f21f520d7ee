use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use crate::{
    cli::{battery::BatteryArgs, dataset::DatasetArgs, pricing::PricingArgs, write_json},
    core::{simulator::simulate_years, summary::PeriodSummary},
    prelude::*,
    tables::{build_annual_table, build_monthly_table},
};

#[derive(Parser)]
pub struct SimulateArgs {
    #[clap(flatten)]
    dataset: DatasetArgs,

    #[clap(flatten)]
    battery: BatteryArgs,

    #[clap(flatten)]
    pricing: PricingArgs,

    /// Years to simulate, by default every year in the dataset.
    #[clap(long = "years", env = "YEARS", value_delimiter = ',', num_args = 1..)]
    years: Vec<i32>,

    /// Save the complete simulation results as JSON.
    #[clap(long = "output", env = "OUTPUT_PATH")]
    output_path: Option<PathBuf>,
}

impl SimulateArgs {
    pub async fn run(self) -> Result {
        let battery = self.battery.try_into_config()?;
        info!(
            capacity = %battery.capacity(),
            usable = %battery.usable_capacity(),
            max_charge = %battery.max_charge_power(),
            max_discharge = %battery.max_discharge_power(),
            efficiency = battery.efficiency(),
            "battery",
        );
        let pricing = self.pricing.pricing();
        let dataset = self.dataset.load()?;
        let years = if self.years.is_empty() { dataset.years() } else { self.years };
        ensure!(!years.is_empty(), "the dataset is empty");

        let results = simulate_years(Arc::new(dataset), battery, pricing, years).await?;

        for result in results.values() {
            println!("{}", result.year);
            println!("{}", build_monthly_table(&PeriodSummary::monthly(&result.days), pricing));
        }
        println!("{}", build_annual_table(results.values()));

        if let Some(output_path) = &self.output_path {
            write_json(output_path, &results)?;
        }
        Ok(())
    }
}
