use std::{path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use clap::Parser;

use crate::{
    cli::{dataset::DatasetArgs, pricing::PricingArgs, write_json},
    core::{investment::Investments, roi::RoiCalculator},
    prelude::*,
    tables::{build_checkpoints_table, build_payback_table},
};

#[derive(Parser)]
pub struct RoiArgs {
    #[clap(flatten)]
    dataset: DatasetArgs,

    #[clap(flatten)]
    pricing: PricingArgs,

    /// TOML file with the solar panel and battery investments.
    #[clap(long = "investments", env = "INVESTMENTS_PATH", default_value = "investments.toml")]
    investments_path: PathBuf,

    /// First day of the analysis, by default the first day of the dataset.
    #[clap(long = "since", env = "ROI_SINCE")]
    since: Option<NaiveDate>,

    /// Last day of the analysis, by default the last day of the dataset.
    #[clap(long = "until", env = "ROI_UNTIL")]
    until: Option<NaiveDate>,

    /// Save the analysis as JSON.
    #[clap(long = "output", env = "OUTPUT_PATH")]
    output_path: Option<PathBuf>,
}

impl RoiArgs {
    pub async fn run(self) -> Result {
        let investments = Investments::read_toml(&self.investments_path)?;
        for investment in investments.iter() {
            info!(
                %investment,
                installed_on = %investment.installed_on(),
                cost = %investment.cost(),
                "loaded",
            );
        }

        let dataset = self.dataset.load()?;
        let (Some(start), Some(end)) =
            (self.since.or(dataset.first_date()), self.until.or(dataset.last_date()))
        else {
            bail!("the dataset is empty");
        };

        let analysis = RoiCalculator::builder()
            .provider(Arc::new(dataset))
            .investments(investments)
            .pricing(self.pricing.pricing())
            .start(start)
            .end(end)
            .calculate()
            .await?;

        println!("{}", build_checkpoints_table(&analysis));
        println!("{}", build_payback_table(&analysis));

        if let Some(output_path) = &self.output_path {
            write_json(output_path, &analysis)?;
        }
        Ok(())
    }
}
