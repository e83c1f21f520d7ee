use std::path::PathBuf;

use clap::Parser;

use crate::{dataset::Dataset, prelude::*};

#[derive(Parser)]
pub struct DatasetArgs {
    /// JSON file with the quarter-hour production and consumption.
    #[clap(long = "intervals", env = "INTERVALS_PATH")]
    intervals_path: PathBuf,

    /// JSON file with the quarter-hour market prices.
    #[clap(long = "prices", env = "PRICES_PATH")]
    prices_path: Option<PathBuf>,
}

impl DatasetArgs {
    pub fn load(&self) -> Result<Dataset> {
        Dataset::read_json(&self.intervals_path, self.prices_path.as_deref())
    }
}
