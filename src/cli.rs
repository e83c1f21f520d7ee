mod battery;
mod dataset;
mod pricing;
mod roi;
mod simulate;

use std::{fs::File, io::BufWriter, path::Path};

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::{
    cli::{roi::RoiArgs, simulate::SimulateArgs},
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Simulate the battery over entire years and print the cost summaries.
    #[clap(name = "simulate")]
    Simulate(Box<SimulateArgs>),

    /// Calculate cumulative savings and break-even of the solar panels and the battery.
    #[clap(name = "roi")]
    Roi(Box<RoiArgs>),
}

impl Command {
    pub async fn run(self) -> Result {
        match self {
            Self::Simulate(args) => args.run().await,
            Self::Roi(args) => args.run().await,
        }
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result {
    let file =
        File::create(path).with_context(|| format!("failed to create `{}`", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("failed to write `{}`", path.display()))?;
    info!(path = %path.display(), "saved");
    Ok(())
}
