mod cli;
mod config;
mod engine;
mod error;
mod models;
mod report;
mod snapshot;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting TrendLens - CI pass-rate trend comparison");
    cli.execute()?;

    Ok(())
}
