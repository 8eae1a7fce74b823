use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app;
mod cli;
mod config;
mod views;

#[cfg(test)]
mod test_utils;

use cli::Cli;
use config::Settings;

/// Main entry point for the GeoWeather dashboard.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    // RUST_LOG wins over the configured filter
    model::init_tracing(&settings.log_filter);
    info!("GeoWeather starting, dataset {}", settings.dataset);
    debug!("Data directory: {}", settings.data_dir.display());

    cli.run(settings).await
}
