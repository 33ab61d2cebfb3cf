//! Binary entry point for viajero-rs.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use viajero_rs::cli::{Cli, execute};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    execute(cli).await?;
    Ok(())
}
