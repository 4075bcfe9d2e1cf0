// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! Costwatch admin - one-shot administrative tasks against the rating
//! backend.
//!
//! # Examples
//!
//! ```bash
//! # Ensure the default hashmap pricing exists (credentials from the
//! # environment, as for the server)
//! costwatch-admin ensure-default-pricing
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use costwatch_client::{Credentials, PricingConfigurator};

/// Costwatch admin - administrative tasks for the rating backend.
#[derive(Parser)]
#[command(name = "costwatch-admin")]
#[command(about = "Administrative tasks for the Costwatch rating backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output (show debug info).
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Ensure the default hashmap pricing exists on the rating service.
    EnsureDefaultPricing,
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("costwatch=debug,info")
    } else {
        EnvFilter::new("costwatch=info,warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Command::EnsureDefaultPricing => {
            let credentials =
                Credentials::from_env().context("credential configuration is incomplete")?;
            let configurator = PricingConfigurator::new(credentials)
                .context("failed to build pricing configurator")?;
            let summary = configurator
                .ensure_defaults()
                .await
                .context("failed to ensure default pricing")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
