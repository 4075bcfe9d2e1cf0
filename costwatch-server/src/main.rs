// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Costwatch server - project cloud-cost API and dashboard.
//!
//! # Examples
//!
//! ```bash
//! # Serve on the default port with credentials from the environment
//! costwatch
//!
//! # Custom port, verbose logging
//! costwatch --port 9000 --verbose
//!
//! # Assets directory holding templates/ and static/
//! costwatch --assets /srv/costwatch
//! ```

mod error;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use costwatch_client::{CostEngine, Credentials};
use routes::AppState;

// ============================================================================
// CLI Definition
// ============================================================================

/// Costwatch server - project cloud-cost API and dashboard.
#[derive(Parser)]
#[command(name = "costwatch")]
#[command(about = "Project cloud-cost API and dashboard")]
#[command(version)]
pub struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen on.
    #[arg(long, short, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory holding templates/ and static/.
    #[arg(long, default_value = ".")]
    pub assets: PathBuf,

    /// Verbose output (show debug info).
    #[arg(long, short)]
    pub verbose: bool,
}

// ============================================================================
// Logging Setup
// ============================================================================

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

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let credentials =
        Credentials::from_env().context("credential configuration is incomplete")?;
    let engine = CostEngine::new(credentials).context("failed to build cost engine")?;
    let state = Arc::new(AppState { engine });

    let index = ServeFile::new(cli.assets.join("templates/index.html"));
    let static_dir = ServeDir::new(cli.assets.join("static"));

    let app = routes::api_router(state)
        .route_service("/", index)
        .nest_service("/static", static_dir)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cli.bind, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Serving on http://{addr}");
    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
