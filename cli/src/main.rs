//! Gantry dev server - binary entry point.
//!
//! Wires the demo application together and serves it: load config, set up
//! tracing, assemble controllers, open the socket. Everything interesting
//! lives in the library crates; this binary is deliberately thin.

mod demo;

use anyhow::{Context as _, Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing(config_filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = gantry_config::load()
        .map_err(|error| anyhow!("{error}"))?
        .unwrap_or_default();
    init_tracing(config.log_filter());

    let app = demo::application(&config).context("failed to assemble the demo application")?;
    let addr = config.bind_addr();
    tracing::info!(%addr, "starting gantry dev server");
    app.serve(&addr).await.context("server exited with an error")?;
    Ok(())
}
