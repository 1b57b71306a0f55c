//! OSRM Pipeline - route tables and TSP sequencing on top of OSRM

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osrm_pipeline::cli::{self, Cli};
use osrm_pipeline::config::Config;
use osrm_pipeline::services::osrm::{create_transport, OsrmTransport};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (also reads .env, so LOGS_DIR may come from there)
    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.logs_dir, "osrm-pipeline.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,osrm_pipeline=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    info!("OSRM at {}", config.base_url());

    let transport = create_transport(&config)?;
    info!("Using {} transport", transport.name());

    if let Err(e) = cli::run(cli, &config, transport).await {
        error!("Command failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}
