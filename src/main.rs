//! EvWatch - EV charging station availability monitor
//!
//! Entry point: loads configuration, initializes logging, and runs the
//! application until Ctrl-C.

use anyhow::Result;
use clap::Parser;
use evwatch::{
    app::{forward_shutdown_signal, App},
    cli::Cli,
    config::Config,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("EvWatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("HTTP Port: {}", config.server.port);
    info!("Public Dir: {}", config.server.public_dir.display());
    info!("Station URL: {}", config.station.url);
    info!("Station Timeout: {}s", config.station.timeout_seconds);
    info!("Poll Interval: {} minute(s)", config.poll.interval_minutes);
    info!(
        "Push Notifications: {}",
        if config.push.is_enabled() { "Enabled" } else { "Disabled" }
    );
    info!(
        "Metrics: {}",
        if config.metrics.enabled {
            format!("Enabled ({})", config.metrics.listen_address)
        } else {
            "Disabled".to_string()
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(forward_shutdown_signal(tokio::signal::ctrl_c(), shutdown_tx));

    app.run().await?;
    info!("All tasks shut down. Exiting.");
    Ok(())
}
