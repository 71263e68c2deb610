use anyhow::Result;
use tracing::info;

mod anomalies {
    pub mod beaconing;
    pub mod cluster;
    pub mod query_length;
    pub mod record_flood;
    pub mod shadowing;
    pub mod tunneling;
    mod manager;
    pub use manager::*;
}
mod baseline;
mod config;
mod domains;
mod events;
mod fleet;
mod output;
mod pipeline;
mod report;
mod timeline;
mod utils;

use config::Config;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging()?;

    info!("Starting DNS event generator v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let pipeline = Pipeline::new(config);
    let summary = pipeline.run().await?;

    info!(
        "Dataset written to {} ({} events, {} anomalous)",
        summary.events_path.display(),
        summary.total_events,
        summary.anomalous_events()
    );
    Ok(())
}

fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // Create log directory if it doesn't exist
    std::fs::create_dir_all("logs")?;

    // File appender for logs
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("dns-synth")
        .filename_suffix("log")
        .build("logs")?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .json();

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(())
}
