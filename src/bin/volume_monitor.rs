use anyhow::Result;
use memecoin_dashboard::services::{
    build_market_source, build_stores, TelegramNotifier, VolumeMonitor,
};
use memecoin_dashboard::Config;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("🔧 Starting standalone volume monitor...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    let (tokens, alerts) = build_stores(&config)?;
    let source = build_market_source(&config)?;
    let notifier = TelegramNotifier::new(config.telegram.clone());

    let monitor = VolumeMonitor::new(&config.volume_monitor, tokens, alerts, source, notifier);
    monitor.start().await;

    Ok(())
}
