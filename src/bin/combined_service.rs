use anyhow::Result;
use memecoin_dashboard::api::{ApiState, DashboardState, StoreState};
use memecoin_dashboard::services::{
    build_market_source, local_stores, ApiService, DashboardService, TelegramNotifier,
    VolumeMonitor,
};
use memecoin_dashboard::Config;
use std::sync::Arc;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("🔧 Starting combined service (store + dashboard + volume monitor)...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    // One set of file stores shared by every component in this process.
    let (tokens, alerts) = local_stores(&config);
    let source = build_market_source(&config)?;

    let dashboard = Arc::new(DashboardService::new(
        &config,
        Arc::clone(&tokens),
        Arc::clone(&alerts),
        Arc::clone(&source),
    ));

    let state = ApiState::default()
        .with_store(StoreState::new(Arc::clone(&tokens), Arc::clone(&alerts)))
        .with_dashboard(DashboardState::new(dashboard.session()));

    let monitor = config.volume_monitor.enabled.then(|| {
        VolumeMonitor::new(
            &config.volume_monitor,
            tokens,
            alerts,
            source,
            TelegramNotifier::new(config.telegram.clone()),
        )
    });

    let api_service = ApiService::new(config, state);

    let dashboard_handle = tokio::spawn(async move {
        if let Err(e) = dashboard.start().await {
            tracing::error!("Dashboard service error: {}", e);
        }
    });

    let api_handle = tokio::spawn(async move {
        if let Err(e) = api_service.start().await {
            tracing::error!("API service error: {}", e);
        }
    });

    let monitor_handle = tokio::spawn(async move {
        match monitor {
            Some(monitor) => monitor.start().await,
            None => info!("Volume monitor disabled"),
        }
    });

    tokio::try_join!(dashboard_handle, api_handle, monitor_handle)?;

    Ok(())
}
