use anyhow::Result;
use memecoin_dashboard::api::{ApiState, DashboardState};
use memecoin_dashboard::services::{ApiService, DashboardService};
use memecoin_dashboard::Config;
use std::sync::Arc;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("🔧 Starting standalone dashboard service...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    let dashboard = Arc::new(DashboardService::from_config(&config)?);
    let state = ApiState::default().with_dashboard(DashboardState::new(dashboard.session()));
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

    tokio::try_join!(dashboard_handle, api_handle)?;

    Ok(())
}
