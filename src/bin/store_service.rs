use anyhow::Result;
use memecoin_dashboard::api::{ApiState, StoreState};
use memecoin_dashboard::services::{local_stores, ApiService};
use memecoin_dashboard::Config;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("🔧 Starting standalone store service...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    let (tokens, alerts) = local_stores(&config);
    let state = ApiState::default().with_store(StoreState::new(tokens, alerts));

    let api_service = ApiService::new(config, state);
    api_service.start().await?;

    Ok(())
}
