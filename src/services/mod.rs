pub mod api_service;
pub mod dashboard_service;
pub mod market_data;
pub mod notifier;
pub mod store_client;
pub mod volume_monitor;

pub use api_service::ApiService;
pub use dashboard_service::DashboardService;
pub use market_data::{DexScreenerClient, MarketDataSource};
pub use notifier::TelegramNotifier;
pub use store_client::HttpStoreClient;
pub use volume_monitor::VolumeMonitor;

use crate::config::Config;
use crate::error::DashboardResult;
use crate::storage::{AlertFileStore, AlertStore, TokenConfigFile, TokenListStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Remote stores when `DASHBOARD_URL` is set, the local JSON files otherwise.
pub fn build_stores(
    config: &Config,
) -> DashboardResult<(Arc<dyn TokenListStore>, Arc<dyn AlertStore>)> {
    match &config.dashboard.store_url {
        Some(url) => {
            info!("🌐 Using remote store at {}", url);
            let client = Arc::new(HttpStoreClient::new(
                url,
                Duration::from_secs(config.market.request_timeout_secs),
            )?);
            let tokens: Arc<dyn TokenListStore> = client.clone();
            let alerts: Arc<dyn AlertStore> = client;
            Ok((tokens, alerts))
        }
        None => Ok(local_stores(config)),
    }
}

pub fn local_stores(config: &Config) -> (Arc<dyn TokenListStore>, Arc<dyn AlertStore>) {
    info!(
        "📁 Using local stores: {} / {}",
        config.storage.token_config_path.display(),
        config.storage.alerts_path.display()
    );
    let tokens: Arc<dyn TokenListStore> =
        Arc::new(TokenConfigFile::new(config.storage.token_config_path.clone()));
    let alerts: Arc<dyn AlertStore> =
        Arc::new(AlertFileStore::new(config.storage.alerts_path.clone()));
    (tokens, alerts)
}

pub fn build_market_source(config: &Config) -> DashboardResult<Arc<dyn MarketDataSource>> {
    Ok(Arc::new(DexScreenerClient::new(
        &config.market.api_url,
        Duration::from_secs(config.market.request_timeout_secs),
    )?))
}
