use super::{build_market_source, build_stores, MarketDataSource};
use crate::config::Config;
use crate::engine::{DashboardSession, PollCycleController};
use crate::storage::{AlertStore, TokenListStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Owns the dashboard session and drives its poll timer.
pub struct DashboardService {
    session: Arc<DashboardSession>,
    poller: Arc<PollCycleController>,
}

impl DashboardService {
    pub fn new(
        config: &Config,
        tokens: Arc<dyn TokenListStore>,
        alerts: Arc<dyn AlertStore>,
        source: Arc<dyn MarketDataSource>,
    ) -> Self {
        let session = Arc::new(DashboardSession::new(
            config.dashboard.features,
            config.dashboard.history_retention,
            tokens,
            alerts,
        ));
        let poller = Arc::new(PollCycleController::new(
            Arc::clone(&session),
            source,
            config.dashboard.poll_interval(),
        ));

        Self { session, poller }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (tokens, alerts) = build_stores(config)?;
        let source = build_market_source(config)?;
        Ok(Self::new(config, tokens, alerts, source))
    }

    pub fn session(&self) -> Arc<DashboardSession> {
        Arc::clone(&self.session)
    }

    pub async fn start(&self) -> Result<()> {
        info!("📊 Starting dashboard service...");

        self.session.load().await;
        info!(
            "Loaded {} tracked token(s), {} pending alert(s)",
            self.session.tokens().await.len(),
            self.session.alerts().await.len()
        );

        Arc::clone(&self.poller).start().await;
        Ok(())
    }
}
