use crate::{
    api::{create_router, ApiState},
    config::Config,
};
use anyhow::Result;
use tracing::info;

pub struct ApiService {
    config: Config,
    state: ApiState,
}

impl ApiService {
    pub fn new(config: Config, state: ApiState) -> Self {
        Self { config, state }
    }

    pub async fn start(&self) -> Result<()> {
        info!(
            "🚀 Starting API service (store routes: {}, dashboard routes: {})",
            self.state.store.is_some(),
            self.state.dashboard.is_some()
        );

        let app = create_router(self.state.clone());
        let address = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = tokio::net::TcpListener::bind(&address).await?;

        info!("API Server starting on {}", address);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
