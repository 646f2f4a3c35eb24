pub mod handlers;
pub mod routes;
pub mod websocket;

pub use routes::{create_router, dashboard_routes, store_routes};

use crate::engine::DashboardSession;
use crate::storage::{AlertStore, TokenListStore};
use std::sync::Arc;

/// Backing stores for the persistence endpoints.
#[derive(Clone)]
pub struct StoreState {
    pub tokens: Arc<dyn TokenListStore>,
    pub alerts: Arc<dyn AlertStore>,
}

impl StoreState {
    pub fn new(tokens: Arc<dyn TokenListStore>, alerts: Arc<dyn AlertStore>) -> Self {
        Self { tokens, alerts }
    }
}

#[derive(Clone)]
pub struct DashboardState {
    pub session: Arc<DashboardSession>,
}

impl DashboardState {
    pub fn new(session: Arc<DashboardSession>) -> Self {
        Self { session }
    }
}

/// Which surfaces one server process exposes.
#[derive(Clone, Default)]
pub struct ApiState {
    pub store: Option<StoreState>,
    pub dashboard: Option<DashboardState>,
}

impl ApiState {
    pub fn with_store(mut self, store: StoreState) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_dashboard(mut self, dashboard: DashboardState) -> Self {
        self.dashboard = Some(dashboard);
        self
    }
}
