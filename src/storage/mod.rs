//! Persistence seams for the token list and the alert/history log.
//!
//! The engine only sees the traits. `TokenConfigFile` and `AlertFileStore`
//! are the server-side JSON documents; `services::store_client` provides
//! the HTTP client implementations of the same traits.

pub mod alert_file;
pub mod json_file;
pub mod token_file;

pub use alert_file::AlertFileStore;
pub use token_file::TokenConfigFile;

use crate::error::DashboardResult;
use crate::types::{Alert, HistoryBook, NewAlert, NewHistoryItem, TrackedToken};
use async_trait::async_trait;

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn get_alerts(&self) -> DashboardResult<Vec<Alert>>;

    async fn save_alert(&self, alert: NewAlert) -> DashboardResult<Vec<Alert>>;

    async fn delete_alert(&self, id: &str) -> DashboardResult<Vec<Alert>>;

    async fn update_alert_last_price(&self, id: &str, last_price: f64)
        -> DashboardResult<Vec<Alert>>;

    async fn get_history(&self) -> DashboardResult<HistoryBook>;

    async fn add_history(&self, item: NewHistoryItem) -> DashboardResult<HistoryBook>;

    /// Mark one item read, or every item when `id` is `None`.
    async fn mark_history_read(&self, id: Option<&str>) -> DashboardResult<HistoryBook>;

    async fn delete_history_item(&self, id: &str) -> DashboardResult<HistoryBook>;

    async fn clear_all_history(&self) -> DashboardResult<HistoryBook>;
}

#[async_trait]
pub trait TokenListStore: Send + Sync {
    async fn list(&self) -> DashboardResult<Vec<TrackedToken>>;

    async fn add(&self, address: &str) -> DashboardResult<Vec<TrackedToken>>;

    async fn remove(&self, address: &str) -> DashboardResult<Vec<TrackedToken>>;

    async fn reorder(&self, addresses: &[String]) -> DashboardResult<Vec<TrackedToken>>;
}
