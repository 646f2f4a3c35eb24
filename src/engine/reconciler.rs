//! Local alert/history cache kept in step with an [`AlertStore`].
//!
//! Every mutation goes to the store first. On success the returned
//! authoritative collection replaces the cache wholesale; on failure the
//! cache is left exactly as it was and the error goes back to the caller.

use crate::error::{DashboardError, DashboardResult};
use crate::storage::AlertStore;
use crate::types::{
    is_valid_price, Alert, HistoryBook, NewAlert, NewHistoryItem, MIN_ADDRESS_LEN,
};
use std::sync::Arc;
use tracing::debug;

pub struct AlertReconciler {
    store: Arc<dyn AlertStore>,
    /// `None` until the first successful load or mutation.
    alerts: Option<Vec<Alert>>,
    history: HistoryBook,
}

impl AlertReconciler {
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self {
            store,
            alerts: None,
            history: HistoryBook::default(),
        }
    }

    pub fn has_cache(&self) -> bool {
        self.alerts.is_some()
    }

    pub fn alerts(&self) -> &[Alert] {
        self.alerts.as_deref().unwrap_or(&[])
    }

    pub fn find_alert(&self, id: &str) -> Option<&Alert> {
        self.alerts().iter().find(|a| a.id == id)
    }

    pub fn pending_for(&self, address: &str) -> Vec<Alert> {
        self.alerts()
            .iter()
            .filter(|a| a.token_address == address)
            .cloned()
            .collect()
    }

    pub fn history(&self) -> &HistoryBook {
        &self.history
    }

    pub async fn refresh_alerts(&mut self) -> DashboardResult<Vec<Alert>> {
        let result = self.store.get_alerts().await;
        self.replace_alerts(result)
    }

    pub async fn refresh_history(&mut self) -> DashboardResult<HistoryBook> {
        let result = self.store.get_history().await;
        self.replace_history(result)
    }

    /// Validates locally before touching the store so bad input never costs
    /// a round-trip.
    pub async fn create_alert(&mut self, alert: NewAlert) -> DashboardResult<Vec<Alert>> {
        if alert.token_address.trim().len() < MIN_ADDRESS_LEN {
            return Err(DashboardError::validation("invalid token address"));
        }
        if !is_valid_price(alert.target_price) {
            return Err(DashboardError::validation(
                "target price must be greater than zero",
            ));
        }
        let result = self.store.save_alert(alert).await;
        self.replace_alerts(result)
    }

    pub async fn delete_alert(&mut self, id: &str) -> DashboardResult<Vec<Alert>> {
        let result = self.store.delete_alert(id).await;
        self.replace_alerts(result)
    }

    pub async fn update_last_price(&mut self, id: &str, price: f64) -> DashboardResult<Vec<Alert>> {
        let result = self.store.update_alert_last_price(id, price).await;
        self.replace_alerts(result)
    }

    pub async fn append_history(&mut self, item: NewHistoryItem) -> DashboardResult<HistoryBook> {
        let result = self.store.add_history(item).await;
        self.replace_history(result)
    }

    pub async fn mark_read(&mut self, id: Option<&str>) -> DashboardResult<HistoryBook> {
        let result = self.store.mark_history_read(id).await;
        self.replace_history(result)
    }

    pub async fn delete_history_item(&mut self, id: &str) -> DashboardResult<HistoryBook> {
        let result = self.store.delete_history_item(id).await;
        self.replace_history(result)
    }

    pub async fn clear_history(&mut self) -> DashboardResult<HistoryBook> {
        let result = self.store.clear_all_history().await;
        self.replace_history(result)
    }

    fn replace_alerts(&mut self, result: DashboardResult<Vec<Alert>>) -> DashboardResult<Vec<Alert>> {
        match result {
            Ok(alerts) => {
                self.alerts = Some(alerts.clone());
                Ok(alerts)
            }
            Err(e) => {
                debug!("alert store call failed, cache kept: {}", e);
                Err(e)
            }
        }
    }

    fn replace_history(
        &mut self,
        result: DashboardResult<HistoryBook>,
    ) -> DashboardResult<HistoryBook> {
        match result {
            Ok(book) => {
                self.history = book.clone();
                Ok(book)
            }
            Err(e) => {
                debug!("history store call failed, cache kept: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::MemoryAlertStore;

    const ADDR: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    fn new_alert(target: f64) -> NewAlert {
        NewAlert {
            token_address: ADDR.to_string(),
            token_symbol: Some("BONK".to_string()),
            target_price: target,
        }
    }

    #[tokio::test]
    async fn test_success_replaces_cache_wholesale() {
        let store = Arc::new(MemoryAlertStore::default());
        let mut reconciler = AlertReconciler::new(store.clone());
        assert!(!reconciler.has_cache());

        reconciler.create_alert(new_alert(1.0)).await.unwrap();
        assert_eq!(reconciler.alerts().len(), 1);

        // A second writer adds an alert behind our back; the next mutation's
        // response brings it in.
        store.insert_directly(new_alert(2.0)).await;
        reconciler.create_alert(new_alert(3.0)).await.unwrap();
        assert_eq!(reconciler.alerts().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_keeps_cache() {
        let store = Arc::new(MemoryAlertStore::default());
        let mut reconciler = AlertReconciler::new(store.clone());
        reconciler.create_alert(new_alert(1.0)).await.unwrap();
        let before = reconciler.alerts().to_vec();

        store.set_failing(true);
        let err = reconciler.create_alert(new_alert(5.0)).await.unwrap_err();
        assert!(matches!(err, DashboardError::Remote(_)));
        assert_eq!(reconciler.alerts(), before.as_slice());

        assert!(reconciler.clear_history().await.is_err());
        assert_eq!(reconciler.history(), &HistoryBook::default());
    }

    #[tokio::test]
    async fn test_validation_never_reaches_store() {
        let store = Arc::new(MemoryAlertStore::default());
        let mut reconciler = AlertReconciler::new(store.clone());

        let err = reconciler.create_alert(new_alert(0.0)).await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
        assert_eq!(store.calls(), 0);
        assert!(!reconciler.has_cache());
    }

    #[tokio::test]
    async fn test_not_found_is_distinct() {
        let store = Arc::new(MemoryAlertStore::default());
        let mut reconciler = AlertReconciler::new(store);
        let err = reconciler.delete_alert("missing").await.unwrap_err();
        assert!(err.is_not_found());
        let err = reconciler.delete_history_item("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
