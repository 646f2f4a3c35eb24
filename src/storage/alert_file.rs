//! Pending alerts and the trigger history, persisted together in one JSON
//! document that is rewritten wholesale on every mutation.

use super::json_file;
use super::AlertStore;
use crate::error::{DashboardError, DashboardResult};
use crate::types::{
    is_valid_price, Alert, HistoryBook, HistoryItem, NewAlert, NewHistoryItem, HISTORY_CAP,
    MIN_ADDRESS_LEN, UNKNOWN_SYMBOL,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawAlertDocument")]
pub struct AlertDocument {
    pub alerts: Vec<Alert>,
    pub history: Vec<HistoryItem>,
    pub unread_count: u32,
}

/// On-disk shape before per-entry validation.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAlertDocument {
    #[serde(default)]
    alerts: Vec<Value>,
    #[serde(default)]
    history: Vec<Value>,
    #[serde(default)]
    unread_count: u32,
}

impl From<RawAlertDocument> for AlertDocument {
    fn from(raw: RawAlertDocument) -> Self {
        Self {
            alerts: decode_entries(raw.alerts, "alert"),
            history: decode_entries(raw.history, "history item"),
            unread_count: raw.unread_count,
        }
    }
}

/// Keep the entries that decode; a malformed one is dropped on its own
/// instead of taking the rest of the file with it.
fn decode_entries<T: DeserializeOwned>(entries: Vec<Value>, what: &str) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("⚠️ dropping malformed {}: {}", what, e);
                None
            }
        })
        .collect()
}

impl AlertDocument {
    fn history_book(&self) -> HistoryBook {
        HistoryBook {
            history: self.history.clone(),
            unread_count: self.unread_count,
        }
    }

    pub fn insert_alert(&mut self, alert: NewAlert, now: i64) -> DashboardResult<Alert> {
        let token_address = alert.token_address.trim().to_string();
        if token_address.len() < MIN_ADDRESS_LEN {
            return Err(DashboardError::validation("invalid token address"));
        }
        if !is_valid_price(alert.target_price) {
            return Err(DashboardError::validation("target price must be greater than zero"));
        }

        let token_symbol = alert
            .token_symbol
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string());

        let saved = Alert {
            id: new_id(),
            token_address,
            token_symbol,
            target_price: alert.target_price,
            created_at: now,
            last_price: None,
        };
        self.alerts.push(saved.clone());
        Ok(saved)
    }

    pub fn remove_alert(&mut self, id: &str) -> DashboardResult<Alert> {
        let index = self
            .alerts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| DashboardError::not_found(format!("alert {}", id)))?;
        Ok(self.alerts.remove(index))
    }

    pub fn set_last_price(&mut self, id: &str, last_price: f64) -> DashboardResult<()> {
        let alert = self
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| DashboardError::not_found(format!("alert {}", id)))?;
        alert.last_price = Some(last_price);
        Ok(())
    }

    /// Newest first; the unread counter grows even when the cap drops an item.
    pub fn push_history(&mut self, item: NewHistoryItem, now: i64) -> HistoryItem {
        let entry = HistoryItem {
            id: new_id(),
            token_address: item.token_address,
            token_symbol: item.token_symbol,
            target_price: item.target_price,
            actual_price: item.actual_price,
            triggered_at: now,
            read: false,
            kind: item.kind,
            note: item.note,
        };
        self.history.insert(0, entry.clone());
        self.history.truncate(HISTORY_CAP);
        self.unread_count = self.unread_count.saturating_add(1);
        entry
    }

    pub fn mark_read(&mut self, id: Option<&str>) -> DashboardResult<()> {
        match id {
            Some(id) => {
                let item = self
                    .history
                    .iter_mut()
                    .find(|h| h.id == id)
                    .ok_or_else(|| DashboardError::not_found(format!("history item {}", id)))?;
                if !item.read {
                    item.read = true;
                    self.unread_count = self.unread_count.saturating_sub(1);
                }
            }
            None => {
                self.history.iter_mut().for_each(|h| h.read = true);
                self.unread_count = 0;
            }
        }
        Ok(())
    }

    pub fn remove_history(&mut self, id: &str) -> DashboardResult<HistoryItem> {
        let index = self
            .history
            .iter()
            .position(|h| h.id == id)
            .ok_or_else(|| DashboardError::not_found(format!("history item {}", id)))?;
        let removed = self.history.remove(index);
        if !removed.read {
            self.unread_count = self.unread_count.saturating_sub(1);
        }
        Ok(removed)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.unread_count = 0;
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

pub struct AlertFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AlertFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> DashboardResult<AlertDocument> {
        json_file::read_or_default(&self.path).await
    }

    /// Load, apply, and rewrite the document under the write lock. Nothing is
    /// written when `apply` fails.
    async fn mutate<F>(&self, apply: F) -> DashboardResult<AlertDocument>
    where
        F: FnOnce(&mut AlertDocument) -> DashboardResult<()>,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        apply(&mut doc)?;
        json_file::write_atomic(&self.path, &doc).await?;
        Ok(doc)
    }
}

#[async_trait]
impl AlertStore for AlertFileStore {
    async fn get_alerts(&self) -> DashboardResult<Vec<Alert>> {
        Ok(self.load().await?.alerts)
    }

    async fn save_alert(&self, alert: NewAlert) -> DashboardResult<Vec<Alert>> {
        let doc = self
            .mutate(|doc| {
                let saved = doc.insert_alert(alert, Utc::now().timestamp())?;
                info!(
                    "🔔 alert {} saved: {} @ {}",
                    saved.id, saved.token_symbol, saved.target_price
                );
                Ok(())
            })
            .await?;
        Ok(doc.alerts)
    }

    async fn delete_alert(&self, id: &str) -> DashboardResult<Vec<Alert>> {
        let doc = self.mutate(|doc| doc.remove_alert(id).map(|_| ())).await?;
        Ok(doc.alerts)
    }

    async fn update_alert_last_price(
        &self,
        id: &str,
        last_price: f64,
    ) -> DashboardResult<Vec<Alert>> {
        if !last_price.is_finite() {
            return Err(DashboardError::validation("last price must be finite"));
        }
        let doc = self.mutate(|doc| doc.set_last_price(id, last_price)).await?;
        debug!("alert {} last price -> {}", id, last_price);
        Ok(doc.alerts)
    }

    async fn get_history(&self) -> DashboardResult<HistoryBook> {
        Ok(self.load().await?.history_book())
    }

    async fn add_history(&self, item: NewHistoryItem) -> DashboardResult<HistoryBook> {
        if item.token_address.trim().is_empty() {
            return Err(DashboardError::validation("history item needs a token address"));
        }
        let doc = self
            .mutate(|doc| {
                doc.push_history(item, Utc::now().timestamp());
                Ok(())
            })
            .await?;
        Ok(doc.history_book())
    }

    async fn mark_history_read(&self, id: Option<&str>) -> DashboardResult<HistoryBook> {
        let doc = self.mutate(|doc| doc.mark_read(id)).await?;
        Ok(doc.history_book())
    }

    async fn delete_history_item(&self, id: &str) -> DashboardResult<HistoryBook> {
        let doc = self.mutate(|doc| doc.remove_history(id).map(|_| ())).await?;
        Ok(doc.history_book())
    }

    async fn clear_all_history(&self) -> DashboardResult<HistoryBook> {
        let doc = self
            .mutate(|doc| {
                doc.clear_history();
                Ok(())
            })
            .await?;
        info!("🧹 history cleared");
        Ok(doc.history_book())
    }
}
