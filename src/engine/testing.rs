//! In-memory fakes for the store and market-data seams.

use crate::error::{DashboardError, DashboardResult};
use crate::services::market_data::MarketDataSource;
use crate::storage::alert_file::AlertDocument;
use crate::storage::token_file::{add_token, remove_token, reorder_tokens};
use crate::storage::{AlertStore, TokenListStore};
use crate::types::{Alert, HistoryBook, MarketSnapshot, NewAlert, NewHistoryItem, TrackedToken};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct MemoryAlertStore {
    doc: Mutex<AlertDocument>,
    failing: AtomicBool,
    history_failing: AtomicBool,
    next_read_failing: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryAlertStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fail_history(&self, failing: bool) {
        self.history_failing.store(failing, Ordering::SeqCst);
    }

    /// Fail only the next `get_alerts`; writes keep working.
    pub fn fail_next_read(&self) {
        self.next_read_failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> AlertDocument {
        self.doc.lock().await.clone()
    }

    pub async fn insert_directly(&self, alert: NewAlert) {
        let _ = self.doc.lock().await.insert_alert(alert, 0);
    }

    pub async fn remove_directly(&self, id: &str) {
        let _ = self.doc.lock().await.remove_alert(id);
    }

    fn check(&self) -> DashboardResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DashboardError::remote("store unreachable"));
        }
        Ok(())
    }

    fn book(doc: &AlertDocument) -> HistoryBook {
        HistoryBook {
            history: doc.history.clone(),
            unread_count: doc.unread_count,
        }
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn get_alerts(&self) -> DashboardResult<Vec<Alert>> {
        self.check()?;
        if self.next_read_failing.swap(false, Ordering::SeqCst) {
            return Err(DashboardError::remote("alert read timed out"));
        }
        Ok(self.doc.lock().await.alerts.clone())
    }

    async fn save_alert(&self, alert: NewAlert) -> DashboardResult<Vec<Alert>> {
        self.check()?;
        let mut doc = self.doc.lock().await;
        doc.insert_alert(alert, chrono::Utc::now().timestamp())?;
        Ok(doc.alerts.clone())
    }

    async fn delete_alert(&self, id: &str) -> DashboardResult<Vec<Alert>> {
        self.check()?;
        let mut doc = self.doc.lock().await;
        doc.remove_alert(id)?;
        Ok(doc.alerts.clone())
    }

    async fn update_alert_last_price(&self, id: &str, last_price: f64) -> DashboardResult<Vec<Alert>> {
        self.check()?;
        let mut doc = self.doc.lock().await;
        doc.set_last_price(id, last_price)?;
        Ok(doc.alerts.clone())
    }

    async fn get_history(&self) -> DashboardResult<HistoryBook> {
        self.check()?;
        Ok(Self::book(&*self.doc.lock().await))
    }

    async fn add_history(&self, item: NewHistoryItem) -> DashboardResult<HistoryBook> {
        self.check()?;
        if self.history_failing.load(Ordering::SeqCst) {
            return Err(DashboardError::remote("history write failed"));
        }
        let mut doc = self.doc.lock().await;
        doc.push_history(item, chrono::Utc::now().timestamp());
        Ok(Self::book(&doc))
    }

    async fn mark_history_read(&self, id: Option<&str>) -> DashboardResult<HistoryBook> {
        self.check()?;
        let mut doc = self.doc.lock().await;
        doc.mark_read(id)?;
        Ok(Self::book(&doc))
    }

    async fn delete_history_item(&self, id: &str) -> DashboardResult<HistoryBook> {
        self.check()?;
        let mut doc = self.doc.lock().await;
        doc.remove_history(id)?;
        Ok(Self::book(&doc))
    }

    async fn clear_all_history(&self) -> DashboardResult<HistoryBook> {
        self.check()?;
        let mut doc = self.doc.lock().await;
        doc.clear_history();
        Ok(Self::book(&doc))
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Vec<TrackedToken>>,
    failing: AtomicBool,
}

impl MemoryTokenStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> DashboardResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DashboardError::remote("token store unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenListStore for MemoryTokenStore {
    async fn list(&self) -> DashboardResult<Vec<TrackedToken>> {
        self.check()?;
        Ok(self.tokens.lock().await.clone())
    }

    async fn add(&self, address: &str) -> DashboardResult<Vec<TrackedToken>> {
        self.check()?;
        let mut tokens = self.tokens.lock().await;
        *tokens = add_token(tokens.clone(), address)?;
        Ok(tokens.clone())
    }

    async fn remove(&self, address: &str) -> DashboardResult<Vec<TrackedToken>> {
        self.check()?;
        let mut tokens = self.tokens.lock().await;
        *tokens = remove_token(tokens.clone(), address);
        Ok(tokens.clone())
    }

    async fn reorder(&self, addresses: &[String]) -> DashboardResult<Vec<TrackedToken>> {
        self.check()?;
        let mut tokens = self.tokens.lock().await;
        *tokens = reorder_tokens(tokens.clone(), addresses);
        Ok(tokens.clone())
    }
}

/// Market data answering from a per-address price table.
#[derive(Default)]
pub struct ScriptedMarketData {
    prices: StdMutex<HashMap<String, Option<f64>>>,
    pub fetches: AtomicUsize,
}

impl ScriptedMarketData {
    pub fn set_price(&self, address: &str, price: Option<f64>) {
        if let Ok(mut prices) = self.prices.lock() {
            prices.insert(address.to_string(), price);
        }
    }
}

#[async_trait]
impl MarketDataSource for ScriptedMarketData {
    async fn fetch(&self, address: &str) -> DashboardResult<Option<MarketSnapshot>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let price = self
            .prices
            .lock()
            .ok()
            .and_then(|prices| prices.get(address).copied());
        match price {
            Some(Some(price)) => Ok(Some(snapshot(address, price))),
            Some(None) => Ok(None),
            None => Err(DashboardError::Fetch(format!("no route for {}", address))),
        }
    }
}

pub fn snapshot(address: &str, price: f64) -> MarketSnapshot {
    MarketSnapshot {
        address: address.to_string(),
        pair_address: None,
        symbol: "TEST".to_string(),
        name: "Test Token".to_string(),
        image_url: None,
        price_usd: Some(price),
        market_cap: Some(price * 1_000_000.0),
        fdv: None,
        volume_24h: Some(10_000.0),
        volume_5m: Some(100.0),
        liquidity_usd: Some(50_000.0),
    }
}
