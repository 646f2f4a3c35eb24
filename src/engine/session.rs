//! The dashboard session: every piece of mutable dashboard state, owned in
//! one place and shared by reference with the poller and the HTTP layer.

use super::evaluator::{AlertEvaluator, EvaluationReport};
use super::price_history::PriceHistoryStore;
use super::reconciler::AlertReconciler;
use super::timeframe::{Timeframe, TimeframeProjector, TimeframeView};
use crate::config::FeatureFlags;
use crate::error::{DashboardError, DashboardResult};
use crate::storage::{AlertStore, TokenListStore};
use crate::types::{
    Alert, DashboardEvent, HistoryBook, MarketSnapshot, NewAlert, PriceObservation, TrackedToken,
};
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tracing::{info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Default)]
struct CardEntry {
    snapshot: Option<MarketSnapshot>,
    degraded: bool,
    last_error: Option<String>,
    timeframe: Timeframe,
    updated_at: Option<i64>,
}

/// What a presentation layer needs to draw one token card.
#[derive(Debug, Clone, Serialize)]
pub struct CardState {
    pub address: String,
    pub order: u32,
    pub snapshot: Option<MarketSnapshot>,
    pub degraded: bool,
    pub last_error: Option<String>,
    pub timeframe: Timeframe,
    pub updated_at: Option<i64>,
    pub chart: Option<TimeframeView>,
}

pub struct DashboardSession {
    features: FeatureFlags,
    token_store: Arc<dyn TokenListStore>,
    tokens: RwLock<Vec<TrackedToken>>,
    history: Mutex<PriceHistoryStore>,
    cards: Mutex<HashMap<String, CardEntry>>,
    reconciler: Mutex<AlertReconciler>,
    events: broadcast::Sender<DashboardEvent>,
    token_count: watch::Sender<usize>,
}

impl DashboardSession {
    pub fn new(
        features: FeatureFlags,
        history_retention: usize,
        token_store: Arc<dyn TokenListStore>,
        alert_store: Arc<dyn AlertStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (token_count, _) = watch::channel(0);
        Self {
            features,
            token_store,
            tokens: RwLock::new(Vec::new()),
            history: Mutex::new(PriceHistoryStore::new(history_retention)),
            cards: Mutex::new(HashMap::new()),
            reconciler: Mutex::new(AlertReconciler::new(alert_store)),
            events,
            token_count,
        }
    }

    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<DashboardEvent> {
        self.events.clone()
    }

    pub fn watch_token_count(&self) -> watch::Receiver<usize> {
        self.token_count.subscribe()
    }

    /// Pull the token list, alerts and history from the stores. Failures are
    /// logged; the session then runs on whatever it already holds.
    pub async fn load(&self) {
        match self.token_store.list().await {
            Ok(tokens) => self.replace_tokens(tokens).await,
            Err(e) => warn!("⚠️ token list unavailable, starting empty: {}", e),
        }

        if self.features.alerts_enabled {
            let mut reconciler = self.reconciler.lock().await;
            if let Err(e) = reconciler.refresh_alerts().await {
                warn!("⚠️ alerts unavailable: {}", e);
            }
            if let Err(e) = reconciler.refresh_history().await {
                warn!("⚠️ history unavailable: {}", e);
            }
        }
    }

    // ---- tracked tokens -------------------------------------------------

    pub async fn tokens(&self) -> Vec<TrackedToken> {
        self.tokens.read().await.clone()
    }

    pub async fn tracked_addresses(&self) -> Vec<String> {
        self.tokens
            .read()
            .await
            .iter()
            .map(|t| t.address.clone())
            .collect()
    }

    pub async fn is_tracked(&self, address: &str) -> bool {
        self.tokens.read().await.iter().any(|t| t.address == address)
    }

    pub async fn add_token(&self, address: &str) -> DashboardResult<Vec<TrackedToken>> {
        let tokens = self.token_store.add(address.trim()).await?;
        self.replace_tokens(tokens.clone()).await;
        Ok(tokens)
    }

    pub async fn remove_token(&self, address: &str) -> DashboardResult<Vec<TrackedToken>> {
        let tokens = self.token_store.remove(address.trim()).await?;
        self.replace_tokens(tokens.clone()).await;
        Ok(tokens)
    }

    /// Re-read the token list from the store and adopt it when it differs
    /// from the session's copy, so changes made by other clients are polled.
    pub async fn sync_tokens(&self) -> DashboardResult<Vec<TrackedToken>> {
        let mut tokens = self.token_store.list().await?;
        tokens.sort_by_key(|t| t.order);
        let changed = *self.tokens.read().await != tokens;
        if changed {
            info!("🔄 token list changed in the store, {} tracked", tokens.len());
            self.replace_tokens(tokens.clone()).await;
        }
        Ok(tokens)
    }

    pub async fn reorder_tokens(&self, addresses: &[String]) -> DashboardResult<Vec<TrackedToken>> {
        let tokens = self.token_store.reorder(addresses).await?;
        self.replace_tokens(tokens.clone()).await;
        Ok(tokens)
    }

    /// Swap in an authoritative token list and drop state for anything no
    /// longer tracked.
    async fn replace_tokens(&self, tokens: Vec<TrackedToken>) {
        let mut sorted = tokens;
        sorted.sort_by_key(|t| t.order);
        let addresses: HashSet<String> = sorted.iter().map(|t| t.address.clone()).collect();

        {
            let mut current = self.tokens.write().await;
            *current = sorted.clone();
        }
        self.history
            .lock()
            .await
            .retain_addresses(addresses.iter().map(String::as_str));
        self.cards
            .lock()
            .await
            .retain(|address, _| addresses.contains(address));

        self.token_count.send_replace(sorted.len());
        let _ = self.events.send(DashboardEvent::TokensChanged { tokens: sorted });
    }

    // ---- cards and charts -----------------------------------------------

    pub async fn set_timeframe(
        &self,
        address: &str,
        timeframe: Timeframe,
    ) -> DashboardResult<TimeframeView> {
        if !self.is_tracked(address).await {
            return Err(DashboardError::not_found(format!("token {}", address)));
        }
        self.cards
            .lock()
            .await
            .entry(address.to_string())
            .or_default()
            .timeframe = timeframe;
        Ok(self.project(address, timeframe).await)
    }

    /// Chart for `address`, using the card's selected timeframe unless one is given.
    pub async fn chart(
        &self,
        address: &str,
        timeframe: Option<Timeframe>,
    ) -> DashboardResult<TimeframeView> {
        if !self.is_tracked(address).await {
            return Err(DashboardError::not_found(format!("token {}", address)));
        }
        let timeframe = match timeframe {
            Some(tf) => tf,
            None => self.selected_timeframe(address).await,
        };
        Ok(self.project(address, timeframe).await)
    }

    pub async fn cards(&self) -> Vec<CardState> {
        let tokens = self.tokens().await;
        let history = self.history.lock().await;
        let cards = self.cards.lock().await;

        tokens
            .into_iter()
            .map(|token| {
                let entry = cards.get(&token.address).cloned().unwrap_or_default();
                let chart = self.features.charting_enabled.then(|| {
                    TimeframeProjector::project(&history, &token.address, entry.timeframe)
                });
                CardState {
                    address: token.address,
                    order: token.order,
                    snapshot: entry.snapshot,
                    degraded: entry.degraded,
                    last_error: entry.last_error,
                    timeframe: entry.timeframe,
                    updated_at: entry.updated_at,
                    chart,
                }
            })
            .collect()
    }

    async fn selected_timeframe(&self, address: &str) -> Timeframe {
        self.cards
            .lock()
            .await
            .get(address)
            .map(|c| c.timeframe)
            .unwrap_or_default()
    }

    async fn project(&self, address: &str, timeframe: Timeframe) -> TimeframeView {
        let history = self.history.lock().await;
        TimeframeProjector::project(&history, address, timeframe)
    }

    // ---- poll cycle plumbing --------------------------------------------

    /// Fold one cycle's fetch results into history and card state.
    ///
    /// Results for addresses untracked while the fetch was in flight are
    /// discarded. A failed fetch marks the card degraded but leaves its last
    /// good snapshot and the price history untouched.
    pub async fn apply_cycle_results(
        &self,
        results: Vec<(String, DashboardResult<Option<MarketSnapshot>>)>,
    ) -> Vec<PriceObservation> {
        let now = Utc::now().timestamp_millis();
        let mut batch = Vec::with_capacity(results.len());
        let mut updates = Vec::new();

        {
            let mut history = self.history.lock().await;
            let mut cards = self.cards.lock().await;
            // Read under the history/cards locks: `replace_tokens` prunes
            // both after publishing a new list, so an untrack cannot slip in
            // between this check and the append.
            let tracked: HashSet<String> = self
                .tokens
                .read()
                .await
                .iter()
                .map(|t| t.address.clone())
                .collect();

            for (address, result) in results {
                if !tracked.contains(&address) {
                    continue;
                }
                let card = cards.entry(address.clone()).or_default();

                let price = match result {
                    Ok(Some(snapshot)) => {
                        let price = snapshot.price_usd;
                        if let Some(price) = price {
                            history.append_at(&address, now, price);
                        }
                        card.snapshot = Some(snapshot);
                        card.degraded = false;
                        card.last_error = None;
                        card.updated_at = Some(now);
                        price
                    }
                    Ok(None) => {
                        card.degraded = true;
                        card.last_error = Some("no trading pairs found".to_string());
                        None
                    }
                    Err(e) => {
                        card.degraded = true;
                        card.last_error = Some(e.to_string());
                        None
                    }
                };

                let chart = self
                    .features
                    .charting_enabled
                    .then(|| TimeframeProjector::project(&history, &address, card.timeframe));
                updates.push(DashboardEvent::PriceUpdated {
                    address: address.clone(),
                    snapshot: card.snapshot.clone(),
                    degraded: card.degraded,
                    chart,
                });
                batch.push(PriceObservation { address, price });
            }
        }

        for event in updates {
            let _ = self.events.send(event);
        }
        batch
    }

    pub async fn evaluate_alerts(&self, batch: &[PriceObservation]) -> EvaluationReport {
        if !self.features.alerts_enabled {
            return EvaluationReport::default();
        }

        let (report, alerts, unread_count) = {
            let mut reconciler = self.reconciler.lock().await;
            let report = AlertEvaluator::evaluate(&mut reconciler, batch).await;
            (
                report,
                reconciler.alerts().to_vec(),
                reconciler.history().unread_count,
            )
        };

        if !report.triggered.is_empty() {
            for (alert, history) in &report.triggered {
                let _ = self.events.send(DashboardEvent::AlertTriggered {
                    alert: alert.clone(),
                    history: history.clone(),
                });
            }
            let _ = self.events.send(DashboardEvent::AlertsChanged { alerts });
            let _ = self.events.send(DashboardEvent::HistoryChanged { unread_count });
        }
        report
    }

    // ---- alerts and history (foreground) ---------------------------------

    pub async fn alerts(&self) -> Vec<Alert> {
        self.reconciler.lock().await.alerts().to_vec()
    }

    pub async fn history(&self) -> HistoryBook {
        self.reconciler.lock().await.history().clone()
    }

    pub async fn refresh_alerts(&self) -> DashboardResult<Vec<Alert>> {
        self.reconciler.lock().await.refresh_alerts().await
    }

    pub async fn refresh_history(&self) -> DashboardResult<HistoryBook> {
        self.reconciler.lock().await.refresh_history().await
    }

    pub async fn create_alert(&self, alert: NewAlert) -> DashboardResult<Vec<Alert>> {
        let alerts = self.reconciler.lock().await.create_alert(alert).await?;
        info!("🔔 {} pending alerts", alerts.len());
        let _ = self.events.send(DashboardEvent::AlertsChanged {
            alerts: alerts.clone(),
        });
        Ok(alerts)
    }

    pub async fn delete_alert(&self, id: &str) -> DashboardResult<Vec<Alert>> {
        let alerts = self.reconciler.lock().await.delete_alert(id).await?;
        let _ = self.events.send(DashboardEvent::AlertsChanged {
            alerts: alerts.clone(),
        });
        Ok(alerts)
    }

    pub async fn mark_history_read(&self, id: Option<&str>) -> DashboardResult<HistoryBook> {
        let book = self.reconciler.lock().await.mark_read(id).await?;
        self.history_changed(&book);
        Ok(book)
    }

    pub async fn delete_history_item(&self, id: &str) -> DashboardResult<HistoryBook> {
        let book = self.reconciler.lock().await.delete_history_item(id).await?;
        self.history_changed(&book);
        Ok(book)
    }

    pub async fn clear_history(&self) -> DashboardResult<HistoryBook> {
        let book = self.reconciler.lock().await.clear_history().await?;
        self.history_changed(&book);
        Ok(book)
    }

    fn history_changed(&self, book: &HistoryBook) {
        let _ = self.events.send(DashboardEvent::HistoryChanged {
            unread_count: book.unread_count,
        });
    }
}
