//! Recurring fetch-and-update cycle across all tracked tokens.
//!
//! Ticks fire on a fixed interval and each tick spawns its own cycle. A
//! cycle-in-progress flag makes a tick that lands while the previous cycle
//! is still in flight skip instead of starting a second one, so an alert's
//! `lastPrice` always comes from a strictly earlier cycle than the price it
//! is compared against.

use super::evaluator::EvaluationReport;
use super::session::DashboardSession;
use crate::services::market_data::MarketDataSource;
use futures_util::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct CycleReport {
    pub fetched: usize,
    pub failed: usize,
    pub evaluation: EvaluationReport,
}

pub struct PollCycleController {
    session: Arc<DashboardSession>,
    source: Arc<dyn MarketDataSource>,
    interval: Duration,
    in_progress: AtomicBool,
}

/// Clears the in-progress flag however the cycle ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl PollCycleController {
    pub fn new(
        session: Arc<DashboardSession>,
        source: Arc<dyn MarketDataSource>,
        interval: Duration,
    ) -> Self {
        Self {
            session,
            source,
            interval,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn is_running_cycle(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Run one cycle, or return `None` if another cycle is still in flight.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("previous poll cycle still running, skipping tick");
            return None;
        }
        let _guard = CycleGuard(&self.in_progress);

        if let Err(e) = self.session.sync_tokens().await {
            debug!("token list sync failed, polling the session's list: {}", e);
        }
        let addresses = self.session.tracked_addresses().await;
        if addresses.is_empty() {
            return Some(CycleReport::default());
        }

        let fetches = addresses.iter().map(|address| {
            let source = &self.source;
            async move { (address.clone(), source.fetch(address).await) }
        });
        let results = join_all(fetches).await;

        let failed = results
            .iter()
            .filter(|(_, result)| !matches!(result, Ok(Some(_))))
            .count();
        for (address, result) in &results {
            if let Err(e) = result {
                warn!("⚠️ fetch failed for {}: {}", address, e);
            }
        }

        let batch = self.session.apply_cycle_results(results).await;
        let evaluation = self.session.evaluate_alerts(&batch).await;

        debug!(
            "poll cycle done: {} tokens, {} failed, {} alerts triggered",
            batch.len(),
            failed,
            evaluation.triggered.len()
        );

        Some(CycleReport {
            fetched: addresses.len() - failed,
            failed,
            evaluation,
        })
    }

    /// Keep the timer running while at least one token is tracked.
    ///
    /// The ticker task is aborted when the list empties and respawned when it
    /// fills again. Cycles already in flight finish on their own. While idle
    /// the token list is still re-read from the store on the poll interval,
    /// so a token added by another client restarts the timer.
    pub async fn start(self: Arc<Self>) {
        let mut token_count = self.session.watch_token_count();
        let mut ticker: Option<JoinHandle<()>> = None;
        let mut resync = time::interval(self.interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let active = *token_count.borrow_and_update() > 0;
            match (active, ticker.is_some()) {
                (true, false) => {
                    info!("▶️ poll timer started, every {:?}", self.interval);
                    ticker = Some(tokio::spawn(Arc::clone(&self).tick_loop()));
                }
                (false, true) => {
                    if let Some(handle) = ticker.take() {
                        handle.abort();
                    }
                    info!("⏸️ poll timer stopped, no tracked tokens");
                }
                _ => {}
            }

            tokio::select! {
                changed = token_count.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = resync.tick(), if ticker.is_none() => {
                    if let Err(e) = self.session.sync_tokens().await {
                        debug!("idle token list sync failed: {}", e);
                    }
                }
            }
        }

        if let Some(handle) = ticker {
            handle.abort();
        }
    }

    async fn tick_loop(self: Arc<Self>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let controller = Arc::clone(&self);
            tokio::spawn(async move {
                controller.run_cycle().await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureFlags;
    use crate::engine::testing::{MemoryAlertStore, MemoryTokenStore, ScriptedMarketData};
    use crate::storage::TokenListStore;
    use crate::types::NewAlert;

    const A: &str = "ukHH6c7mMyiWCf1b9pnWe25TSpkDDt3H5pQZgZ74J82";
    const B: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    async fn controller() -> (Arc<ScriptedMarketData>, Arc<DashboardSession>, PollCycleController) {
        let session = Arc::new(DashboardSession::new(
            FeatureFlags::default(),
            1000,
            Arc::new(MemoryTokenStore::default()),
            Arc::new(MemoryAlertStore::default()),
        ));
        session.add_token(A).await.unwrap();
        session.add_token(B).await.unwrap();
        let source = Arc::new(ScriptedMarketData::default());
        let controller =
            PollCycleController::new(Arc::clone(&session), source.clone(), Duration::from_secs(5));
        (source, session, controller)
    }

    #[tokio::test]
    async fn test_cycle_isolates_per_token_failures() {
        let (source, session, controller) = controller().await;
        source.set_price(A, Some(0.01));

        let report = controller.run_cycle().await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);

        let cards = session.cards().await;
        assert!(!cards[0].degraded);
        assert!(cards[1].degraded);
        assert!(!controller.is_running_cycle());
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let (_, _, controller) = controller().await;
        controller.in_progress.store(true, Ordering::SeqCst);
        assert!(controller.run_cycle().await.is_none());
        controller.in_progress.store(false, Ordering::SeqCst);
        assert!(controller.run_cycle().await.is_some());
    }

    #[tokio::test]
    async fn test_cycles_drive_alert_crossing() {
        let (source, session, controller) = controller().await;
        session
            .create_alert(NewAlert {
                token_address: B.to_string(),
                token_symbol: Some("RAY".to_string()),
                target_price: 2.0,
            })
            .await
            .unwrap();

        source.set_price(B, Some(1.5));
        let first = controller.run_cycle().await.unwrap();
        assert!(first.evaluation.triggered.is_empty());
        assert_eq!(first.evaluation.updated, 1);

        source.set_price(B, Some(2.5));
        let second = controller.run_cycle().await.unwrap();
        assert_eq!(second.evaluation.triggered.len(), 1);
        assert!(session.alerts().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_follows_token_count() {
        let (source, session, controller) = controller().await;
        source.set_price(A, Some(1.0));
        source.set_price(B, Some(1.0));
        let controller = Arc::new(controller);
        let runner = tokio::spawn(Arc::clone(&controller).start());

        time::sleep(Duration::from_secs(11)).await;
        let while_tracked = source.fetches.load(Ordering::SeqCst);
        assert!(while_tracked >= 4, "expected ticks, saw {} fetches", while_tracked);

        session.remove_token(A).await.unwrap();
        session.remove_token(B).await.unwrap();
        time::sleep(Duration::from_secs(1)).await;
        let after_stop = source.fetches.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), after_stop);

        runner.abort();
    }

    #[tokio::test]
    async fn test_cycle_picks_up_tokens_added_elsewhere() {
        let tokens = Arc::new(MemoryTokenStore::default());
        let session = Arc::new(DashboardSession::new(
            FeatureFlags::default(),
            1000,
            tokens.clone(),
            Arc::new(MemoryAlertStore::default()),
        ));
        let source = Arc::new(ScriptedMarketData::default());
        source.set_price(A, Some(0.2));
        let controller =
            PollCycleController::new(Arc::clone(&session), source.clone(), Duration::from_secs(5));

        tokens.add(A).await.unwrap();
        let report = controller.run_cycle().await.unwrap();

        assert_eq!(report.fetched, 1);
        assert!(session.is_tracked(A).await);
        assert_eq!(*session.watch_token_count().borrow(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timer_restarts_for_external_add() {
        let tokens = Arc::new(MemoryTokenStore::default());
        let session = Arc::new(DashboardSession::new(
            FeatureFlags::default(),
            1000,
            tokens.clone(),
            Arc::new(MemoryAlertStore::default()),
        ));
        let source = Arc::new(ScriptedMarketData::default());
        source.set_price(A, Some(1.0));
        let controller = Arc::new(PollCycleController::new(
            Arc::clone(&session),
            source.clone(),
            Duration::from_secs(5),
        ));
        let runner = tokio::spawn(Arc::clone(&controller).start());

        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);

        tokens.add(A).await.unwrap();
        time::sleep(Duration::from_secs(12)).await;
        assert!(session.is_tracked(A).await);
        assert!(source.fetches.load(Ordering::SeqCst) >= 1);

        runner.abort();
    }
}
