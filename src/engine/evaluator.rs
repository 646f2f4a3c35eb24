//! Threshold-crossing evaluation of pending alerts against polled prices.

use super::reconciler::AlertReconciler;
use crate::types::{is_valid_price, Alert, HistoryItem, HistoryKind, NewHistoryItem, PriceObservation};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Tolerance for the bootstrap case where an alert has no previous price.
pub const BOOTSTRAP_EPSILON: f64 = 1e-8;

/// Whether moving from `last_price` to `price` crosses `target`.
///
/// Without a previous observation only a near-exact hit counts. Otherwise the
/// target must lie between the two samples, inclusive of the new one, in
/// either direction.
pub fn has_crossed(last_price: Option<f64>, price: f64, target: f64) -> bool {
    match last_price {
        None => {
            // Allow for representation error on top of the epsilon itself.
            let slack = f64::EPSILON * price.abs().max(target.abs());
            (price - target).abs() <= BOOTSTRAP_EPSILON + slack
        }
        Some(last) => (last < target && price >= target) || (last > target && price <= target),
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    pub triggered: Vec<(Alert, HistoryItem)>,
    pub updated: usize,
    pub failures: usize,
    /// Set when there were no pending alerts at all.
    pub short_circuited: bool,
}

impl EvaluationReport {
    fn short_circuit() -> Self {
        Self {
            short_circuited: true,
            ..Default::default()
        }
    }
}

pub struct AlertEvaluator;

impl AlertEvaluator {
    /// Check every pending alert for the tokens in `batch`.
    ///
    /// The alert cache is reloaded from the store at the start of every pass
    /// so alerts created or deleted by other clients are picked up. If the
    /// reload fails the last good cache is used. Store failures are logged
    /// and skipped so one bad write never aborts the rest of the batch. Each
    /// candidate is looked up again in the reconciled cache before acting, so
    /// an alert another path already deleted is not acted on twice.
    pub async fn evaluate(
        reconciler: &mut AlertReconciler,
        batch: &[PriceObservation],
    ) -> EvaluationReport {
        if let Err(e) = reconciler.refresh_alerts().await {
            if !reconciler.has_cache() {
                warn!("⚠️ could not load alerts, skipping evaluation: {}", e);
                return EvaluationReport::short_circuit();
            }
            warn!("⚠️ alert reload failed, evaluating cached alerts: {}", e);
        }
        if reconciler.alerts().is_empty() {
            return EvaluationReport::short_circuit();
        }

        let mut report = EvaluationReport::default();

        for observation in batch {
            let Some(price) = observation.price.filter(|p| is_valid_price(*p)) else {
                continue;
            };

            let candidate_ids: Vec<String> = reconciler
                .pending_for(&observation.address)
                .into_iter()
                .map(|a| a.id)
                .collect();

            for id in candidate_ids {
                let Some(alert) = reconciler.find_alert(&id).cloned() else {
                    debug!("alert {} no longer pending, skipping", id);
                    continue;
                };

                if has_crossed(alert.last_price, price, alert.target_price) {
                    Self::trigger(reconciler, alert, price, &mut report).await;
                } else {
                    match reconciler.update_last_price(&alert.id, price).await {
                        Ok(_) => report.updated += 1,
                        Err(e) if e.is_not_found() => {
                            debug!("alert {} vanished before last-price update", alert.id);
                            Self::resync(reconciler).await;
                        }
                        Err(e) => {
                            warn!("⚠️ last-price update for alert {} failed: {}", alert.id, e);
                            report.failures += 1;
                        }
                    }
                }
            }
        }

        report
    }

    async fn trigger(
        reconciler: &mut AlertReconciler,
        alert: Alert,
        price: f64,
        report: &mut EvaluationReport,
    ) {
        // The history record goes first; if it cannot be written the alert
        // stays pending and is re-checked next cycle.
        let known_ids: HashSet<String> = reconciler
            .history()
            .history
            .iter()
            .map(|h| h.id.clone())
            .collect();
        let book = match reconciler
            .append_history(NewHistoryItem::triggered_by(&alert, price))
            .await
        {
            Ok(book) => book,
            Err(e) => {
                warn!(
                    "⚠️ history append for alert {} failed, leaving it pending: {}",
                    alert.id, e
                );
                report.failures += 1;
                return;
            }
        };

        let history = book
            .history
            .iter()
            .find(|h| !known_ids.contains(&h.id))
            .or_else(|| {
                book.history.iter().find(|h| {
                    h.token_address == alert.token_address && h.kind == HistoryKind::PriceAlert
                })
            })
            .cloned();

        match reconciler.delete_alert(&alert.id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                debug!("alert {} already deleted elsewhere", alert.id);
                Self::resync(reconciler).await;
            }
            Err(e) => {
                warn!("⚠️ triggered alert {} could not be deleted: {}", alert.id, e);
                report.failures += 1;
            }
        }

        info!(
            "🚨 {} crossed {} (now {})",
            alert.token_symbol, alert.target_price, price
        );
        match history {
            Some(history) => report.triggered.push((alert, history)),
            None => warn!(
                "⚠️ history record for alert {} missing from store response",
                alert.id
            ),
        }
    }

    /// Reload after the store reported an alert we still cached as missing.
    async fn resync(reconciler: &mut AlertReconciler) {
        match reconciler.refresh_alerts().await {
            Ok(alerts) => debug!("alert cache reloaded, {} pending", alerts.len()),
            Err(e) => warn!("⚠️ alert reload after stale entry failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::MemoryAlertStore;
    use crate::types::NewAlert;
    use std::sync::Arc;

    const ADDR: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";
    const OTHER: &str = "HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3";

    fn observation(address: &str, price: Option<f64>) -> PriceObservation {
        PriceObservation {
            address: address.to_string(),
            price,
        }
    }

    async fn reconciler_with(targets: &[(&str, f64)]) -> (Arc<MemoryAlertStore>, AlertReconciler) {
        let store = Arc::new(MemoryAlertStore::default());
        let mut reconciler = AlertReconciler::new(store.clone());
        for (address, target) in targets {
            reconciler
                .create_alert(NewAlert {
                    token_address: address.to_string(),
                    token_symbol: Some("JUP".to_string()),
                    target_price: *target,
                })
                .await
                .unwrap();
        }
        (store, reconciler)
    }

    #[test]
    fn test_crossing_directions() {
        assert!(has_crossed(Some(0.9), 1.1, 1.0));
        assert!(has_crossed(Some(1.1), 0.95, 1.0));
        assert!(!has_crossed(Some(0.8), 0.85, 1.0));
        assert!(!has_crossed(Some(1.2), 1.1, 1.0));
        assert!(has_crossed(Some(0.9), 1.0, 1.0));
        // Sitting exactly on the target is not a crossing.
        assert!(!has_crossed(Some(1.0), 1.2, 1.0));
    }

    #[test]
    fn test_bootstrap_equality() {
        assert!(has_crossed(None, 1.000_000_00, 1.000_000_01));
        assert!(!has_crossed(None, 1.001, 1.0));
        assert!(!has_crossed(None, 0.5, 1.0));
    }

    #[tokio::test]
    async fn test_upward_cross_triggers_and_deletes() {
        let (store, mut reconciler) = reconciler_with(&[(ADDR, 1.0)]).await;
        let id = reconciler.alerts()[0].id.clone();
        reconciler.update_last_price(&id, 0.9).await.unwrap();

        let report = AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(1.1))]).await;

        assert_eq!(report.triggered.len(), 1);
        let (alert, history) = &report.triggered[0];
        assert_eq!(alert.id, id);
        assert_eq!(history.actual_price, 1.1);
        assert_eq!(history.target_price, 1.0);
        assert!(reconciler.alerts().is_empty());
        assert_eq!(reconciler.history().unread_count, 1);
        assert!(store.snapshot().await.alerts.is_empty());

        // One-shot: a second pass has nothing to trigger.
        let again = AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(0.5))]).await;
        assert!(again.short_circuited);
        assert!(again.triggered.is_empty());
    }

    #[tokio::test]
    async fn test_no_cross_records_last_price() {
        let (_store, mut reconciler) = reconciler_with(&[(ADDR, 1.0)]).await;

        let report =
            AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(1.001))]).await;

        assert!(report.triggered.is_empty());
        assert_eq!(report.updated, 1);
        assert_eq!(reconciler.alerts()[0].last_price, Some(1.001));

        let report = AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(0.99))]).await;
        assert_eq!(report.triggered.len(), 1);
    }

    #[tokio::test]
    async fn test_only_matching_token_and_valid_prices_are_checked() {
        let (_store, mut reconciler) = reconciler_with(&[(ADDR, 1.0), (OTHER, 5.0)]).await;

        let report = AlertEvaluator::evaluate(
            &mut reconciler,
            &[
                observation(ADDR, None),
                observation(ADDR, Some(f64::NAN)),
                observation(OTHER, Some(4.0)),
            ],
        )
        .await;

        assert_eq!(report.updated, 1);
        let by_address = |address: &str| {
            reconciler
                .alerts()
                .iter()
                .find(|a| a.token_address == address)
                .and_then(|a| a.last_price)
        };
        assert_eq!(by_address(ADDR), None);
        assert_eq!(by_address(OTHER), Some(4.0));
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let (store, mut reconciler) = reconciler_with(&[(ADDR, 1.0), (OTHER, 5.0)]).await;
        store.set_failing(true);

        let report = AlertEvaluator::evaluate(
            &mut reconciler,
            &[observation(ADDR, Some(2.0)), observation(OTHER, Some(4.0))],
        )
        .await;

        assert_eq!(report.failures, 2);
        assert_eq!(report.updated, 0);
        assert_eq!(reconciler.alerts().len(), 2);
        assert!(reconciler.alerts().iter().all(|a| a.last_price.is_none()));
    }

    #[tokio::test]
    async fn test_history_failure_leaves_alert_pending() {
        let (store, mut reconciler) = reconciler_with(&[(ADDR, 1.0)]).await;
        let id = reconciler.alerts()[0].id.clone();
        reconciler.update_last_price(&id, 0.9).await.unwrap();
        store.fail_history(true);

        let report = AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(1.2))]).await;
        assert!(report.triggered.is_empty());
        assert_eq!(report.failures, 1);
        assert_eq!(store.snapshot().await.alerts.len(), 1);

        store.fail_history(false);
        let report = AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(1.2))]).await;
        assert_eq!(report.triggered.len(), 1);
    }

    #[tokio::test]
    async fn test_alert_deleted_elsewhere_is_not_acted_on() {
        let (store, mut reconciler) = reconciler_with(&[(ADDR, 1.0), (ADDR, 2.0)]).await;
        for id in reconciler.alerts().iter().map(|a| a.id.clone()).collect::<Vec<_>>() {
            reconciler.update_last_price(&id, 0.5).await.unwrap();
        }
        // Another client removes the 2.0 alert between cycles.
        let stale_id = reconciler
            .alerts()
            .iter()
            .find(|a| a.target_price == 2.0)
            .map(|a| a.id.clone())
            .unwrap();
        store.remove_directly(&stale_id).await;

        let report = AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(3.0))]).await;

        assert_eq!(report.triggered.len(), 1);
        assert_eq!(report.triggered[0].0.target_price, 1.0);
        assert_eq!(store.snapshot().await.history.len(), 1);
        assert!(reconciler.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_short_circuits() {
        let (store, mut reconciler) = reconciler_with(&[]).await;
        let report = AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(1.0))]).await;
        assert!(report.short_circuited);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_alerts_replaced_elsewhere_are_evaluated() {
        let (store, mut reconciler) = reconciler_with(&[(ADDR, 5.0)]).await;
        let old_id = reconciler.alerts()[0].id.clone();
        store.remove_directly(&old_id).await;
        store
            .insert_directly(NewAlert {
                token_address: ADDR.to_string(),
                token_symbol: Some("JUP".to_string()),
                target_price: 1.0,
            })
            .await;

        let mut triggered = Vec::new();
        for price in [0.9, 1.1, 0.9, 1.1] {
            let report =
                AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(price))]).await;
            triggered.extend(report.triggered);
        }

        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].0.target_price, 1.0);
        assert!(store.snapshot().await.alerts.is_empty());
        assert!(reconciler.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_reloads_stale_cache() {
        let (store, mut reconciler) = reconciler_with(&[(ADDR, 5.0)]).await;
        let old_id = reconciler.alerts()[0].id.clone();
        reconciler.update_last_price(&old_id, 0.9).await.unwrap();
        store.remove_directly(&old_id).await;
        store
            .insert_directly(NewAlert {
                token_address: ADDR.to_string(),
                token_symbol: Some("JUP".to_string()),
                target_price: 1.0,
            })
            .await;
        // The pass starts on the stale cache because the reload fails.
        store.fail_next_read();

        let report = AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(0.95))]).await;

        assert_eq!(report.updated, 0);
        assert_eq!(report.failures, 0);
        assert_eq!(reconciler.alerts().len(), 1);
        assert_eq!(reconciler.alerts()[0].target_price, 1.0);
        assert!(reconciler.find_alert(&old_id).is_none());
    }

    #[tokio::test]
    async fn test_triggered_history_is_the_stored_record() {
        let (store, mut reconciler) = reconciler_with(&[(ADDR, 1.0), (ADDR, 2.0)]).await;
        let ids: Vec<String> = reconciler.alerts().iter().map(|a| a.id.clone()).collect();
        for id in &ids {
            reconciler.update_last_price(id, 0.5).await.unwrap();
        }

        let report = AlertEvaluator::evaluate(&mut reconciler, &[observation(ADDR, Some(3.0))]).await;

        assert_eq!(report.triggered.len(), 2);
        let stored = store.snapshot().await.history;
        for (alert, history) in &report.triggered {
            assert!(!history.id.is_empty());
            let record = stored.iter().find(|h| h.id == history.id).unwrap();
            assert_eq!(record.target_price, alert.target_price);
            assert_eq!(history.target_price, alert.target_price);
        }
        assert_ne!(report.triggered[0].1.id, report.triggered[1].1.id);
    }
}
