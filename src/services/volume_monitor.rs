//! Five-minute volume spike watcher.
//!
//! Each pass compares a token's current 5m volume with the value seen on
//! the previous pass. A jump of at least `spike_ratio`× is announced on
//! Telegram and recorded in the alert history as a `volume_spike` item.

use super::market_data::MarketDataSource;
use super::notifier::TelegramNotifier;
use crate::config::VolumeMonitorConfig;
use crate::storage::{AlertStore, TokenListStore};
use crate::types::{HistoryKind, NewHistoryItem, MIN_ADDRESS_LEN, UNKNOWN_SYMBOL};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSpike {
    pub address: String,
    pub symbol: String,
    pub previous: f64,
    pub current: f64,
    pub percent: f64,
    pub notified: bool,
    pub recorded: bool,
}

pub struct VolumeMonitor {
    tokens: Arc<dyn TokenListStore>,
    history: Arc<dyn AlertStore>,
    source: Arc<dyn MarketDataSource>,
    notifier: TelegramNotifier,
    interval: Duration,
    spike_ratio: f64,
    previous: HashMap<String, f64>,
}

impl VolumeMonitor {
    pub fn new(
        config: &VolumeMonitorConfig,
        tokens: Arc<dyn TokenListStore>,
        history: Arc<dyn AlertStore>,
        source: Arc<dyn MarketDataSource>,
        notifier: TelegramNotifier,
    ) -> Self {
        Self {
            tokens,
            history,
            source,
            notifier,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            spike_ratio: config.spike_ratio,
            previous: HashMap::new(),
        }
    }

    pub async fn start(mut self) {
        info!(
            "📈 Volume monitor started: every {:?}, spike at {}x",
            self.interval, self.spike_ratio
        );
        if !self.notifier.is_configured() {
            warn!("⚠️ Telegram not configured, spikes will only be recorded in history");
        }

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let spikes = self.check_once().await;
            if !spikes.is_empty() {
                info!("⚡ {} volume spike(s) this pass", spikes.len());
            }
        }
    }

    /// One pass over the tracked tokens.
    pub async fn check_once(&mut self) -> Vec<VolumeSpike> {
        let addresses: Vec<String> = match self.tokens.list().await {
            Ok(tokens) => tokens
                .into_iter()
                .map(|t| t.address)
                .filter(|a| a.len() >= MIN_ADDRESS_LEN)
                .collect(),
            Err(e) => {
                error!("❌ Volume monitor could not load tokens: {}", e);
                return Vec::new();
            }
        };

        let mut spikes = Vec::new();
        for address in addresses {
            let snapshot = match self.source.fetch(&address).await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => continue,
                Err(e) => {
                    debug!("volume fetch failed for {}: {}", address, e);
                    continue;
                }
            };

            let current = match snapshot.volume_5m {
                Some(v) if v.is_finite() && v > 0.0 => v,
                _ => continue,
            };

            let previous = self.previous.insert(address.clone(), current);
            debug!(
                "checking {} | 5m vol: {} | prev: {:?}",
                snapshot.symbol, current, previous
            );

            let Some(percent) = spike_percent(previous, current, self.spike_ratio) else {
                continue;
            };

            info!("⚡ Volume spike on {} (+{:.0}%)", snapshot.symbol, percent);

            let message = spike_message(&snapshot.symbol, snapshot.market_cap, current, percent);
            let notified = self.notifier.send(&message).await;

            let item = NewHistoryItem {
                token_address: address.clone(),
                token_symbol: snapshot.symbol.clone(),
                target_price: 0.0,
                actual_price: snapshot.price_usd.unwrap_or(0.0),
                kind: HistoryKind::VolumeSpike,
                note: Some(format!("5m Vol Spike +{:.0}%", percent)),
            };
            let recorded = match self.history.add_history(item).await {
                Ok(_) => true,
                Err(e) => {
                    warn!("⚠️ Failed to record volume spike for {}: {}", address, e);
                    false
                }
            };

            spikes.push(VolumeSpike {
                address,
                symbol: snapshot.symbol,
                previous: previous.unwrap_or_default(),
                current,
                percent,
                notified,
                recorded,
            });
        }

        spikes
    }
}

/// Percent increase when `current` is a spike over `previous`.
pub fn spike_percent(previous: Option<f64>, current: f64, ratio: f64) -> Option<f64> {
    let previous = previous.filter(|p| *p > 0.0)?;
    if current < ratio * previous {
        return None;
    }
    Some((current / previous - 1.0) * 100.0)
}

/// Compact dollar amount: `1.2b`, `3.4m`, `5.6k`, `78.0`.
pub fn format_volume(value: f64) -> String {
    if value.is_nan() {
        return "0".to_string();
    }
    let value = value.max(0.0);

    if value >= 1e9 {
        format!("{:.1}b", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.1}m", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.1}k", value / 1e3)
    } else {
        format!("{:.1}", value)
    }
}

pub fn spike_message(symbol: &str, market_cap: Option<f64>, volume: f64, percent: f64) -> String {
    let symbol = if symbol.is_empty() { UNKNOWN_SYMBOL } else { symbol };
    let mcap = market_cap
        .map(format_volume)
        .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string());

    format!(
        "⚡${} 5m Volume Spike\nMcap: ${}\n5m Vol: ${} (+{:.0}%)",
        symbol,
        mcap,
        format_volume(volume),
        percent
    )
}
