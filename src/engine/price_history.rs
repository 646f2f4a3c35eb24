//! Rolling per-token price history.
//!
//! Session-local only: nothing here survives a restart and nothing reads it
//! as a source of truth. Each token keeps a FIFO window of samples capped at
//! `max_samples`.

use crate::types::{is_valid_price, PriceSample};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct PriceHistoryStore {
    series: HashMap<String, VecDeque<PriceSample>>,
    max_samples: usize,
}

impl PriceHistoryStore {
    pub fn new(max_samples: usize) -> Self {
        Self {
            series: HashMap::new(),
            max_samples: max_samples.max(1),
        }
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Record `price` at the current wall-clock time.
    pub fn append(&mut self, address: &str, price: f64) -> bool {
        self.append_at(address, Utc::now().timestamp_millis(), price)
    }

    /// Record a sample; non-finite or non-positive prices are ignored.
    ///
    /// A timestamp earlier than the newest retained sample is clamped up to it,
    /// keeping the series non-decreasing even if the clock steps backwards.
    pub fn append_at(&mut self, address: &str, timestamp: i64, price: f64) -> bool {
        if !is_valid_price(price) {
            return false;
        }

        let series = self.series.entry(address.to_string()).or_default();
        let timestamp = match series.back() {
            Some(last) if last.timestamp > timestamp => last.timestamp,
            _ => timestamp,
        };

        series.push_back(PriceSample { timestamp, price });
        while series.len() > self.max_samples {
            series.pop_front();
        }
        true
    }

    /// Retained samples, oldest first.
    pub fn get(&self, address: &str) -> Vec<PriceSample> {
        self.series
            .get(address)
            .map(|series| series.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The trailing `count` samples, oldest first.
    pub fn tail(&self, address: &str, count: usize) -> Vec<PriceSample> {
        match self.series.get(address) {
            Some(series) => {
                let skip = series.len().saturating_sub(count);
                series.iter().skip(skip).copied().collect()
            }
            None => Vec::new(),
        }
    }

    pub fn latest(&self, address: &str) -> Option<PriceSample> {
        self.series.get(address).and_then(|series| series.back().copied())
    }

    pub fn len(&self, address: &str) -> usize {
        self.series.get(address).map_or(0, VecDeque::len)
    }

    pub fn clear(&mut self, address: &str) {
        self.series.remove(address);
    }

    /// Drop series for addresses no longer tracked.
    pub fn retain_addresses<'a>(&mut self, tracked: impl IntoIterator<Item = &'a str>) {
        let keep: std::collections::HashSet<&str> = tracked.into_iter().collect();
        self.series.retain(|address, _| keep.contains(address.as_str()));
    }
}

impl Default for PriceHistoryStore {
    fn default() -> Self {
        Self::new(super::timeframe::Timeframe::longest().point_budget())
    }
}
