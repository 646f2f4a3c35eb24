//! Chart projections over the rolling price history.
//!
//! A timeframe is a trailing window of the most recent N samples. Sampling
//! cadence is constant, so a longer window simply means a larger N; there
//! is no resampling or bucketing.

use super::price_history::PriceHistoryStore;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Below this many samples the chart shows a "building" state.
pub const BUILDING_THRESHOLD: usize = 2;

/// Label sparsification adds a midpoint label only above this many points.
const MIDPOINT_LABEL_MIN_POINTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::FiveMinutes,
        Timeframe::FifteenMinutes,
        Timeframe::OneHour,
        Timeframe::FourHours,
        Timeframe::OneDay,
    ];

    /// Number of trailing samples shown, at one sample per 5 seconds.
    pub fn point_budget(self) -> usize {
        match self {
            Timeframe::FiveMinutes => 60,
            Timeframe::FifteenMinutes => 180,
            Timeframe::OneHour => 720,
            Timeframe::FourHours => 2_880,
            Timeframe::OneDay => 17_280,
        }
    }

    pub fn longest() -> Self {
        Timeframe::OneDay
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::FiveMinutes => "5m",
            Timeframe::FifteenMinutes => "15m",
            Timeframe::OneHour => "1h",
            Timeframe::FourHours => "4h",
            Timeframe::OneDay => "1d",
        }
    }

    fn label_format(self) -> &'static str {
        match self {
            Timeframe::FiveMinutes | Timeframe::FifteenMinutes | Timeframe::OneHour => "%H:%M:%S",
            Timeframe::FourHours | Timeframe::OneDay => "%m/%d %H:%M",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown timeframe: {}", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeframeView {
    pub timeframe: Timeframe,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub timestamps: Vec<i64>,
    pub building: bool,
}

impl TimeframeView {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub struct TimeframeProjector;

impl TimeframeProjector {
    pub fn project(
        history: &PriceHistoryStore,
        address: &str,
        timeframe: Timeframe,
    ) -> TimeframeView {
        let samples = history.tail(address, timeframe.point_budget());
        let count = samples.len();
        let format = timeframe.label_format();

        let labels = (0..count)
            .map(|i| {
                if is_labelled_index(i, count) {
                    format_label(samples[i].timestamp, format)
                } else {
                    String::new()
                }
            })
            .collect();

        TimeframeView {
            timeframe,
            labels,
            values: samples.iter().map(|s| s.price).collect(),
            timestamps: samples.iter().map(|s| s.timestamp).collect(),
            building: history.len(address) < BUILDING_THRESHOLD,
        }
    }
}

fn is_labelled_index(index: usize, count: usize) -> bool {
    if count == 0 {
        return false;
    }
    index == 0
        || index == count - 1
        || (count > MIDPOINT_LABEL_MIN_POINTS && index == count / 2)
}

fn format_label(timestamp_ms: i64, format: &str) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm";

    fn store_with(samples: usize) -> PriceHistoryStore {
        let mut store = PriceHistoryStore::new(Timeframe::longest().point_budget());
        let base = 1_700_000_000_000i64;
        for i in 0..samples {
            store.append_at(ADDR, base + i as i64 * 5_000, 1.0 + i as f64);
        }
        store
    }

    #[test]
    fn test_projection_takes_trailing_window() {
        let store = store_with(1000);
        let view = TimeframeProjector::project(&store, ADDR, Timeframe::FiveMinutes);

        assert_eq!(view.len(), 60);
        assert_eq!(view.values[0], 941.0);
        assert_eq!(view.values[59], 1000.0);
        assert_eq!(view.timestamps.len(), 60);
        assert!(!view.building);
    }

    #[test]
    fn test_labels_are_sparse() {
        let store = store_with(1000);
        let view = TimeframeProjector::project(&store, ADDR, Timeframe::FiveMinutes);

        for (i, label) in view.labels.iter().enumerate() {
            if i == 0 || i == 59 || i == 30 {
                assert!(!label.is_empty(), "label {} should be set", i);
            } else {
                assert!(label.is_empty(), "label {} should be empty", i);
            }
        }
    }

    #[test]
    fn test_short_series_has_no_midpoint_label() {
        let store = store_with(4);
        let view = TimeframeProjector::project(&store, ADDR, Timeframe::OneHour);
        assert_eq!(view.len(), 4);
        let labelled: Vec<usize> = view
            .labels
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.is_empty())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(labelled, vec![0, 3]);
    }

    #[test]
    fn test_building_state() {
        let empty = TimeframeProjector::project(&store_with(0), ADDR, Timeframe::FiveMinutes);
        assert!(empty.is_empty());
        assert!(empty.building);

        let single = TimeframeProjector::project(&store_with(1), ADDR, Timeframe::FiveMinutes);
        assert!(single.building);
        assert_eq!(single.labels.len(), 1);
        assert!(!single.labels[0].is_empty());

        let enough = TimeframeProjector::project(&store_with(2), ADDR, Timeframe::FiveMinutes);
        assert!(!enough.building);
    }

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!("1h".parse::<Timeframe>(), Ok(Timeframe::OneHour));
        assert_eq!(" 1D ".parse::<Timeframe>(), Ok(Timeframe::OneDay));
        assert!("2w".parse::<Timeframe>().is_err());
        assert_eq!(Timeframe::FourHours.to_string(), "4h");
        assert!(Timeframe::ALL
            .windows(2)
            .all(|w| w[0].point_budget() < w[1].point_budget()));
    }
}
