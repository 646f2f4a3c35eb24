use super::models::{Alert, HistoryItem, MarketSnapshot, TrackedToken};
use crate::engine::timeframe::TimeframeView;
use serde::{Deserialize, Serialize};

/// Events the engine emits towards a presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DashboardEvent {
    PriceUpdated {
        address: String,
        snapshot: Option<MarketSnapshot>,
        degraded: bool,
        chart: Option<TimeframeView>,
    },
    AlertTriggered {
        alert: Alert,
        history: HistoryItem,
    },
    HistoryChanged {
        unread_count: u32,
    },
    AlertsChanged {
        alerts: Vec<Alert>,
    },
    TokensChanged {
        tokens: Vec<TrackedToken>,
    },
}

impl DashboardEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardEvent::PriceUpdated { .. } => "price_updated",
            DashboardEvent::AlertTriggered { .. } => "alert_triggered",
            DashboardEvent::HistoryChanged { .. } => "history_changed",
            DashboardEvent::AlertsChanged { .. } => "alerts_changed",
            DashboardEvent::TokensChanged { .. } => "tokens_changed",
        }
    }

    /// Address the event concerns, if it is about a single token.
    pub fn address(&self) -> Option<&str> {
        match self {
            DashboardEvent::PriceUpdated { address, .. } => Some(address),
            DashboardEvent::AlertTriggered { alert, .. } => Some(&alert.token_address),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = DashboardEvent::HistoryChanged { unread_count: 3 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "history_changed");
        assert_eq!(json["data"]["unread_count"], 3);
        assert_eq!(event.kind(), "history_changed");
        assert!(event.address().is_none());
    }
}
