use super::models::{Alert, HistoryBook, HistoryItem, TrackedToken};
use serde::{Deserialize, Serialize};

/// `{ok, ...payload | error}` envelope shared by both persistence endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<TrackedToken>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u32>,
}

impl StoreResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_tokens(tokens: Vec<TrackedToken>) -> Self {
        Self {
            ok: true,
            tokens: Some(tokens),
            ..Default::default()
        }
    }

    pub fn with_alerts(alerts: Vec<Alert>) -> Self {
        Self {
            ok: true,
            alerts: Some(alerts),
            ..Default::default()
        }
    }

    pub fn with_history(book: HistoryBook) -> Self {
        Self {
            ok: true,
            history: Some(book.history),
            unread_count: Some(book.unread_count),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
    pub address: Option<String>,
    /// Comma-separated address list for `reorder`.
    pub addresses: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionalIdRequest {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLastPriceRequest {
    pub id: String,
    pub last_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTokenRequest {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeRequest {
    pub timeframe: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub timeframe: Option<String>,
}
