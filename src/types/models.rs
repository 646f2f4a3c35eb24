use serde::{Deserialize, Serialize};

/// Address length bounds accepted by the token list and alert stores.
pub const MIN_ADDRESS_LEN: usize = 20;
pub const MAX_ADDRESS_LEN: usize = 66;

/// Cap on stored history items; older entries are dropped first.
pub const HISTORY_CAP: usize = 500;

/// Placeholder symbol for tokens the market API has not named yet.
pub const UNKNOWN_SYMBOL: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedToken {
    pub address: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub token_address: String,
    #[serde(default)]
    pub token_symbol: String,
    pub target_price: f64,
    /// Epoch seconds.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub token_address: String,
    #[serde(default)]
    pub token_symbol: Option<String>,
    pub target_price: f64,
}

/// The history `type` tag. Tags this crate does not produce are kept verbatim
/// so a rewrite of the alert file preserves them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HistoryKind {
    #[default]
    PriceAlert,
    VolumeSpike,
    Other(String),
}

impl HistoryKind {
    pub fn as_str(&self) -> &str {
        match self {
            HistoryKind::PriceAlert => "price_alert",
            HistoryKind::VolumeSpike => "volume_spike",
            HistoryKind::Other(tag) => tag,
        }
    }
}

impl From<String> for HistoryKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "price_alert" => HistoryKind::PriceAlert,
            "volume_spike" => HistoryKind::VolumeSpike,
            _ => HistoryKind::Other(tag),
        }
    }
}

impl From<HistoryKind> for String {
    fn from(kind: HistoryKind) -> Self {
        match kind {
            HistoryKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub token_address: String,
    #[serde(default)]
    pub token_symbol: String,
    #[serde(default)]
    pub target_price: f64,
    #[serde(default)]
    pub actual_price: f64,
    /// Epoch seconds.
    pub triggered_at: i64,
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "type", default)]
    pub kind: HistoryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryItem {
    pub token_address: String,
    #[serde(default)]
    pub token_symbol: String,
    #[serde(default)]
    pub target_price: f64,
    #[serde(default)]
    pub actual_price: f64,
    #[serde(rename = "type", default)]
    pub kind: HistoryKind,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewHistoryItem {
    pub fn triggered_by(alert: &Alert, actual_price: f64) -> Self {
        Self {
            token_address: alert.token_address.clone(),
            token_symbol: alert.token_symbol.clone(),
            target_price: alert.target_price,
            actual_price,
            kind: HistoryKind::PriceAlert,
            note: Some(format!("Price crossed ${}", alert.target_price)),
        }
    }
}

/// History log plus its server-maintained unread counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryBook {
    pub history: Vec<HistoryItem>,
    pub unread_count: u32,
}

/// Market data for one token, taken from its deepest-liquidity pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub address: String,
    pub pair_address: Option<String>,
    pub symbol: String,
    pub name: String,
    pub image_url: Option<String>,
    pub price_usd: Option<f64>,
    pub market_cap: Option<f64>,
    pub fdv: Option<f64>,
    pub volume_24h: Option<f64>,
    pub volume_5m: Option<f64>,
    pub liquidity_usd: Option<f64>,
}

/// One token's outcome within a poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub address: String,
    pub price: Option<f64>,
}

pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

pub fn is_valid_address(address: &str) -> bool {
    (MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len())
}
