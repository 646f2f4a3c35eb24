//! Third-party market data lookups (DexScreener token endpoint).

use crate::error::{DashboardError, DashboardResult};
use crate::types::{is_valid_price, MarketSnapshot, UNKNOWN_SYMBOL};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// `Ok(None)` when the token has no trading pairs.
    async fn fetch(&self, address: &str) -> DashboardResult<Option<MarketSnapshot>>;
}

#[derive(Debug, Deserialize)]
struct DexScreenerResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    pair_address: Option<String>,
    base_token: Option<DexToken>,
    price_usd: Option<String>,
    volume: Option<DexVolume>,
    liquidity: Option<DexLiquidity>,
    fdv: Option<f64>,
    market_cap: Option<f64>,
    info: Option<DexInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DexToken {
    address: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DexVolume {
    h24: Option<f64>,
    m5: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DexLiquidity {
    usd: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexInfo {
    image_url: Option<String>,
}

pub struct DexScreenerClient {
    client: reqwest::Client,
    api_url: String,
}

impl DexScreenerClient {
    pub fn new(api_url: &str, timeout: Duration) -> DashboardResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::Fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    async fn fetch(&self, address: &str) -> DashboardResult<Option<MarketSnapshot>> {
        let url = format!("{}/{}", self.api_url, address);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", "MemecoinDashboard/1.0")
            .send()
            .await
            .map_err(|e| DashboardError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DashboardError::Fetch(format!(
                "market API returned {}",
                response.status()
            )));
        }

        let body: DexScreenerResponse = response
            .json()
            .await
            .map_err(|e| DashboardError::Fetch(format!("bad market API payload: {}", e)))?;

        let snapshot = body
            .pairs
            .and_then(|pairs| select_deepest_pair(pairs))
            .map(|pair| to_snapshot(address, pair));

        if snapshot.is_none() {
            debug!("no trading pairs for {}", address);
        }
        Ok(snapshot)
    }
}

/// The pair with the most USD liquidity; ties keep the earlier pair.
fn select_deepest_pair(pairs: Vec<DexPair>) -> Option<DexPair> {
    let liquidity = |p: &DexPair| p.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);

    pairs.into_iter().fold(None, |best, pair| match best {
        Some(best) if liquidity(&best) >= liquidity(&pair) => Some(best),
        _ => Some(pair),
    })
}

fn to_snapshot(address: &str, pair: DexPair) -> MarketSnapshot {
    let base = pair.base_token.unwrap_or_default();
    let symbol = base
        .symbol
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string());
    let volume = pair.volume.unwrap_or_default();

    MarketSnapshot {
        address: base.address.unwrap_or_else(|| address.to_string()),
        pair_address: pair.pair_address,
        name: base.name.unwrap_or_else(|| symbol.clone()),
        symbol,
        image_url: pair.info.and_then(|i| i.image_url),
        price_usd: pair.price_usd.as_deref().and_then(parse_price_usd),
        market_cap: pair.market_cap,
        fdv: pair.fdv,
        volume_24h: volume.h24,
        volume_5m: volume.m5,
        liquidity_usd: pair.liquidity.and_then(|l| l.usd),
    }
}

/// Parse the API's decimal price string; anything non-positive is dropped.
pub fn parse_price_usd(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .and_then(|d| d.to_f64())
        .filter(|p| is_valid_price(*p))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "pairAddress": "shallow",
                "baseToken": {"address": "Mint111111111111111111111", "name": "Cat Coin", "symbol": "cat"},
                "priceUsd": "0.00100",
                "liquidity": {"usd": 1200.5},
                "volume": {"h24": 10.0, "m5": 1.0}
            },
            {
                "pairAddress": "deep",
                "baseToken": {"address": "Mint111111111111111111111", "name": "Cat Coin", "symbol": " cat "},
                "priceUsd": "0.001234",
                "liquidity": {"usd": 98000.0},
                "volume": {"h24": 450000.0, "m5": 3200.0},
                "fdv": 1234000.0,
                "marketCap": 1100000.0,
                "info": {"imageUrl": "https://cdn.example/cat.png"}
            },
            {
                "pairAddress": "no-liquidity",
                "priceUsd": "0.5"
            }
        ]
    }"#;

    #[test]
    fn test_selects_highest_liquidity_pair() {
        let body: DexScreenerResponse = serde_json::from_str(PAYLOAD).unwrap();
        let pair = select_deepest_pair(body.pairs.unwrap()).unwrap();
        let snapshot = to_snapshot("Mint111111111111111111111", pair);

        assert_eq!(snapshot.pair_address.as_deref(), Some("deep"));
        assert_eq!(snapshot.symbol, "CAT");
        assert_eq!(snapshot.name, "Cat Coin");
        assert_eq!(snapshot.price_usd, Some(0.001234));
        assert_eq!(snapshot.market_cap, Some(1_100_000.0));
        assert_eq!(snapshot.fdv, Some(1_234_000.0));
        assert_eq!(snapshot.volume_24h, Some(450_000.0));
        assert_eq!(snapshot.volume_5m, Some(3200.0));
        assert_eq!(snapshot.image_url.as_deref(), Some("https://cdn.example/cat.png"));
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let snapshot = to_snapshot("addr", DexPair::default());
        assert_eq!(snapshot.symbol, UNKNOWN_SYMBOL);
        assert_eq!(snapshot.address, "addr");
        assert!(snapshot.price_usd.is_none());
    }

    #[test]
    fn test_empty_pairs() {
        let body: DexScreenerResponse = serde_json::from_str(r#"{"pairs": null}"#).unwrap();
        assert!(body.pairs.and_then(select_deepest_pair).is_none());
        assert!(select_deepest_pair(Vec::new()).is_none());
    }

    #[test]
    fn test_parse_price_usd() {
        assert_eq!(parse_price_usd("0.00001234"), Some(0.00001234));
        assert_eq!(parse_price_usd(" 12.5 "), Some(12.5));
        assert_eq!(parse_price_usd("1e-7"), Some(0.0000001));
        assert_eq!(parse_price_usd("0"), None);
        assert_eq!(parse_price_usd("-3"), None);
        assert_eq!(parse_price_usd("n/a"), None);
    }
}
