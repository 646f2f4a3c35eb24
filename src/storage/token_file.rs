//! Tracked token list persisted as a flat JSON document (`config.json`).
//!
//! The file is normalized on every load: invalid entries are dropped,
//! duplicate addresses collapse to their first occurrence, and `order`
//! values are compacted to `0..n`.

use super::json_file;
use super::TokenListStore;
use crate::error::{DashboardError, DashboardResult};
use crate::types::{is_valid_address, TrackedToken, MAX_ADDRESS_LEN, MIN_ADDRESS_LEN};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenConfigDocument {
    #[serde(default)]
    tokens: Vec<Value>,
    /// Any other keys in the file are carried through untouched.
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

pub struct TokenConfigFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TokenConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> DashboardResult<(Vec<TrackedToken>, serde_json::Map<String, Value>)> {
        let doc: TokenConfigDocument = json_file::read_or_default(&self.path).await?;
        Ok((normalize_entries(&doc.tokens), doc.extra))
    }

    async fn save(
        &self,
        tokens: &[TrackedToken],
        extra: serde_json::Map<String, Value>,
    ) -> DashboardResult<()> {
        let doc = TokenConfigDocument {
            tokens: tokens
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?,
            extra,
        };
        json_file::write_atomic(&self.path, &doc).await
    }

    async fn mutate<F>(&self, apply: F) -> DashboardResult<Vec<TrackedToken>>
    where
        F: FnOnce(Vec<TrackedToken>) -> DashboardResult<Vec<TrackedToken>>,
    {
        let _guard = self.write_lock.lock().await;
        let (tokens, extra) = self.load().await?;
        let tokens = apply(tokens)?;
        self.save(&tokens, extra).await?;
        Ok(tokens)
    }
}

#[async_trait]
impl TokenListStore for TokenConfigFile {
    async fn list(&self) -> DashboardResult<Vec<TrackedToken>> {
        Ok(self.load().await?.0)
    }

    async fn add(&self, address: &str) -> DashboardResult<Vec<TrackedToken>> {
        let address = address.trim().to_string();
        let tokens = self.mutate(|tokens| add_token(tokens, &address)).await?;
        info!("➕ tracking {} ({} tokens)", address, tokens.len());
        Ok(tokens)
    }

    async fn remove(&self, address: &str) -> DashboardResult<Vec<TrackedToken>> {
        let address = address.trim().to_string();
        let tokens = self.mutate(|tokens| Ok(remove_token(tokens, &address))).await?;
        info!("➖ untracked {} ({} tokens)", address, tokens.len());
        Ok(tokens)
    }

    async fn reorder(&self, addresses: &[String]) -> DashboardResult<Vec<TrackedToken>> {
        self.mutate(|tokens| Ok(reorder_tokens(tokens, addresses)))
            .await
    }
}

/// Turn raw file entries into a dense, de-duplicated token list.
///
/// Entries may be bare address strings or `{address, order}` objects.
/// Entries without a usable `order` sort after ordered ones, in file order.
pub fn normalize_entries(entries: &[Value]) -> Vec<TrackedToken> {
    let mut candidates: Vec<(u64, usize, String)> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let (address, order) = match entry {
                Value::String(address) => (address.as_str(), None),
                Value::Object(map) => (
                    map.get("address")?.as_str()?,
                    map.get("order").and_then(Value::as_u64),
                ),
                _ => return None,
            };
            let address = address.trim();
            is_valid_address(address).then(|| (order.unwrap_or(u64::MAX), index, address.to_string()))
        })
        .collect();

    candidates.sort_by_key(|(order, index, _)| (*order, *index));

    let mut seen = HashSet::new();
    let addresses = candidates
        .into_iter()
        .map(|(_, _, address)| address)
        .filter(|address| seen.insert(address.clone()));

    renumber(addresses)
}

pub fn add_token(tokens: Vec<TrackedToken>, address: &str) -> DashboardResult<Vec<TrackedToken>> {
    if !is_valid_address(address) {
        return Err(DashboardError::validation(format!(
            "address must be {}-{} characters",
            MIN_ADDRESS_LEN, MAX_ADDRESS_LEN
        )));
    }
    if tokens.iter().any(|t| t.address == address) {
        return Err(DashboardError::Duplicate(address.to_string()));
    }

    let mut tokens = tokens;
    let order = tokens.len() as u32;
    tokens.push(TrackedToken {
        address: address.to_string(),
        order,
    });
    Ok(tokens)
}

pub fn remove_token(tokens: Vec<TrackedToken>, address: &str) -> Vec<TrackedToken> {
    renumber(
        tokens
            .into_iter()
            .filter(|t| t.address != address)
            .map(|t| t.address),
    )
}

/// Listed addresses first in the requested order, then everything else in
/// its previous relative order. Unknown or repeated addresses are ignored.
pub fn reorder_tokens(tokens: Vec<TrackedToken>, requested: &[String]) -> Vec<TrackedToken> {
    let tracked: HashSet<&str> = tokens.iter().map(|t| t.address.as_str()).collect();
    let mut placed = HashSet::new();

    let mut ordered: Vec<String> = requested
        .iter()
        .map(|address| address.trim())
        .filter(|address| tracked.contains(address))
        .filter(|address| placed.insert(address.to_string()))
        .map(str::to_string)
        .collect();

    ordered.extend(
        tokens
            .iter()
            .filter(|t| !placed.contains(&t.address))
            .map(|t| t.address.clone()),
    );

    renumber(ordered)
}

/// Split a comma-separated `addresses` query value.
pub fn parse_address_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

fn renumber(addresses: impl IntoIterator<Item = String>) -> Vec<TrackedToken> {
    addresses
        .into_iter()
        .enumerate()
        .map(|(order, address)| TrackedToken {
            address,
            order: order as u32,
        })
        .collect()
}
