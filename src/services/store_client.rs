//! HTTP implementations of the store traits, talking to a remote
//! persistence server (`/tokens.php` and `/api.php`).

use crate::error::{DashboardError, DashboardResult};
use crate::storage::{AlertStore, TokenListStore};
use crate::types::{
    Alert, HistoryBook, IdRequest, NewAlert, NewHistoryItem, OptionalIdRequest, StoreResponse,
    TrackedToken, UpdateLastPriceRequest,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub struct HttpStoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStoreClient {
    pub fn new(base_url: &str, timeout: Duration) -> DashboardResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::remote(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self) -> String {
        format!("{}/api.php", self.base_url)
    }

    fn tokens_url(&self) -> String {
        format!("{}/tokens.php", self.base_url)
    }

    async fn api_get(&self, action: &str) -> DashboardResult<StoreResponse> {
        let request = self.client.get(self.api_url()).query(&[("action", action)]);
        send(request).await
    }

    async fn api_post<B: Serialize + Sync>(
        &self,
        action: &str,
        body: &B,
    ) -> DashboardResult<StoreResponse> {
        let request = self
            .client
            .post(self.api_url())
            .query(&[("action", action)])
            .json(body);
        send(request).await
    }

    async fn token_action(&self, query: &[(&str, &str)]) -> DashboardResult<Vec<TrackedToken>> {
        let request = self.client.post(self.tokens_url()).query(query);
        tokens_of(send(request).await?)
    }
}

async fn send(request: RequestBuilder) -> DashboardResult<StoreResponse> {
    let response = request.send().await?;
    let status = response.status();

    let body: StoreResponse = response.json().await.map_err(|e| {
        DashboardError::remote(format!("unreadable store response ({}): {}", status, e))
    })?;

    if body.ok {
        return Ok(body);
    }

    let message = body
        .error
        .unwrap_or_else(|| format!("store request failed with {}", status));
    debug!("store rejected request: {} {}", status, message);

    Err(match status {
        StatusCode::NOT_FOUND => DashboardError::NotFound(message),
        StatusCode::BAD_REQUEST => DashboardError::Validation(message),
        StatusCode::CONFLICT => DashboardError::Duplicate(message),
        _ => DashboardError::Remote(message),
    })
}

fn tokens_of(response: StoreResponse) -> DashboardResult<Vec<TrackedToken>> {
    response
        .tokens
        .ok_or_else(|| DashboardError::remote("store response missing tokens"))
}

fn alerts_of(response: StoreResponse) -> DashboardResult<Vec<Alert>> {
    response
        .alerts
        .ok_or_else(|| DashboardError::remote("store response missing alerts"))
}

fn history_of(response: StoreResponse) -> DashboardResult<HistoryBook> {
    let history = response
        .history
        .ok_or_else(|| DashboardError::remote("store response missing history"))?;
    let unread_count = response
        .unread_count
        .unwrap_or_else(|| history.iter().filter(|h| !h.read).count() as u32);

    Ok(HistoryBook {
        history,
        unread_count,
    })
}

#[async_trait]
impl AlertStore for HttpStoreClient {
    async fn get_alerts(&self) -> DashboardResult<Vec<Alert>> {
        alerts_of(self.api_get("getAlerts").await?)
    }

    async fn save_alert(&self, alert: NewAlert) -> DashboardResult<Vec<Alert>> {
        alerts_of(self.api_post("saveAlert", &alert).await?)
    }

    async fn delete_alert(&self, id: &str) -> DashboardResult<Vec<Alert>> {
        let body = IdRequest { id: id.to_string() };
        alerts_of(self.api_post("deleteAlert", &body).await?)
    }

    async fn update_alert_last_price(
        &self,
        id: &str,
        last_price: f64,
    ) -> DashboardResult<Vec<Alert>> {
        let body = UpdateLastPriceRequest {
            id: id.to_string(),
            last_price,
        };
        alerts_of(self.api_post("updateAlertLastPrice", &body).await?)
    }

    async fn get_history(&self) -> DashboardResult<HistoryBook> {
        history_of(self.api_get("getHistory").await?)
    }

    async fn add_history(&self, item: NewHistoryItem) -> DashboardResult<HistoryBook> {
        history_of(self.api_post("addHistory", &item).await?)
    }

    async fn mark_history_read(&self, id: Option<&str>) -> DashboardResult<HistoryBook> {
        let body = OptionalIdRequest {
            id: id.map(str::to_string),
        };
        history_of(self.api_post("markHistoryRead", &body).await?)
    }

    async fn delete_history_item(&self, id: &str) -> DashboardResult<HistoryBook> {
        let body = IdRequest { id: id.to_string() };
        history_of(self.api_post("deleteHistoryItem", &body).await?)
    }

    async fn clear_all_history(&self) -> DashboardResult<HistoryBook> {
        history_of(self.api_post("clearAllHistory", &serde_json::json!({})).await?)
    }
}

#[async_trait]
impl TokenListStore for HttpStoreClient {
    async fn list(&self) -> DashboardResult<Vec<TrackedToken>> {
        tokens_of(send(self.client.get(self.tokens_url())).await?)
    }

    async fn add(&self, address: &str) -> DashboardResult<Vec<TrackedToken>> {
        self.token_action(&[("action", "add"), ("address", address)])
            .await
    }

    async fn remove(&self, address: &str) -> DashboardResult<Vec<TrackedToken>> {
        self.token_action(&[("action", "remove"), ("address", address)])
            .await
    }

    async fn reorder(&self, addresses: &[String]) -> DashboardResult<Vec<TrackedToken>> {
        let joined = addresses.join(",");
        self.token_action(&[("action", "reorder"), ("addresses", joined.as_str())])
            .await
    }
}
