use super::DashboardState;
use crate::types::DashboardEvent;
use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const EVENT_KINDS: [&str; 5] = [
    "price_updated",
    "alert_triggered",
    "history_changed",
    "alerts_changed",
    "tokens_changed",
];

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    /// Comma-separated event kinds, or `all`.
    pub channels: Option<String>,
    /// Only forward per-token events for this address.
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebSocketMessage {
    pub r#type: String,
    pub data: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeMessage {
    pub action: String, // "subscribe" or "unsubscribe"
    pub channels: Vec<String>,
}

/// Which events one socket receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subscription {
    kinds: HashSet<String>,
    address: Option<String>,
}

impl Subscription {
    pub fn new(channels: Option<&str>, address: Option<String>) -> Self {
        let mut subscription = Self {
            kinds: HashSet::new(),
            address: address.filter(|a| !a.is_empty()),
        };
        match channels {
            Some(raw) => subscription.subscribe(raw.split(',')),
            None => subscription.subscribe(EVENT_KINDS),
        }
        subscription
    }

    pub fn subscribe<'a>(&mut self, channels: impl IntoIterator<Item = &'a str>) {
        for channel in channels.into_iter().map(str::trim) {
            if channel == "all" {
                self.kinds.extend(EVENT_KINDS.iter().map(|k| k.to_string()));
            } else if EVENT_KINDS.contains(&channel) {
                self.kinds.insert(channel.to_string());
            }
        }
    }

    pub fn unsubscribe<'a>(&mut self, channels: impl IntoIterator<Item = &'a str>) {
        for channel in channels.into_iter().map(str::trim) {
            if channel == "all" {
                self.kinds.clear();
            } else {
                self.kinds.remove(channel);
            }
        }
    }

    pub fn matches(&self, event: &DashboardEvent) -> bool {
        if !self.kinds.contains(event.kind()) {
            return false;
        }
        match (&self.address, event.address()) {
            (Some(wanted), Some(address)) => wanted == address,
            _ => true,
        }
    }

    fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.kinds.iter().cloned().collect();
        channels.sort();
        channels
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WebSocketQuery>,
    State(state): State<DashboardState>,
) -> impl IntoResponse {
    let subscription = Subscription::new(params.channels.as_deref(), params.address);

    ws.on_upgrade(move |socket| handle_websocket(socket, state, subscription))
}

async fn handle_websocket(socket: WebSocket, state: DashboardState, subscription: Subscription) {
    let (mut sender, mut receiver) = socket.split();
    let mut event_receiver = state.session.subscribe();

    let welcome_msg = WebSocketMessage {
        r#type: "connected".to_string(),
        data: serde_json::json!({
            "channels": subscription.channels(),
            "address": subscription.address,
            "features": state.session.features(),
        }),
        timestamp: chrono::Utc::now(),
    };
    if let Ok(msg) = serde_json::to_string(&welcome_msg) {
        let _ = sender.send(Message::Text(msg)).await;
    }

    let subscription = Arc::new(Mutex::new(subscription));

    let sender_subscription = Arc::clone(&subscription);
    let sender_task = tokio::spawn(async move {
        loop {
            let event = match event_receiver.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("⚠️ websocket client lagging, dropped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if !sender_subscription.lock().await.matches(&event) {
                continue;
            }

            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let receiver_subscription = Arc::clone(&subscription);
    let receiver_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let Ok(request) = serde_json::from_str::<SubscribeMessage>(&text) else {
                        debug!("ignoring websocket message: {}", text);
                        continue;
                    };
                    let mut subscription = receiver_subscription.lock().await;
                    let channels = request.channels.iter().map(String::as_str);
                    match request.action.as_str() {
                        "subscribe" => subscription.subscribe(channels),
                        "unsubscribe" => subscription.unsubscribe(channels),
                        other => debug!("unknown websocket action: {}", other),
                    }
                }
                Ok(Message::Close(_)) => break,
                Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = sender_task => {},
        _ = receiver_task => {},
    }
}
