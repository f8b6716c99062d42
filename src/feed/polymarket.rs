//! Polymarket market-channel subscription
//!
//! Subscribes to the CLOB market channel for a set of asset ids and forwards
//! raw text frames. Decoding happens in the pipeline, not here.

use crate::config::FeedConfig;
use crate::ws::{WsClient, WsConfig, WsMessage};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

/// Polymarket CLOB WebSocket URL for market data
pub const POLYMARKET_WS_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/market";

/// Text keep-alive understood by the market channel
pub const KEEPALIVE_MESSAGE: &str = "PING";

/// Market-channel feed for one market's assets
pub struct MarketFeed {
    config: FeedConfig,
}

impl MarketFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    /// Start streaming raw messages for `asset_ids`.
    ///
    /// The subscription is resent after every reconnect. The stream ends when
    /// the receiver is dropped or the connection gives up.
    pub fn subscribe(&self, asset_ids: Vec<String>) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(self.config.buffer_size);

        if asset_ids.is_empty() {
            tracing::warn!("No asset ids provided, returning closed feed");
            return rx;
        }

        let ws_config = ws_config(&self.config);

        tokio::spawn(async move {
            if let Err(e) = run_subscription_loop(ws_config, asset_ids, tx).await {
                tracing::error!(error = %e, "Market feed subscription loop failed");
            }
        });

        rx
    }
}

fn ws_config(config: &FeedConfig) -> WsConfig {
    WsConfig::new(&config.ws_url)
        .max_reconnects(config.max_reconnects)
        .initial_delay(Duration::from_millis(config.initial_delay_ms))
        .max_delay(Duration::from_secs(config.max_delay_secs))
        .text_keepalive(KEEPALIVE_MESSAGE, Duration::from_secs(config.ping_interval_secs))
        .buffer_size(config.buffer_size)
}

async fn run_subscription_loop(
    ws_config: WsConfig,
    asset_ids: Vec<String>,
    tx: mpsc::Sender<String>,
) -> anyhow::Result<()> {
    let subscription = subscription_message(&asset_ids)?;
    let (mut ws_rx, ws_tx) = WsClient::new(ws_config).connect();

    while let Some(msg) = ws_rx.recv().await {
        match msg {
            WsMessage::Connected => {
                if ws_tx.send(subscription.clone()).await.is_err() {
                    anyhow::bail!("WebSocket sender closed before subscribing");
                }
                tracing::info!(assets = asset_ids.len(), "Subscribed to market channel");
            }
            WsMessage::Text(text) => {
                tracing::trace!(
                    len = text.len(),
                    preview = %text.chars().take(120).collect::<String>(),
                    "Market channel message"
                );
                metrics::counter!("polyarb_feed_messages_total").increment(1);
                if tx.send(text).await.is_err() {
                    tracing::debug!("Feed receiver dropped");
                    break;
                }
            }
            WsMessage::Reconnecting { attempt } => {
                metrics::counter!("polyarb_feed_reconnects_total").increment(1);
                tracing::info!(attempt, "Market channel reconnecting");
            }
            WsMessage::Disconnected => {
                tracing::info!("Market channel disconnected");
                break;
            }
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct SubscriptionMessage<'a> {
    assets_ids: &'a [String],
    #[serde(rename = "type")]
    channel: &'static str,
}

/// Market-channel subscription payload
pub fn subscription_message(asset_ids: &[String]) -> anyhow::Result<String> {
    Ok(serde_json::to_string(&SubscriptionMessage {
        assets_ids: asset_ids,
        channel: "market",
    })?)
}
