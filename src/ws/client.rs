//! WebSocket client with automatic reconnection

use super::types::{Keepalive, WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{sleep, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket client with reconnection and keep-alive handling
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect in a background task.
    ///
    /// Returns the inbound message receiver and a sender for outbound text
    /// frames. Dropping either end closes the connection.
    pub fn connect(&self) -> (mpsc::Receiver<WsMessage>, mpsc::Sender<String>) {
        let (msg_tx, msg_rx) = mpsc::channel(self.config.buffer_size);
        let (send_tx, send_rx) = mpsc::channel(256);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = run_connection_loop(config, msg_tx, send_rx).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        (msg_rx, send_tx)
    }
}

async fn run_connection_loop(
    config: WsConfig,
    tx: mpsc::Sender<WsMessage>,
    mut send_rx: mpsc::Receiver<String>,
) -> Result<(), WsError> {
    let mut attempts = 0;
    let mut delay = config.initial_reconnect_delay;

    loop {
        let started = Instant::now();
        match connect_and_stream(&config, &tx, &mut send_rx).await {
            Ok(()) => {
                tracing::info!(url = %config.url, "WebSocket connection closed");
                let _ = tx.send(WsMessage::Disconnected).await;
                return Ok(());
            }
            Err(e) => {
                // Only a connection that stayed up counts as a fresh start
                if matches!(e, WsError::ConnectionLost(_)) && started.elapsed() >= config.stable_after {
                    attempts = 0;
                    delay = config.initial_reconnect_delay;
                }
                attempts += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "WebSocket error, reconnecting"
                );

                if config.max_reconnect_attempts > 0 && attempts >= config.max_reconnect_attempts {
                    tracing::error!(attempts, "Max reconnection attempts reached");
                    let _ = tx.send(WsMessage::Disconnected).await;
                    return Err(WsError::MaxReconnectsExceeded);
                }

                if tx.send(WsMessage::Reconnecting { attempt: attempts }).await.is_err() {
                    tracing::debug!("Receiver dropped, stopping reconnection");
                    return Ok(());
                }

                sleep(delay).await;
                delay = next_delay(delay, config.max_reconnect_delay);
            }
        }
    }
}

fn next_delay(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

async fn connect_and_stream(
    config: &WsConfig,
    tx: &mpsc::Sender<WsMessage>,
    send_rx: &mut mpsc::Receiver<String>,
) -> Result<(), WsError> {
    tracing::info!(url = %config.url, "Connecting to WebSocket");

    let (ws_stream, _response) = connect_async(&config.url)
        .await
        .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

    let (mut write, mut read) = ws_stream.split();

    if tx.send(WsMessage::Connected).await.is_err() {
        return Ok(());
    }

    let mut keepalive = tokio::time::interval(config.keepalive_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick fires immediately
    keepalive.tick().await;

    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if tx.send(WsMessage::Text(text)).await.is_err() {
                            tracing::debug!("Receiver dropped, closing connection");
                            return Ok(());
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!(len = data.len(), "Ignoring binary frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return Err(WsError::ConnectionLost(format!("closed by server: {:?}", frame)));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(WsError::ConnectionLost(e.to_string()));
                    }
                    None => {
                        return Err(WsError::ConnectionLost("stream ended".into()));
                    }
                }
            }

            outbound = send_rx.recv() => {
                match outbound {
                    Some(text) => {
                        write.send(Message::Text(text)).await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
            }

            _ = keepalive.tick() => {
                match &config.keepalive {
                    Keepalive::Frame => {
                        if awaiting_pong {
                            return Err(WsError::ConnectionLost("pong timeout".into()));
                        }
                        write.send(Message::Ping(Vec::new())).await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        awaiting_pong = true;
                    }
                    Keepalive::Text(message) => {
                        write.send(Message::Text(message.clone())).await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_client_url() {
        let client = WsClient::new(WsConfig::new("wss://example.com"));
        assert_eq!(client.url(), "wss://example.com");
    }

    #[test]
    fn test_next_delay_caps_at_max() {
        let max = Duration::from_secs(30);
        assert_eq!(next_delay(Duration::from_secs(1), max), Duration::from_secs(2));
        assert_eq!(next_delay(Duration::from_secs(20), max), max);
        assert_eq!(next_delay(max, max), max);
    }

    #[tokio::test]
    async fn test_ws_client_gives_up_after_max_attempts() {
        // Nothing listens on port 1
        let client = WsClient::new(
            WsConfig::new("ws://127.0.0.1:1")
                .max_reconnects(2)
                .initial_delay(Duration::from_millis(10)),
        );

        let (mut rx, _tx) = client.connect();

        let mut reconnects = 0;
        let mut got_disconnect = false;
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = rx.recv().await {
                match msg {
                    WsMessage::Disconnected => {
                        got_disconnect = true;
                        break;
                    }
                    WsMessage::Reconnecting { .. } => reconnects += 1,
                    _ => {}
                }
            }
        })
        .await;

        assert!(result.is_ok(), "timed out waiting for disconnect");
        assert!(got_disconnect);
        assert_eq!(reconnects, 1);
    }

    #[tokio::test]
    async fn test_flapping_server_still_exhausts_attempts() {
        // Accepts the handshake, then drops every connection straight away
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                    drop(ws);
                }
            }
        });

        let client = WsClient::new(
            WsConfig::new(format!("ws://{}", addr))
                .max_reconnects(3)
                .initial_delay(Duration::from_millis(10)),
        );
        let (mut rx, _tx) = client.connect();

        let mut connects = 0;
        let mut reconnects = 0;
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = rx.recv().await {
                match msg {
                    WsMessage::Connected => connects += 1,
                    WsMessage::Reconnecting { .. } => reconnects += 1,
                    WsMessage::Disconnected => break,
                    _ => {}
                }
            }
        })
        .await;

        assert!(result.is_ok(), "client kept reconnecting");
        assert_eq!(connects, 3);
        assert_eq!(reconnects, 2);
    }
}
