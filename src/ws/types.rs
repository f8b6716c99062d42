//! WebSocket types and configuration

use std::time::Duration;

/// How the client keeps an idle connection alive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keepalive {
    /// Protocol-level ping frames; a missing pong by the next tick drops the connection
    Frame,
    /// Application-level text message; replies arrive as ordinary text frames
    Text(String),
}

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Maximum consecutive failed attempts before giving up (0 = infinite)
    pub max_reconnect_attempts: u32,
    /// Initial delay before first reconnection attempt
    pub initial_reconnect_delay: Duration,
    /// Maximum delay between reconnection attempts
    pub max_reconnect_delay: Duration,
    /// Uptime after which a dropped connection resets the attempt count
    pub stable_after: Duration,
    /// Interval between keep-alive messages
    pub keepalive_interval: Duration,
    pub keepalive: Keepalive,
    /// Capacity of the inbound message channel
    pub buffer_size: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 10,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            stable_after: Duration::from_secs(30),
            keepalive_interval: Duration::from_secs(30),
            keepalive: Keepalive::Frame,
            buffer_size: 1024,
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_reconnect_delay = d;
        self
    }

    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_reconnect_delay = d;
        self
    }

    pub fn stable_after(mut self, d: Duration) -> Self {
        self.stable_after = d;
        self
    }

    /// Send `message` as a text frame every `interval`
    pub fn text_keepalive(mut self, message: impl Into<String>, interval: Duration) -> Self {
        self.keepalive = Keepalive::Text(message.into());
        self.keepalive_interval = interval;
        self
    }

    /// Send protocol ping frames every `interval`
    pub fn frame_keepalive(mut self, interval: Duration) -> Self {
        self.keepalive = Keepalive::Frame;
        self.keepalive_interval = interval;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }
}

/// Messages delivered to the consumer of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// Text frame from the server
    Text(String),
    /// Connection established; subscriptions should be (re)sent
    Connected,
    /// Connection closed for good
    Disconnected,
    /// Reconnecting after failure
    Reconnecting { attempt: u32 },
}

/// WebSocket errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection dropped
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,

    #[error("Send failed: {0}")]
    SendFailed(String),
}
