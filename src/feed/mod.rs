//! Market data feed module
//!
//! Streams raw Polymarket market-channel messages into market pipelines

mod polymarket;

pub use polymarket::{subscription_message, MarketFeed, KEEPALIVE_MESSAGE, POLYMARKET_WS_URL};
