//! Order book module
//!
//! Synthetic per-asset ask books kept in sync from snapshot/delta events,
//! and the per-market store that owns them.

mod book;
mod store;

pub use book::SyntheticOrderBook;
pub use store::{OrderBookStore, StoreError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side as reported by the venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse a wire side label ("BUY"/"SELL", also "bid"/"ask")
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "BUY" | "BID" => Some(Side::Buy),
            "SELL" | "ASK" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price level carried by a book snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price at this level
    pub price: Decimal,
    /// Total size available
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// One change carried by a price delta. A zero size removes the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

impl LevelChange {
    pub fn new(side: Side, price: Decimal, size: Decimal) -> Self {
        Self { side, price, size }
    }
}

/// Resting liquidity held by a synthetic book at one price.
///
/// Values are never mutated in place; an update replaces the whole entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevelOrder {
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}
