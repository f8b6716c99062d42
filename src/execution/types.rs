//! Execution types

use crate::orderbook::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order identifier
pub type OrderId = Uuid;

/// A buy instruction produced by a matching pass.
///
/// Instructions come in adjacent pairs, one per outcome, sharing size and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeInstruction {
    pub market_slug: String,
    pub market_id: String,
    /// Outcome token to buy
    pub asset_id: String,
    pub outcome_name: String,
    /// Always `Side::Buy`
    pub side: Side,
    /// Limit price
    pub price: Decimal,
    /// Order size in shares
    pub size: Decimal,
    /// Matching pass timestamp
    pub timestamp: DateTime<Utc>,
}

impl TradeInstruction {
    /// Cost of filling the instruction in full
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

/// A fill (executed trade)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Order ID
    pub order_id: OrderId,
    /// Asset ID
    pub asset_id: String,
    /// Outcome label
    pub outcome_name: String,
    /// Trade side
    pub side: Side,
    /// Fill price
    pub price: Decimal,
    /// Fill size
    pub size: Decimal,
    /// Fill timestamp
    pub timestamp: DateTime<Utc>,
    /// Fees paid
    pub fees: Decimal,
}
