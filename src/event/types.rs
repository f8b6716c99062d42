//! Market event types

use crate::orderbook::{LevelChange, PriceLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Event validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required identity field is empty
    #[error("Missing {field} on {kind} event for asset '{asset_id}'")]
    MissingField {
        field: &'static str,
        kind: &'static str,
        asset_id: String,
    },
    /// Timestamp absent or not epoch milliseconds
    #[error("Invalid timestamp on event for asset '{asset_id}': {value}")]
    InvalidTimestamp { asset_id: String, value: String },
    /// Price or size could not be parsed
    #[error("Invalid {field} '{value}' for asset '{asset_id}'")]
    InvalidNumber {
        field: &'static str,
        value: String,
        asset_id: String,
    },
    /// Side label not recognised
    #[error("Invalid side '{value}' for asset '{asset_id}'")]
    InvalidSide { value: String, asset_id: String },
    /// Message is not a decodable event
    #[error("Malformed message: {0}")]
    Malformed(String),
}

/// Identity carried by every market event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub asset_id: String,
    pub market_id: String,
    pub market_slug: String,
    pub outcome_name: String,
    pub timestamp: DateTime<Utc>,
    pub content_hash: String,
}

impl EventMeta {
    /// Check that identity fields are present.
    ///
    /// `outcome_name` is joined from the subscription, so it is only
    /// required for assets the subscription knows about.
    pub fn validate(&self, kind: &'static str, require_outcome: bool) -> Result<(), ValidationError> {
        let fields = [
            ("asset_id", &self.asset_id),
            ("market_id", &self.market_id),
            ("market_slug", &self.market_slug),
            ("content_hash", &self.content_hash),
        ];

        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(self.missing(field, kind));
            }
        }

        if require_outcome && self.outcome_name.trim().is_empty() {
            return Err(self.missing("outcome_name", kind));
        }

        Ok(())
    }

    fn missing(&self, field: &'static str, kind: &'static str) -> ValidationError {
        ValidationError::MissingField {
            field,
            kind,
            asset_id: self.asset_id.clone(),
        }
    }
}

/// Inbound order book event for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// Full book; replaces everything known about the asset
    BookSnapshot {
        meta: EventMeta,
        asks: Vec<PriceLevel>,
        /// Informational only, not tracked by the books
        bids: Vec<PriceLevel>,
    },
    /// Incremental level changes
    PriceDelta {
        meta: EventMeta,
        changes: Vec<LevelChange>,
    },
}

impl MarketEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            MarketEvent::BookSnapshot { meta, .. } | MarketEvent::PriceDelta { meta, .. } => meta,
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.meta().asset_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.meta().timestamp
    }

    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            MarketEvent::BookSnapshot { .. } => "book",
            MarketEvent::PriceDelta { .. } => "price_change",
        }
    }

    /// Validate identity, requiring every field including the outcome name
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.meta().validate(self.kind(), true)
    }
}
