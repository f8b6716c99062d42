//! Decoding of Polymarket market-channel messages
//!
//! Turns raw text frames into validated [`MarketEvent`]s. Prices and sizes
//! are parsed into decimals here so books never see string prices.

use super::{EventMeta, MarketContext, MarketEvent, ValidationError};
use crate::orderbook::{LevelChange, PriceLevel, Side};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

/// Keep-alive reply sent by the venue
pub const PONG: &str = "PONG";

/// Outcome shares pay at most 1, so no ask can be priced above it
const MAX_PRICE: Decimal = Decimal::ONE;

/// Result of decoding one transport message
#[derive(Debug, Default)]
pub struct DecodedBatch {
    /// Valid events in arrival order
    pub events: Vec<MarketEvent>,
    /// Events dropped entirely
    pub rejected: Vec<ValidationError>,
    /// Individual levels/changes dropped from otherwise valid events
    pub skipped_levels: usize,
    /// Informational events (trades, tick size changes, unknown types)
    pub ignored: usize,
}

impl DecodedBatch {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn reject(&mut self, error: ValidationError) {
        tracing::warn!(error = %error, "Dropping invalid market event");
        self.rejected.push(error);
    }

    fn skip(&mut self, error: ValidationError) {
        tracing::warn!(error = %error, "Skipping malformed level");
        self.skipped_levels += 1;
    }
}

/// Event as it appears on the wire.
///
/// Snapshots use `asks`/`bids` (older feeds: `sells`/`buys`). Deltas carry
/// either `changes` for the event's asset or `price_changes` with a per-change
/// asset id. Level and change entries stay raw so each one is parsed, and
/// skipped, on its own.
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    asset_id: Option<String>,
    #[serde(default, alias = "sells")]
    asks: Option<Vec<Value>>,
    #[serde(default, alias = "buys")]
    bids: Option<Vec<Value>>,
    #[serde(default)]
    changes: Option<Vec<Value>>,
    #[serde(default)]
    price_changes: Option<Vec<Value>>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    hash: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireLevel {
    #[serde(default)]
    price: Value,
    #[serde(default)]
    size: Value,
}

#[derive(Debug, Deserialize)]
struct WireChange {
    #[serde(default)]
    asset_id: Value,
    #[serde(default)]
    price: Value,
    #[serde(default)]
    size: Value,
    #[serde(default)]
    side: Value,
    #[serde(default)]
    hash: Value,
}

impl WireChange {
    fn asset_id(&self) -> Option<&str> {
        self.asset_id.as_str().filter(|id| !id.is_empty())
    }

    fn hash(&self) -> Option<&str> {
        self.hash.as_str()
    }
}

enum WireKind {
    Book,
    Delta,
}

/// Decodes and enriches messages for one market subscription
#[derive(Debug, Clone)]
pub struct EventDecoder {
    context: MarketContext,
}

impl EventDecoder {
    pub fn new(context: MarketContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &MarketContext {
        &self.context
    }

    /// Decode one text frame (a single event or an array of events)
    pub fn decode(&self, text: &str) -> DecodedBatch {
        let mut batch = DecodedBatch::default();

        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == PONG {
            return batch;
        }

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                batch.reject(ValidationError::Malformed(e.to_string()));
                return batch;
            }
        };

        match value {
            Value::Array(items) => {
                tracing::trace!(event_count = items.len(), "Decoding event array");
                for item in items {
                    self.decode_value(item, &mut batch);
                }
            }
            other => self.decode_value(other, &mut batch),
        }

        batch
    }

    fn decode_value(&self, value: Value, batch: &mut DecodedBatch) {
        let wire: WireEvent = match serde_json::from_value(value) {
            Ok(w) => w,
            Err(e) => {
                batch.reject(ValidationError::Malformed(e.to_string()));
                return;
            }
        };

        let kind = match wire.event_type.as_deref().unwrap_or_default() {
            "book" => WireKind::Book,
            "price_change" => WireKind::Delta,
            "" if wire.asks.is_some() || wire.bids.is_some() => WireKind::Book,
            "" if wire.changes.is_some() || wire.price_changes.is_some() => WireKind::Delta,
            other => {
                tracing::trace!(event_type = other, "Ignoring informational event");
                batch.ignored += 1;
                return;
            }
        };

        match kind {
            WireKind::Book => self.decode_book(wire, batch),
            WireKind::Delta => self.decode_delta(wire, batch),
        }
    }

    fn decode_book(&self, wire: WireEvent, batch: &mut DecodedBatch) {
        let asset_id = wire.asset_id.unwrap_or_default();
        let hash = wire.hash.as_ref().and_then(Value::as_str).unwrap_or_default();
        let Some(meta) = self.meta_for(&asset_id, wire.timestamp.as_ref(), hash, "book", batch)
        else {
            return;
        };

        let asks = parse_levels(wire.asks.unwrap_or_default(), &meta.asset_id, batch);
        let bids = parse_levels(wire.bids.unwrap_or_default(), &meta.asset_id, batch);

        batch.events.push(MarketEvent::BookSnapshot { meta, asks, bids });
    }

    fn decode_delta(&self, wire: WireEvent, batch: &mut DecodedBatch) {
        let WireEvent {
            asset_id,
            changes,
            price_changes,
            timestamp,
            hash,
            ..
        } = wire;
        let asset_id = asset_id.unwrap_or_default();
        let hash = hash.as_ref().and_then(Value::as_str);

        let raw_changes = changes.into_iter().flatten().chain(price_changes.into_iter().flatten());
        let wire_changes: Vec<WireChange> = parse_entries(raw_changes, &asset_id, batch);

        // Group by asset, keeping first-appearance order
        let mut groups: Vec<(String, Vec<WireChange>)> = Vec::new();
        for change in wire_changes {
            let owner = change.asset_id().unwrap_or(&asset_id).to_string();
            match groups.iter_mut().find(|(id, _)| *id == owner) {
                Some((_, group)) => group.push(change),
                None => groups.push((owner, vec![change])),
            }
        }

        if groups.is_empty() {
            batch.ignored += 1;
            return;
        }

        for (owner, group) in groups {
            let content_hash = hash
                .or_else(|| group.iter().find_map(WireChange::hash))
                .unwrap_or_default()
                .to_string();

            let Some(meta) =
                self.meta_for(&owner, timestamp.as_ref(), &content_hash, "price_change", batch)
            else {
                continue;
            };

            let changes = parse_changes(group, &meta.asset_id, batch);
            batch.events.push(MarketEvent::PriceDelta { meta, changes });
        }
    }

    fn meta_for(
        &self,
        asset_id: &str,
        timestamp: Option<&Value>,
        content_hash: &str,
        kind: &'static str,
        batch: &mut DecodedBatch,
    ) -> Option<EventMeta> {
        let Some(timestamp) = parse_timestamp(timestamp) else {
            batch.reject(ValidationError::InvalidTimestamp {
                asset_id: asset_id.to_string(),
                value: timestamp.map(raw).unwrap_or_default(),
            });
            return None;
        };

        let meta = self.context.enrich(asset_id, timestamp, content_hash);
        let require_outcome = self.context.contains(asset_id);
        if let Err(e) = meta.validate(kind, require_outcome) {
            batch.reject(e);
            return None;
        }

        Some(meta)
    }
}

/// Deserialize each raw entry on its own, skipping the ones that don't fit
fn parse_entries<T: DeserializeOwned>(
    entries: impl IntoIterator<Item = Value>,
    asset_id: &str,
    batch: &mut DecodedBatch,
) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                batch.skip(ValidationError::Malformed(format!("{asset_id}: {e}")));
                None
            }
        })
        .collect()
}

fn parse_levels(levels: Vec<Value>, asset_id: &str, batch: &mut DecodedBatch) -> Vec<PriceLevel> {
    parse_entries::<WireLevel>(levels, asset_id, batch)
        .into_iter()
        .filter_map(|level| match parse_price_size(&level.price, &level.size, asset_id) {
            Ok((price, size)) => Some(PriceLevel { price, size }),
            Err(e) => {
                batch.skip(e);
                None
            }
        })
        .collect()
}

fn parse_changes(
    changes: Vec<WireChange>,
    asset_id: &str,
    batch: &mut DecodedBatch,
) -> Vec<LevelChange> {
    let mut parsed = Vec::with_capacity(changes.len());

    for change in changes {
        let Some(side) = change.side.as_str().and_then(Side::parse) else {
            batch.skip(ValidationError::InvalidSide {
                value: raw(&change.side),
                asset_id: asset_id.to_string(),
            });
            continue;
        };

        match parse_price_size(&change.price, &change.size, asset_id) {
            Ok((price, size)) => parsed.push(LevelChange { side, price, size }),
            Err(e) => batch.skip(e),
        }
    }

    parsed
}

/// Prices must lie in (0, 1], sizes must be non-negative
fn parse_price_size(
    price: &Value,
    size: &Value,
    asset_id: &str,
) -> Result<(Decimal, Decimal), ValidationError> {
    let invalid = |field: &'static str, value: &Value| ValidationError::InvalidNumber {
        field,
        value: raw(value),
        asset_id: asset_id.to_string(),
    };

    let p = parse_decimal(price)
        .filter(|p| *p > Decimal::ZERO && *p <= MAX_PRICE)
        .ok_or_else(|| invalid("price", price))?;
    let s = parse_decimal(size)
        .filter(|s| *s >= Decimal::ZERO)
        .ok_or_else(|| invalid("size", size))?;

    Ok((p.normalize(), s))
}

/// Parse a decimal sent as a string (".48", "0.48") or a JSON number
fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    let text = if let Some(rest) = text.strip_prefix('.') {
        format!("0.{rest}")
    } else if let Some(rest) = text.strip_prefix("-.") {
        format!("-0.{rest}")
    } else {
        text
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Epoch milliseconds, as a string or a number
fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let millis = match value? {
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Number(n) => n.as_i64()?,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}

fn raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
