//! Subscription context used to enrich wire events

use super::EventMeta;
use crate::market::MarketSubscription;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Market identity joined into events that only carry an asset id
#[derive(Debug, Clone)]
pub struct MarketContext {
    market_slug: String,
    market_id: String,
    outcomes: HashMap<String, String>,
}

impl MarketContext {
    pub fn new(subscription: &MarketSubscription) -> Self {
        let outcomes = subscription
            .outcomes
            .iter()
            .map(|o| (o.asset_id.clone(), o.outcome_name.clone()))
            .collect();

        Self {
            market_slug: subscription.market_slug.clone(),
            market_id: subscription.market_id.clone(),
            outcomes,
        }
    }

    /// Whether the asset belongs to this subscription
    pub fn contains(&self, asset_id: &str) -> bool {
        self.outcomes.contains_key(asset_id)
    }

    pub fn outcome_name(&self, asset_id: &str) -> Option<&str> {
        self.outcomes.get(asset_id).map(String::as_str)
    }

    pub fn market_slug(&self) -> &str {
        &self.market_slug
    }

    /// Build full event identity for an asset.
    ///
    /// Unknown assets get an empty outcome name; the store rejects them.
    pub fn enrich(
        &self,
        asset_id: &str,
        timestamp: DateTime<Utc>,
        content_hash: &str,
    ) -> EventMeta {
        EventMeta {
            asset_id: asset_id.to_string(),
            market_id: self.market_id.clone(),
            market_slug: self.market_slug.clone(),
            outcome_name: self.outcome_name(asset_id).unwrap_or_default().to_string(),
            timestamp,
            content_hash: content_hash.to_string(),
        }
    }
}
