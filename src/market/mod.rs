//! Market discovery module
//!
//! Binary market subscriptions, declared in config or resolved by slug
//! through the Gamma API

mod gamma;

pub use gamma::{GammaClient, GammaConfig, GAMMA_API_URL};

use serde::{Deserialize, Serialize};

/// One outcome token of a market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeAsset {
    /// CLOB token identifier
    pub asset_id: String,
    /// Outcome label (e.g. team name, "Yes")
    pub outcome_name: String,
}

impl OutcomeAsset {
    pub fn new(asset_id: impl Into<String>, outcome_name: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            outcome_name: outcome_name.into(),
        }
    }
}

/// Everything needed to run a pipeline for one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSubscription {
    /// Market slug (e.g. "mlb-tex-bal-2025-06-25")
    pub market_slug: String,
    /// Venue market identifier
    pub market_id: String,
    /// Outcome tokens, in book A / book B order
    pub outcomes: Vec<OutcomeAsset>,
}

impl MarketSubscription {
    pub fn new(
        market_slug: impl Into<String>,
        market_id: impl Into<String>,
        outcomes: Vec<OutcomeAsset>,
    ) -> Self {
        Self {
            market_slug: market_slug.into(),
            market_id: market_id.into(),
            outcomes,
        }
    }

    /// Token ids to subscribe to on the market channel
    pub fn asset_ids(&self) -> Vec<String> {
        self.outcomes.iter().map(|o| o.asset_id.clone()).collect()
    }

    /// Check the subscription describes a usable binary market
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.market_slug.trim().is_empty() {
            anyhow::bail!("Market subscription is missing a slug");
        }
        if self.market_id.trim().is_empty() {
            anyhow::bail!("Market {} is missing a market id", self.market_slug);
        }
        if self.outcomes.len() != 2 {
            anyhow::bail!(
                "Market {} must have exactly 2 outcomes, got {}",
                self.market_slug,
                self.outcomes.len()
            );
        }
        for outcome in &self.outcomes {
            if outcome.asset_id.trim().is_empty() || outcome.outcome_name.trim().is_empty() {
                anyhow::bail!(
                    "Market {} has an outcome with an empty asset id or name",
                    self.market_slug
                );
            }
        }
        Ok(())
    }
}
