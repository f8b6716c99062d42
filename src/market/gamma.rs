//! Gamma API client for market discovery
//!
//! Resolves a market slug into its venue id and outcome tokens so the
//! pipeline can build one book per outcome.

use super::{MarketSubscription, OutcomeAsset};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Gamma API base URL
pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

/// Configuration for the Gamma client
#[derive(Debug, Clone)]
pub struct GammaConfig {
    /// Base URL for the Gamma API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            base_url: GAMMA_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for Polymarket's Gamma API
pub struct GammaClient {
    config: GammaConfig,
    client: Client,
}

impl GammaClient {
    /// Create a new Gamma API client with default configuration
    pub fn new() -> Self {
        Self::with_config(GammaConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: GammaConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });

        Self { config, client }
    }

    /// Fetch a market by slug and turn it into a subscription
    pub async fn market_by_slug(&self, slug: &str) -> anyhow::Result<MarketSubscription> {
        let url = format!("{}/markets", self.config.base_url);

        tracing::debug!(url = %url, slug, "Fetching market from Gamma API");

        let response = self
            .client
            .get(&url)
            .query(&[("slug", slug)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gamma API error: {} - {}", status, body);
        }

        let markets: Vec<GammaMarket> = response.json().await?;
        let market = markets
            .into_iter()
            .find(|m| m.clob_token_ids.is_some())
            .ok_or_else(|| anyhow::anyhow!("No tradeable market found for slug {}", slug))?;

        if market.closed {
            tracing::warn!(slug, "Market is already closed");
        }

        let subscription = convert_to_subscription(slug, market)?;

        tracing::info!(
            slug,
            market_id = %subscription.market_id,
            outcomes = ?subscription.outcomes.iter().map(|o| &o.outcome_name).collect::<Vec<_>>(),
            "Resolved market"
        );

        Ok(subscription)
    }
}

impl Default for GammaClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw market response from Gamma API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    /// Venue market id
    id: String,
    /// Market slug
    #[serde(default)]
    slug: Option<String>,
    /// CLOB token IDs as JSON string
    clob_token_ids: Option<String>,
    /// Outcome labels as JSON string
    outcomes: Option<String>,
    #[serde(default)]
    closed: bool,
}

/// Zip token ids with outcome labels
fn convert_to_subscription(
    requested_slug: &str,
    market: GammaMarket,
) -> anyhow::Result<MarketSubscription> {
    let token_ids = parse_string_array(
        market
            .clob_token_ids
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Missing clobTokenIds"))?,
    )?;
    let outcomes = parse_string_array(
        market
            .outcomes
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Missing outcomes"))?,
    )?;

    if token_ids.len() != outcomes.len() {
        anyhow::bail!(
            "Token/outcome count mismatch: {} tokens, {} outcomes",
            token_ids.len(),
            outcomes.len()
        );
    }

    let subscription = MarketSubscription::new(
        market.slug.unwrap_or_else(|| requested_slug.to_string()),
        market.id,
        token_ids
            .into_iter()
            .zip(outcomes)
            .map(|(asset_id, outcome_name)| OutcomeAsset::new(asset_id, outcome_name))
            .collect(),
    );
    subscription.validate()?;

    Ok(subscription)
}

/// Parse a JSON-encoded string array
///
/// Format: "[\"a\", \"b\"]"
fn parse_string_array(raw: &str) -> anyhow::Result<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("Failed to parse string array: {} - {}", raw, e))
}
