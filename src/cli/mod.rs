//! CLI interface for poly-arb
//!
//! Provides subcommands for:
//! - `run`: Sync configured markets live and emit arbitrage instructions
//! - `replay`: Run recorded market messages through a pipeline
//! - `inspect`: Replay and print the resulting ask ladders
//! - `config`: Show the effective configuration

mod inspect;
mod replay;
mod run;

pub use inspect::InspectArgs;
pub use replay::ReplayArgs;
pub use run::RunArgs;

use crate::config::{Config, ExecutionConfig, ExecutionMode, FeedConfig, MarketConfig};
use crate::execution::{ExecutionEngine, PaperEngine};
use crate::market::{GammaClient, GammaConfig, MarketSubscription};
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "poly-arb")]
#[command(about = "Order book sync and cross-book arbitrage matching for Polymarket binary markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync configured markets and match live
    Run(RunArgs),
    /// Replay a JSON-lines file of raw market messages
    Replay(ReplayArgs),
    /// Replay a file and print the final ask ladders
    Inspect(InspectArgs),
    /// Show the effective configuration
    Config,
}

/// Turn a configured market into a subscription, asking Gamma when it is
/// not fully declared
pub async fn resolve_market(
    feed: &FeedConfig,
    market: &MarketConfig,
) -> anyhow::Result<MarketSubscription> {
    if let Some(subscription) = market.static_subscription() {
        return Ok(subscription);
    }

    let client = GammaClient::with_config(GammaConfig {
        base_url: feed.gamma_url.clone(),
        ..Default::default()
    });
    client.market_by_slug(&market.slug).await
}

/// Pick a configured market by slug, or the first one
pub fn select_market<'a>(config: &'a Config, slug: Option<&str>) -> anyhow::Result<&'a MarketConfig> {
    match slug {
        Some(slug) => config
            .markets
            .iter()
            .find(|m| m.slug == slug)
            .ok_or_else(|| anyhow::anyhow!("Market '{}' is not configured", slug)),
        None => config
            .markets
            .first()
            .ok_or_else(|| anyhow::anyhow!("No markets configured")),
    }
}

pub fn build_executor(config: &ExecutionConfig) -> Option<Arc<dyn ExecutionEngine>> {
    match config.mode {
        ExecutionMode::Paper => Some(Arc::new(PaperEngine::new(config.fee_rate))),
        ExecutionMode::Disabled => None,
    }
}
