//! Arbitrage matching module
//!
//! Detects and sizes crossings between the two outcome books of a binary
//! market. Buying one share of each outcome pays out 1.00 at settlement,
//! so a combined ask below the payout is a locked-in edge.

mod engine;

pub use engine::{Crossing, MatchingEngine};

use rust_decimal::Decimal;
use serde::Deserialize;

/// Matching configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Combined price at or above which nothing crosses
    #[serde(default = "default_payout")]
    pub payout: Decimal,
    /// Smallest size worth emitting, applied to both sides
    #[serde(default = "default_min_tradable_size")]
    pub min_tradable_size: Decimal,
}

fn default_payout() -> Decimal {
    Decimal::ONE
}
fn default_min_tradable_size() -> Decimal {
    Decimal::ONE
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            payout: default_payout(),
            min_tradable_size: default_min_tradable_size(),
        }
    }
}
