//! Cross-book arbitrage matching
//!
//! Walks the two ask ladders of a binary market cheapest-first with one
//! cursor per ladder. A pair of levels crosses when the two prices sum to
//! less than the payout; matched size is the smaller remaining size.
//!
//! Both ladders are sorted ascending, so the first pair that fails to cross
//! ends the pass: every later pair costs at least as much.

use super::MatchingConfig;
use crate::execution::{build_instruction, TradeInstruction};
use crate::orderbook::{OrderBookStore, PriceLevelOrder, SyntheticOrderBook};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// One matched pair of levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    /// Ask price on book A
    pub price_a: Decimal,
    /// Ask price on book B
    pub price_b: Decimal,
    /// Size bought on each side
    pub size: Decimal,
}

impl Crossing {
    /// Cost of buying one share of each outcome
    pub fn combined_price(&self) -> Decimal {
        self.price_a + self.price_b
    }

    /// Total cost of the pair
    pub fn cost(&self) -> Decimal {
        self.combined_price() * self.size
    }
}

/// Matching engine over the two books of a binary market
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Greedy two-cursor pass over ladders sorted ascending by price
    pub fn find_crossings(
        &self,
        ladder_a: &[PriceLevelOrder],
        ladder_b: &[PriceLevelOrder],
    ) -> Vec<Crossing> {
        let mut crossings = Vec::new();

        let (mut i, mut j) = (0, 0);
        let mut remaining_a = size_at(ladder_a, 0);
        let mut remaining_b = size_at(ladder_b, 0);

        while i < ladder_a.len() && j < ladder_b.len() {
            let price_a = ladder_a[i].price;
            let price_b = ladder_b[j].price;

            match price_a.checked_add(price_b) {
                Some(combined) if combined < self.config.payout => {}
                _ => break,
            }

            let size = remaining_a.min(remaining_b);

            if size < self.config.min_tradable_size {
                // The smaller level cannot be filled at minimum size
                let advance_a = remaining_a <= remaining_b;
                let advance_b = remaining_b <= remaining_a;
                if advance_a {
                    i += 1;
                    remaining_a = size_at(ladder_a, i);
                }
                if advance_b {
                    j += 1;
                    remaining_b = size_at(ladder_b, j);
                }
                continue;
            }

            crossings.push(Crossing {
                price_a,
                price_b,
                size,
            });

            remaining_a -= size;
            remaining_b -= size;

            if remaining_a <= Decimal::ZERO {
                i += 1;
                remaining_a = size_at(ladder_a, i);
            }
            if remaining_b <= Decimal::ZERO {
                j += 1;
                remaining_b = size_at(ladder_b, j);
            }
        }

        crossings
    }

    /// Run one matching pass and build paired buy instructions.
    ///
    /// Output alternates A, B, A, B...; instructions `2k` and `2k + 1`
    /// belong to the same crossing and share `timestamp`.
    pub fn run(
        &self,
        book_a: &SyntheticOrderBook,
        book_b: &SyntheticOrderBook,
        timestamp: DateTime<Utc>,
    ) -> Vec<TradeInstruction> {
        let crossings = self.find_crossings(&book_a.ask_ladder(), &book_b.ask_ladder());

        if !crossings.is_empty() {
            tracing::debug!(
                market = %book_a.market_slug,
                pairs = crossings.len(),
                best_combined = %crossings[0].combined_price(),
                total_size = %crossings.iter().map(|c| c.size).sum::<Decimal>(),
                "Found crossing levels"
            );
        }

        let mut instructions = Vec::with_capacity(crossings.len() * 2);
        for crossing in &crossings {
            instructions.push(build_instruction(
                book_a,
                crossing.price_a,
                crossing.size,
                timestamp,
            ));
            instructions.push(build_instruction(
                book_b,
                crossing.price_b,
                crossing.size,
                timestamp,
            ));
        }

        instructions
    }

    /// Run a matching pass over a store's book pair
    pub fn run_store(
        &self,
        store: &OrderBookStore,
        timestamp: DateTime<Utc>,
    ) -> Vec<TradeInstruction> {
        let (book_a, book_b) = store.pair();
        self.run(book_a, book_b, timestamp)
    }
}

fn size_at(ladder: &[PriceLevelOrder], index: usize) -> Decimal {
    ladder.get(index).map(|l| l.size).unwrap_or(Decimal::ZERO)
}
