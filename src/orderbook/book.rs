//! Synthetic order book state management

use super::{LevelChange, PriceLevel, PriceLevelOrder, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Locally maintained view of one outcome asset's resting sell liquidity.
///
/// Levels are keyed by normalized price, so `0.5` and `0.50` address the
/// same level. Every stored level has a positive size.
#[derive(Debug, Clone)]
pub struct SyntheticOrderBook {
    /// Market slug (e.g. "mlb-tex-bal-2025-06-25")
    pub market_slug: String,
    /// Venue market identifier
    pub market_id: String,
    /// Outcome label for this asset
    pub outcome_name: String,
    /// Outcome token identifier
    pub asset_id: String,
    last_event_timestamp: Option<DateTime<Utc>>,
    levels: BTreeMap<Decimal, PriceLevelOrder>,
}

impl SyntheticOrderBook {
    /// Create a new empty book
    pub fn new(
        market_slug: impl Into<String>,
        market_id: impl Into<String>,
        outcome_name: impl Into<String>,
        asset_id: impl Into<String>,
    ) -> Self {
        Self {
            market_slug: market_slug.into(),
            market_id: market_id.into(),
            outcome_name: outcome_name.into(),
            asset_id: asset_id.into(),
            last_event_timestamp: None,
            levels: BTreeMap::new(),
        }
    }

    /// Replace every level with the positive-size entries of a snapshot
    pub fn replace_all(&mut self, levels: &[PriceLevel], timestamp: DateTime<Utc>) {
        self.levels.clear();

        for level in levels {
            if level.size <= Decimal::ZERO {
                continue;
            }
            let price = level.price.normalize();
            self.levels.insert(
                price,
                PriceLevelOrder {
                    side: Side::Sell,
                    price,
                    size: level.size,
                },
            );
        }

        self.last_event_timestamp = Some(timestamp);

        tracing::trace!(
            asset_id = %self.asset_id,
            levels = self.levels.len(),
            "Replaced book levels from snapshot"
        );
    }

    /// Merge sell-side changes into the book; untouched levels are kept
    pub fn apply_delta(&mut self, changes: &[LevelChange], timestamp: DateTime<Utc>) {
        for change in changes {
            if change.side != Side::Sell {
                continue;
            }

            let price = change.price.normalize();
            if change.size <= Decimal::ZERO {
                self.levels.remove(&price);
            } else {
                self.levels.insert(
                    price,
                    PriceLevelOrder {
                        side: Side::Sell,
                        price,
                        size: change.size,
                    },
                );
            }
        }

        self.last_event_timestamp = Some(timestamp);
    }

    /// All levels, cheapest first
    pub fn ask_ladder(&self) -> Vec<PriceLevelOrder> {
        self.levels.values().copied().collect()
    }

    /// Level resting at `price`, if any
    pub fn level(&self, price: Decimal) -> Option<&PriceLevelOrder> {
        self.levels.get(&price.normalize())
    }

    /// Get best ask price
    pub fn best_ask(&self) -> Option<Decimal> {
        self.levels.keys().next().copied()
    }

    /// Get best ask size
    pub fn best_ask_size(&self) -> Option<Decimal> {
        self.levels.values().next().map(|l| l.size)
    }

    /// Total resting size across all levels
    pub fn total_size(&self) -> Decimal {
        self.levels.values().map(|l| l.size).sum()
    }

    /// Timestamp of the last applied event
    pub fn last_event_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_event_timestamp
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn book() -> SyntheticOrderBook {
        SyntheticOrderBook::new("test-market", "test-id-123", "YES", "asset-456")
    }

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn sell(price: Decimal, size: Decimal) -> LevelChange {
        LevelChange::new(Side::Sell, price, size)
    }

    fn prices(book: &SyntheticOrderBook) -> Vec<Decimal> {
        book.ask_ladder().iter().map(|l| l.price).collect()
    }

    #[test]
    fn test_new_book_is_empty() {
        let book = book();
        assert_eq!(book.market_slug, "test-market");
        assert_eq!(book.asset_id, "asset-456");
        assert!(book.is_empty());
        assert!(book.ask_ladder().is_empty());
        assert!(book.last_event_timestamp().is_none());
    }

    #[test]
    fn test_replace_all_sorts_and_drops_empty_levels() {
        let mut book = book();
        book.replace_all(
            &[
                PriceLevel::new(dec!(0.53), dec!(60)),
                PriceLevel::new(dec!(0.45), dec!(100)),
                PriceLevel::new(dec!(0.50), dec!(0)),
                PriceLevel::new(dec!(0.47), dec!(25)),
            ],
            ts(1_000),
        );

        assert_eq!(prices(&book), vec![dec!(0.45), dec!(0.47), dec!(0.53)]);
        assert!(book.level(dec!(0.50)).is_none());
        assert_eq!(book.last_event_timestamp(), Some(ts(1_000)));
    }

    #[test]
    fn test_replace_all_discards_previous_levels() {
        let mut book = book();
        book.apply_delta(
            &[sell(dec!(0.5), dec!(100)), sell(dec!(0.6), dec!(200))],
            ts(1_000),
        );

        book.replace_all(
            &[
                PriceLevel::new(dec!(0.7), dec!(300)),
                PriceLevel::new(dec!(0.8), dec!(400)),
            ],
            ts(2_000),
        );

        assert_eq!(prices(&book), vec![dec!(0.7), dec!(0.8)]);
    }

    #[test]
    fn test_snapshot_with_zero_level_yields_single_level() {
        let mut book = book();
        book.replace_all(
            &[
                PriceLevel::new(dec!(0.45), dec!(100)),
                PriceLevel::new(dec!(0.50), dec!(0)),
            ],
            ts(1_000),
        );

        let ladder = book.ask_ladder();
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder[0].price, dec!(0.45));
        assert_eq!(ladder[0].size, dec!(100));
        assert_eq!(ladder[0].side, Side::Sell);
    }

    #[test]
    fn test_apply_delta_sets_size_exactly() {
        let mut book = book();
        book.apply_delta(&[sell(dec!(0.5), dec!(100))], ts(1_000));
        book.apply_delta(&[sell(dec!(0.5), dec!(150))], ts(2_000));

        assert_eq!(book.len(), 1);
        assert_eq!(book.level(dec!(0.5)).unwrap().size, dec!(150));
        assert_eq!(book.last_event_timestamp(), Some(ts(2_000)));
    }

    #[test]
    fn test_apply_delta_zero_size_removes_level() {
        let mut book = book();
        book.apply_delta(
            &[sell(dec!(0.5), dec!(100)), sell(dec!(0.6), dec!(200))],
            ts(1_000),
        );
        book.apply_delta(&[sell(dec!(0.5), dec!(0))], ts(1_000));

        assert_eq!(prices(&book), vec![dec!(0.6)]);
    }

    #[test]
    fn test_apply_delta_remove_missing_level_is_noop() {
        let mut book = book();
        book.apply_delta(&[sell(dec!(0.6), dec!(200))], ts(1_000));
        book.apply_delta(&[sell(dec!(0.4), dec!(0))], ts(2_000));
        book.apply_delta(&[sell(dec!(0.4), dec!(0))], ts(3_000));

        assert_eq!(prices(&book), vec![dec!(0.6)]);
        assert_eq!(book.level(dec!(0.6)).unwrap().size, dec!(200));
    }

    #[test]
    fn test_apply_delta_leaves_other_levels_untouched() {
        let mut book = book();
        book.replace_all(
            &[
                PriceLevel::new(dec!(0.50), dec!(10)),
                PriceLevel::new(dec!(0.60), dec!(20)),
            ],
            ts(1_000),
        );
        book.apply_delta(&[sell(dec!(0.50), dec!(99))], ts(2_000));

        assert_eq!(book.level(dec!(0.60)).unwrap().size, dec!(20));
        assert_eq!(book.level(dec!(0.50)).unwrap().size, dec!(99));
    }

    #[test]
    fn test_apply_delta_ignores_buy_side() {
        let mut book = book();
        book.apply_delta(
            &[
                LevelChange::new(Side::Buy, dec!(0.5), dec!(100)),
                sell(dec!(0.6), dec!(200)),
            ],
            ts(1_000),
        );

        assert_eq!(prices(&book), vec![dec!(0.6)]);
    }

    #[test]
    fn test_price_keys_are_normalized() {
        let mut book = book();
        book.apply_delta(&[sell(dec!(0.50), dec!(10))], ts(1_000));
        book.apply_delta(&[sell(dec!(0.5), dec!(30))], ts(2_000));

        assert_eq!(book.len(), 1);
        assert_eq!(book.best_ask(), Some(dec!(0.5)));
        assert_eq!(book.best_ask_size(), Some(dec!(30)));

        book.apply_delta(&[sell(dec!(0.500), dec!(0))], ts(3_000));
        assert!(book.is_empty());
    }

    #[test]
    fn test_ask_ladder_does_not_mutate() {
        let mut book = book();
        book.apply_delta(
            &[sell(dec!(0.6), dec!(1)), sell(dec!(0.4), dec!(2))],
            ts(1_000),
        );

        let first = book.ask_ladder();
        let second = book.ask_ladder();
        assert_eq!(first, second);
        assert_eq!(book.total_size(), dec!(3));
    }
}
