//! Matching engine tests over books built from events

use chrono::{TimeZone, Utc};
use poly_arb::event::{EventMeta, MarketEvent};
use poly_arb::market::{MarketSubscription, OutcomeAsset};
use poly_arb::matching::{MatchingConfig, MatchingEngine};
use poly_arb::orderbook::{LevelChange, OrderBookStore, PriceLevel, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn store() -> OrderBookStore {
    OrderBookStore::from_subscription(&MarketSubscription::new(
        "nba-bos-nyk",
        "77",
        vec![
            OutcomeAsset::new("celtics", "Celtics"),
            OutcomeAsset::new("knicks", "Knicks"),
        ],
    ))
    .unwrap()
}

fn meta(asset_id: &str, outcome: &str, millis: i64) -> EventMeta {
    EventMeta {
        asset_id: asset_id.to_string(),
        market_id: "77".to_string(),
        market_slug: "nba-bos-nyk".to_string(),
        outcome_name: outcome.to_string(),
        timestamp: Utc.timestamp_millis_opt(millis).unwrap(),
        content_hash: format!("h{}", millis),
    }
}

fn snapshot(asset_id: &str, outcome: &str, asks: &[(Decimal, Decimal)]) -> MarketEvent {
    MarketEvent::BookSnapshot {
        meta: meta(asset_id, outcome, 1_000),
        asks: asks.iter().map(|&(p, s)| PriceLevel::new(p, s)).collect(),
        bids: vec![],
    }
}

#[test]
fn test_instructions_pair_up_and_never_exceed_book_sizes() {
    let mut store = store();
    store
        .apply_events(&[
            snapshot(
                "celtics",
                "Celtics",
                &[(dec!(0.40), dec!(50)), (dec!(0.45), dec!(75)), (dec!(0.70), dec!(500))],
            ),
            snapshot(
                "knicks",
                "Knicks",
                &[(dec!(0.50), dec!(100)), (dec!(0.52), dec!(50)), (dec!(0.58), dec!(10))],
            ),
        ])
        .unwrap();

    let engine = MatchingEngine::default();
    let instructions = engine.run_store(&store, Utc::now());

    assert_eq!(instructions.len() % 2, 0);
    for pair in instructions.chunks(2) {
        assert_eq!(pair[0].asset_id, "celtics");
        assert_eq!(pair[1].asset_id, "knicks");
        assert_eq!(pair[0].size, pair[1].size);
        assert!(pair[0].size >= dec!(1));
        assert!(pair[0].price + pair[1].price < dec!(1));
    }

    // Total bought at each level stays within the level's size
    let (celtics, knicks) = store.pair();
    for (book, side) in [(celtics, 0), (knicks, 1)] {
        for level in book.ask_ladder() {
            let bought: Decimal = instructions
                .iter()
                .skip(side)
                .step_by(2)
                .filter(|i| i.price == level.price)
                .map(|i| i.size)
                .sum();
            assert!(bought <= level.size);
        }
    }
}

#[test]
fn test_delta_opens_crossing() {
    let mut store = store();
    store
        .apply_events(&[
            snapshot("celtics", "Celtics", &[(dec!(0.55), dec!(100))]),
            snapshot("knicks", "Knicks", &[(dec!(0.50), dec!(100))]),
        ])
        .unwrap();

    let engine = MatchingEngine::default();
    assert!(engine.run_store(&store, Utc::now()).is_empty());

    store
        .apply_events(&[MarketEvent::PriceDelta {
            meta: meta("celtics", "Celtics", 2_000),
            changes: vec![LevelChange::new(Side::Sell, dec!(0.48), dec!(30))],
        }])
        .unwrap();

    let instructions = engine.run_store(&store, Utc::now());
    assert_eq!(instructions.len(), 2);
    assert_eq!(instructions[0].price, dec!(0.48));
    assert_eq!(instructions[0].size, dec!(30));
    assert_eq!(instructions[1].price, dec!(0.50));
}

#[test]
fn test_min_tradable_size_is_configurable() {
    let mut store = store();
    store
        .apply_events(&[
            snapshot("celtics", "Celtics", &[(dec!(0.30), dec!(4)), (dec!(0.31), dec!(100))]),
            snapshot("knicks", "Knicks", &[(dec!(0.30), dec!(100))]),
        ])
        .unwrap();

    let engine = MatchingEngine::new(MatchingConfig {
        min_tradable_size: dec!(5),
        ..Default::default()
    });
    let instructions = engine.run_store(&store, Utc::now());

    assert_eq!(instructions.len(), 2);
    assert_eq!(instructions[0].price, dec!(0.31));
    assert_eq!(instructions[0].size, dec!(100));
}
