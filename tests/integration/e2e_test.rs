//! End-to-end integration tests

use poly_arb::cli::{resolve_market, select_market};
use poly_arb::config::{Config, ExecutionMode};
use poly_arb::pipeline::MarketPipeline;
use rust_decimal_macros::dec;

#[test]
fn test_config_example_loads() {
    let config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();

    assert_eq!(config.feed.ping_interval_secs, 10);
    assert_eq!(config.matching.payout, dec!(1));
    assert_eq!(config.execution.mode, ExecutionMode::Paper);
    assert_eq!(config.markets.len(), 1);
    assert!(config.markets[0].static_subscription().is_none());
}

#[tokio::test]
async fn test_static_market_to_pipeline() {
    let config = Config::from_toml(
        r#"
        [matching]
        min_tradable_size = 10

        [[markets]]
        slug = "will-it-rain"
        market_id = "42"
        outcomes = [
            { asset_id = "yes-token", outcome_name = "Yes" },
            { asset_id = "no-token", outcome_name = "No" },
        ]
        "#,
    )
    .unwrap();

    let market = select_market(&config, None).unwrap();
    let subscription = resolve_market(&config.feed, market).await.unwrap();
    let mut pipeline = MarketPipeline::new(&subscription, config.matching.clone()).unwrap();

    let message = r#"[
        {"event_type":"book","asset_id":"yes-token","asks":[{"price":"0.30","size":"5"},{"price":"0.35","size":"50"}],"timestamp":"1700000000000","hash":"y1"},
        {"event_type":"book","asset_id":"no-token","asks":[{"price":"0.60","size":"40"}],"timestamp":"1700000000000","hash":"n1"}
    ]"#;
    let report = pipeline.process_message(message).await.unwrap();

    // The 5-share level is below the configured minimum
    assert_eq!(report.pairs(), 1);
    assert_eq!(report.instructions[0].price, dec!(0.35));
    assert_eq!(report.instructions[0].size, dec!(40));
    assert_eq!(report.instructions[0].outcome_name, "Yes");
    assert_eq!(report.instructions[1].outcome_name, "No");
    assert_eq!(report.instructions[0].market_id, "42");
}
