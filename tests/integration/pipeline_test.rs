//! Pipeline integration tests driven by raw market-channel messages

use poly_arb::data::{DataRecorder, ParquetReader, RecorderConfig};
use poly_arb::execution::{ExecutionEngine, PaperEngine};
use poly_arb::market::{MarketSubscription, OutcomeAsset};
use poly_arb::matching::MatchingConfig;
use poly_arb::pipeline::{run_markets, MarketPipeline, PipelineError};
use poly_arb::orderbook::StoreError;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

fn subscription() -> MarketSubscription {
    MarketSubscription::new(
        "mlb-tex-bal-2025-06-25",
        "553",
        vec![
            OutcomeAsset::new("1111", "Rangers"),
            OutcomeAsset::new("2222", "Orioles"),
        ],
    )
}

const BOOK_A: &str = r#"[{"event_type":"book","asset_id":"1111","market":"0xc0nd","asks":[{"price":"0.45","size":"100"},{"price":"0.60","size":"20"}],"bids":[{"price":"0.40","size":"10"}],"timestamp":"1750800000000","hash":"0xa1"}]"#;
const BOOK_B: &str = r#"[{"event_type":"book","asset_id":"2222","market":"0xc0nd","sells":[{"price":".5","size":"60"}],"buys":[],"timestamp":"1750800000100","hash":"0xb1"}]"#;
const DELTA_MULTI: &str = r#"{"event_type":"price_change","market":"0xc0nd","price_changes":[{"asset_id":"2222","price":"0.5","size":"0","side":"SELL","hash":"0xb2"},{"asset_id":"1111","price":"0.44","size":"10","side":"SELL","hash":"0xa2"},{"asset_id":"2222","price":"0.52","size":"40","side":"SELL","hash":"0xb2"}],"timestamp":"1750800000200"}"#;

#[tokio::test]
async fn test_snapshot_delta_sequence() {
    let mut pipeline = MarketPipeline::new(&subscription(), MatchingConfig::default()).unwrap();

    let report = pipeline.process_message(BOOK_A).await.unwrap();
    assert!(report.instructions.is_empty());

    // 0.45 + 0.50 crosses for 60
    let report = pipeline.process_message(BOOK_B).await.unwrap();
    assert_eq!(report.pairs(), 1);
    assert_eq!(report.instructions[0].size, dec!(60));

    // 0.50 removed, 0.44 and 0.52 added
    let report = pipeline.process_message(DELTA_MULTI).await.unwrap();
    assert_eq!(report.events_applied, 2);
    assert_eq!(report.pairs(), 2);
    assert_eq!(report.instructions[0].price, dec!(0.44));
    assert_eq!(report.instructions[0].size, dec!(10));
    assert_eq!(report.instructions[1].price, dec!(0.52));
    assert_eq!(report.instructions[2].price, dec!(0.45));
    assert_eq!(report.instructions[2].size, dec!(30));

    let (rangers, orioles) = pipeline.store().pair();
    assert_eq!(rangers.best_ask(), Some(dec!(0.44)));
    assert_eq!(orioles.best_ask(), Some(dec!(0.52)));
    assert!(orioles.level(dec!(0.5)).is_none());

    assert_eq!(pipeline.ledger().len(), 6);
    assert_eq!(pipeline.stats().matching_passes, 3);
}

#[tokio::test]
async fn test_replayed_snapshot_is_idempotent() {
    let mut pipeline = MarketPipeline::new(&subscription(), MatchingConfig::default()).unwrap();

    pipeline.process_message(BOOK_A).await.unwrap();
    let before = pipeline.store().lookup("1111").unwrap().ask_ladder();
    pipeline.process_message(BOOK_A).await.unwrap();

    assert_eq!(pipeline.store().lookup("1111").unwrap().ask_ladder(), before);
}

#[tokio::test]
async fn test_foreign_asset_pauses_pipeline() {
    let mut pipeline = MarketPipeline::new(&subscription(), MatchingConfig::default()).unwrap();

    let foreign = BOOK_A.replace("1111", "9999");
    let err = pipeline.process_message(&foreign).await.unwrap_err();

    assert!(matches!(err, PipelineError::Store(StoreError::UnknownAsset { .. })));
    assert!(pipeline.store().lookup("1111").unwrap().is_empty());
}

#[tokio::test]
async fn test_paper_fills_and_capture() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let recorder = Arc::new(DataRecorder::new(RecorderConfig {
        output_dir: temp_dir.path().to_path_buf(),
        ..Default::default()
    }));
    let engine = Arc::new(PaperEngine::new(dec!(0.01)));

    let mut pipeline = MarketPipeline::new(&subscription(), MatchingConfig::default())
        .unwrap()
        .with_executor(engine.clone())
        .with_recorder(recorder.clone(), true);

    pipeline.process_message(BOOK_A).await.unwrap();
    pipeline.process_message(BOOK_B).await.unwrap();
    drop(pipeline);

    let fills = engine.get_fills().await.unwrap();
    assert_eq!(fills.len(), 2);
    assert_eq!(fills[0].fees, dec!(0.27)); // 60 * 0.45 * 0.01

    let recorder = Arc::try_unwrap(recorder).ok().unwrap();
    let stats = recorder.shutdown().await;
    assert_eq!(stats.instructions.written, 2);
    // Ladders after each batch: 2 levels, then 2 + 1
    assert_eq!(stats.ladders.written, 5);

    let market_dir = temp_dir.path().join("mlb-tex-bal-2025-06-25");
    let instruction_file = std::fs::read_dir(&market_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("instructions_"))
        })
        .unwrap();
    let captured = ParquetReader::new(instruction_file).read_instructions().unwrap();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].outcome_name, "Rangers");
    assert_eq!(captured[1].outcome_name, "Orioles");
}

#[tokio::test]
async fn test_markets_run_independently() {
    let other = MarketSubscription::new(
        "nba-bos-nyk",
        "77",
        vec![
            OutcomeAsset::new("3333", "Celtics"),
            OutcomeAsset::new("4444", "Knicks"),
        ],
    );

    let (tx_a, rx_a) = mpsc::channel(16);
    let (tx_b, rx_b) = mpsc::channel(16);

    tx_a.send(BOOK_A.to_string()).await.unwrap();
    tx_a.send(BOOK_B.to_string()).await.unwrap();
    drop(tx_a);

    // Second market receives the first market's traffic and pauses
    tx_b.send(BOOK_A.to_string()).await.unwrap();
    drop(tx_b);

    let (_stop_tx, stop_rx) = watch::channel(false);
    let outcomes = run_markets(
        vec![
            (MarketPipeline::new(&subscription(), MatchingConfig::default()).unwrap(), rx_a),
            (MarketPipeline::new(&other, MatchingConfig::default()).unwrap(), rx_b),
        ],
        stop_rx,
    )
    .await;

    assert!(outcomes[0].is_ok());
    assert_eq!(outcomes[0].stats.instructions, 2);
    assert!(!outcomes[1].is_ok());
    assert_eq!(outcomes[1].stats.instructions, 0);
}
