//! Replay command implementation

use super::{build_executor, resolve_market, select_market};
use crate::config::Config;
use crate::data::ParquetReader;
use crate::pipeline::{MarketPipeline, PipelineError};
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines file of raw market-channel messages, or a captured
    /// `messages_*.parquet` file
    pub file: PathBuf,

    /// Market slug from the config (defaults to the first market)
    #[arg(short, long)]
    pub market: Option<String>,

    /// Print every emitted instruction pair
    #[arg(short, long)]
    pub verbose: bool,
}

/// What a replay got through
#[derive(Debug)]
pub struct ReplaySummary {
    pub lines: usize,
    /// Error that paused the pipeline, if any
    pub stopped: Option<PipelineError>,
}

/// Raw messages stored in `path`, in order
async fn load_messages(path: &Path) -> anyhow::Result<Vec<String>> {
    if path.extension().is_some_and(|ext| ext == "parquet") {
        let reader = ParquetReader::new(path.to_path_buf());
        let records = tokio::task::spawn_blocking(move || reader.read_messages())
            .await?
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(records.into_iter().map(|r| r.payload).collect());
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Feed every non-blank message of `path` through `pipeline` in order
pub async fn replay_file(path: &Path, pipeline: &mut MarketPipeline) -> anyhow::Result<ReplaySummary> {
    let messages = load_messages(path).await?;

    let mut lines = 0;
    for line in messages.iter().filter(|l| !l.trim().is_empty()) {
        lines += 1;
        if let Err(e) = pipeline.process_message(line).await {
            tracing::error!(line = lines, error = %e, "Replay stopped");
            return Ok(ReplaySummary {
                lines,
                stopped: Some(e),
            });
        }
    }

    Ok(ReplaySummary {
        lines,
        stopped: None,
    })
}

impl ReplayArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let market = select_market(config, self.market.as_deref())?;
        let subscription = resolve_market(&config.feed, market).await?;

        let mut pipeline = MarketPipeline::new(&subscription, config.matching.clone())?;
        if let Some(executor) = build_executor(&config.execution) {
            pipeline = pipeline.with_executor(executor);
        }

        let summary = replay_file(&self.file, &mut pipeline).await?;
        let stats = pipeline.stats();

        println!("Replayed {} messages for {}", summary.lines, subscription.market_slug);
        println!("  Events applied:  {}", stats.events_applied);
        println!("  Events rejected: {}", stats.events_rejected);
        println!("  Levels skipped:  {}", stats.levels_skipped);
        println!("  Matching passes: {}", stats.matching_passes);
        println!(
            "  Instructions:    {} ({} pairs)",
            stats.instructions,
            stats.instructions / 2
        );
        if let Some(e) = &summary.stopped {
            println!("  Stopped early:   {}", e);
        }

        if self.verbose {
            for pair in pipeline.ledger().chunks(2) {
                if let [a, b] = pair {
                    println!(
                        "  {} {} @ {} + {} {} @ {} (size {})",
                        a.timestamp.format("%H:%M:%S%.3f"),
                        a.outcome_name,
                        a.price,
                        b.outcome_name,
                        b.price,
                        a.price + b.price,
                        a.size
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MarketSubscription, OutcomeAsset};
    use crate::matching::MatchingConfig;
    use std::io::Write;

    #[tokio::test]
    async fn test_replay_file_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"event_type":"book","asset_id":"a","asks":[{{"price":"0.4","size":"5"}}],"timestamp":"1","hash":"x"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "PONG").unwrap();
        writeln!(file, r#"{{"event_type":"book","asset_id":"b","asks":[{{"price":"0.5","size":"5"}}],"timestamp":"2","hash":"y"}}"#).unwrap();

        let subscription = MarketSubscription::new(
            "m",
            "1",
            vec![OutcomeAsset::new("a", "A"), OutcomeAsset::new("b", "B")],
        );
        let mut pipeline = MarketPipeline::new(&subscription, MatchingConfig::default()).unwrap();

        let summary = replay_file(file.path(), &mut pipeline).await.unwrap();

        assert_eq!(summary.lines, 3);
        assert!(summary.stopped.is_none());
        assert_eq!(pipeline.ledger().len(), 2);
    }

    #[tokio::test]
    async fn test_captured_messages_replay_into_same_ledger() {
        use crate::data::{DataRecorder, RecorderConfig};
        use std::sync::Arc;

        let subscription = MarketSubscription::new(
            "m",
            "1",
            vec![OutcomeAsset::new("a", "A"), OutcomeAsset::new("b", "B")],
        );
        let messages = [
            r#"{"event_type":"book","asset_id":"a","asks":[{"price":"0.4","size":"5"}],"timestamp":"1","hash":"x"}"#,
            "PONG",
            r#"{"event_type":"book","asset_id":"b","asks":[{"price":"0.5","size":"8"}],"timestamp":"2","hash":"y"}"#,
            r#"{"event_type":"price_change","asset_id":"a","changes":[{"price":"0.45","side":"SELL","size":"3"}],"timestamp":"3","hash":"z"}"#,
        ];

        let temp_dir = tempfile::TempDir::new().unwrap();
        let recorder = Arc::new(DataRecorder::new(RecorderConfig {
            output_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        }));
        let mut live = MarketPipeline::new(&subscription, MatchingConfig::default())
            .unwrap()
            .with_recorder(recorder.clone(), false)
            .with_message_capture();
        for message in messages {
            live.process_message(message).await.unwrap();
        }
        let live_ledger = live.ledger().to_vec();
        drop(live);

        let stats = Arc::try_unwrap(recorder).ok().unwrap().shutdown().await;
        assert_eq!(stats.messages.written, 3);

        let capture = std::fs::read_dir(temp_dir.path().join("m"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("messages_"))
            })
            .unwrap();

        let mut replayed = MarketPipeline::new(&subscription, MatchingConfig::default()).unwrap();
        let summary = replay_file(&capture, &mut replayed).await.unwrap();

        assert_eq!(summary.lines, 3);
        assert!(summary.stopped.is_none());
        assert_eq!(replayed.ledger().len(), live_ledger.len());
        assert_eq!(replayed.ledger().len(), 6);
        for (replayed, live) in replayed.ledger().iter().zip(&live_ledger) {
            assert_eq!(replayed.price, live.price);
            assert_eq!(replayed.size, live.size);
            assert_eq!(replayed.asset_id, live.asset_id);
        }
    }
}
