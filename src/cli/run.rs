//! Run command implementation

use super::{build_executor, resolve_market};
use crate::config::Config;
use crate::data::{DataRecorder, RecorderConfig};
use crate::feed::MarketFeed;
use crate::pipeline::{run_markets, MarketPipeline};
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Only run these market slugs (defaults to every configured market)
    #[arg(short, long)]
    pub market: Vec<String>,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let markets: Vec<_> = config
            .markets
            .iter()
            .filter(|m| self.market.is_empty() || self.market.contains(&m.slug))
            .collect();
        if markets.is_empty() {
            anyhow::bail!("No markets to run");
        }

        let executor = build_executor(&config.execution);
        let recorder = if config.data.enabled {
            Some(Arc::new(DataRecorder::new(RecorderConfig {
                output_dir: config.data.output_dir.clone(),
                rotation_interval_secs: config.data.rotation_interval_secs()?,
                flush_interval_secs: config.data.flush_interval_secs,
                ..Default::default()
            })))
        } else {
            None
        };

        let feed = MarketFeed::new(config.feed.clone());
        let mut pipelines = Vec::with_capacity(markets.len());

        for market in markets {
            // One market failing to resolve does not hold up the rest
            let subscription = match resolve_market(&config.feed, market).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(market = %market.slug, error = %e, "Failed to resolve market");
                    continue;
                }
            };

            let mut pipeline = match MarketPipeline::new(&subscription, config.matching.clone()) {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!(market = %market.slug, error = %e, "Failed to build pipeline");
                    continue;
                }
            };
            if let Some(executor) = &executor {
                pipeline = pipeline.with_executor(executor.clone());
            }
            if let Some(recorder) = &recorder {
                pipeline = pipeline.with_recorder(recorder.clone(), config.data.record_ladders);
                if config.data.record_messages {
                    pipeline = pipeline.with_message_capture();
                }
            }

            let rx = feed.subscribe(subscription.asset_ids());
            tracing::info!(
                market = %subscription.market_slug,
                market_id = %subscription.market_id,
                outcomes = ?subscription.outcomes.iter().map(|o| &o.outcome_name).collect::<Vec<_>>(),
                "Market ready"
            );
            pipelines.push((pipeline, rx));
        }

        if pipelines.is_empty() {
            anyhow::bail!("No market could be started");
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received shutdown signal");
                let _ = stop_tx.send(true);
            }
        });

        let outcomes = run_markets(pipelines, stop_rx).await;

        for outcome in &outcomes {
            match &outcome.error {
                None => tracing::info!(
                    market = %outcome.market_slug,
                    messages = outcome.stats.messages,
                    instructions = outcome.stats.instructions,
                    "Market finished"
                ),
                Some(e) => tracing::error!(
                    market = %outcome.market_slug,
                    messages = outcome.stats.messages,
                    error = %e,
                    "Market stopped with error"
                ),
            }
        }

        if let Some(recorder) = recorder {
            match Arc::try_unwrap(recorder) {
                Ok(recorder) => {
                    recorder.shutdown().await;
                }
                Err(_) => tracing::warn!("Recorder still shared, skipping final flush"),
            }
        }

        Ok(())
    }
}
