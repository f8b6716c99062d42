//! Runs many market pipelines side by side

use super::runner::MarketPipeline;
use super::types::MarketOutcome;
use tokio::sync::{mpsc, watch};

/// Run each pipeline on its own task until its input ends, it fails, or
/// `shutdown` flips to `true`.
///
/// Pipelines share nothing, so a failure or panic in one market leaves the
/// others running. Outcomes are returned in input order.
pub async fn run_markets(
    markets: Vec<(MarketPipeline, mpsc::Receiver<String>)>,
    shutdown: watch::Receiver<bool>,
) -> Vec<MarketOutcome> {
    let mut handles = Vec::with_capacity(markets.len());

    for (mut pipeline, rx) in markets {
        let market_slug = pipeline.market_slug().to_string();
        let mut shutdown = shutdown.clone();

        let handle = tokio::spawn(async move {
            let stop = async move {
                let requested = shutdown.wait_for(|stop| *stop).await.is_ok();
                // A dropped sender never requests shutdown
                if !requested {
                    std::future::pending::<()>().await;
                }
            };
            let result = pipeline.run_until(rx, stop).await;
            (pipeline, result)
        });

        handles.push((market_slug, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (market_slug, handle) in handles {
        let outcome = match handle.await {
            Ok((pipeline, result)) => MarketOutcome {
                market_slug,
                stats: pipeline.stats().clone(),
                error: result.err().map(|e| e.to_string()),
            },
            Err(e) => {
                tracing::error!(market = %market_slug, error = %e, "Market pipeline task failed");
                MarketOutcome {
                    market_slug,
                    stats: Default::default(),
                    error: Some(format!("task failed: {}", e)),
                }
            }
        };
        outcomes.push(outcome);
    }

    outcomes
}
