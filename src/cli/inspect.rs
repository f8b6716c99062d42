//! Inspect command implementation

use super::replay::replay_file;
use super::{resolve_market, select_market};
use crate::config::Config;
use crate::orderbook::SyntheticOrderBook;
use crate::pipeline::MarketPipeline;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// JSON-lines file of raw market-channel messages, or a captured
    /// `messages_*.parquet` file
    pub file: PathBuf,

    /// Market slug from the config (defaults to the first market)
    #[arg(short, long)]
    pub market: Option<String>,

    /// Levels to show per book (0 = all)
    #[arg(short, long, default_value = "10")]
    pub depth: usize,
}

impl InspectArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let market = select_market(config, self.market.as_deref())?;
        let subscription = resolve_market(&config.feed, market).await?;

        // Ladders only; nothing is executed
        let mut pipeline = MarketPipeline::new(&subscription, config.matching.clone())?;
        let summary = replay_file(&self.file, &mut pipeline).await?;

        println!("{} after {} messages", subscription.market_slug, summary.lines);
        if let Some(e) = &summary.stopped {
            println!("(stopped early: {})", e);
        }

        let (book_a, book_b) = pipeline.store().pair();
        for book in [book_a, book_b] {
            print_ladder(book, self.depth);
        }

        match (book_a.best_ask(), book_b.best_ask()) {
            (Some(a), Some(b)) => println!("Best combined ask: {}", a + b),
            _ => println!("Best combined ask: n/a"),
        }

        Ok(())
    }
}

fn print_ladder(book: &SyntheticOrderBook, depth: usize) {
    let last = book
        .last_event_timestamp()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());

    println!();
    println!(
        "{} ({}) - {} levels, {} shares, last event {}",
        book.outcome_name,
        book.asset_id,
        book.len(),
        book.total_size(),
        last
    );

    let limit = if depth == 0 { usize::MAX } else { depth };
    for level in book.ask_ladder().iter().take(limit) {
        println!("  {:>8} x {}", level.price, level.size);
    }
}
