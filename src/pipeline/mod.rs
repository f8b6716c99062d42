//! Market pipeline module
//!
//! One pipeline per market, each owning its books and instruction ledger

mod runner;
mod supervisor;
mod types;

pub use runner::MarketPipeline;
pub use supervisor::run_markets;
pub use types::{MarketOutcome, PassReport, PipelineError, PipelineStats};
