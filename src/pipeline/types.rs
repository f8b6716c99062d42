//! Pipeline types

use crate::execution::TradeInstruction;
use crate::orderbook::StoreError;
use thiserror::Error;

/// Errors that stop a market pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The store refused a batch; the pipeline pauses
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Pipeline setup failed: {0}")]
    Setup(String),
}

/// Outcome of one processed batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub events_applied: usize,
    /// Events dropped by decoding or validation
    pub events_rejected: usize,
    /// Individual levels dropped while decoding
    pub levels_skipped: usize,
    /// Whether a matching pass ran
    pub matched: bool,
    /// Instructions emitted, in A, B pair order
    pub instructions: Vec<TradeInstruction>,
}

impl PassReport {
    pub fn pairs(&self) -> usize {
        self.instructions.len() / 2
    }
}

/// Running totals for one pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub messages: u64,
    pub events_applied: u64,
    pub events_rejected: u64,
    pub levels_skipped: u64,
    pub matching_passes: u64,
    pub instructions: u64,
    pub submit_errors: u64,
}

/// Final state of one market after the supervisor stops
#[derive(Debug, Clone)]
pub struct MarketOutcome {
    pub market_slug: String,
    pub stats: PipelineStats,
    /// Why the pipeline stopped, if not a clean end of stream
    pub error: Option<String>,
}

impl MarketOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
