//! Execution module
//!
//! Trade instructions, the order builder, and the execution seam that
//! matching passes hand their instructions to

mod builder;
mod paper;
mod types;

pub use builder::build_instruction;
pub use paper::PaperEngine;
pub use types::{Fill, OrderId, TradeInstruction};

use async_trait::async_trait;

/// Trait for execution engine implementations.
///
/// Shared by every market pipeline, so implementations must tolerate
/// concurrent calls.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Submit the instructions of one matching pass
    async fn submit(&self, instructions: &[TradeInstruction]) -> anyhow::Result<Vec<OrderId>>;
    /// Get all fills
    async fn get_fills(&self) -> anyhow::Result<Vec<Fill>>;
}
