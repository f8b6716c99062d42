//! Paper trading execution engine

use super::{ExecutionEngine, Fill, OrderId, TradeInstruction};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Paper trading execution engine with simulated fills.
///
/// Safe to share between pipelines.
pub struct PaperEngine {
    fee_rate: Decimal,
    fills: Arc<RwLock<Vec<Fill>>>,
}

impl PaperEngine {
    /// Create a new paper trading engine
    pub fn new(fee_rate: Decimal) -> Self {
        Self {
            fee_rate,
            fills: Arc::new(RwLock::new(vec![])),
        }
    }
}

#[async_trait]
impl ExecutionEngine for PaperEngine {
    async fn submit(&self, instructions: &[TradeInstruction]) -> anyhow::Result<Vec<OrderId>> {
        if instructions.is_empty() {
            return Ok(vec![]);
        }

        let now = Utc::now();
        let mut ids = Vec::with_capacity(instructions.len());
        let mut fills = self.fills.write().await;

        // Simulate immediate fill at the instruction price
        for instruction in instructions {
            let order_id = OrderId::new_v4();
            fills.push(Fill {
                order_id,
                asset_id: instruction.asset_id.clone(),
                outcome_name: instruction.outcome_name.clone(),
                side: instruction.side,
                price: instruction.price,
                size: instruction.size,
                timestamp: now,
                fees: instruction.notional() * self.fee_rate,
            });
            ids.push(order_id);
        }

        tracing::info!(
            market = %instructions[0].market_slug,
            count = instructions.len(),
            "Paper orders filled"
        );
        Ok(ids)
    }

    async fn get_fills(&self) -> anyhow::Result<Vec<Fill>> {
        let fills = self.fills.read().await;
        Ok(fills.clone())
    }
}
