//! poly-arb: Order book sync and cross-book arbitrage matching for
//! Polymarket binary markets
//!
//! This library provides the core components for:
//! - Market discovery via Gamma API or static config
//! - Market-channel subscription over a reconnecting WebSocket
//! - Event decoding, enrichment, and validation
//! - Ask-side order books per outcome
//! - Cross-book matching into paired buy instructions
//! - Paper execution and Parquet capture
//! - Per-market pipelines run in isolation

pub mod cli;
pub mod config;
pub mod data;
pub mod event;
pub mod execution;
pub mod feed;
pub mod market;
pub mod matching;
pub mod orderbook;
pub mod pipeline;
pub mod telemetry;
pub mod ws;
