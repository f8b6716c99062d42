//! Per-market pipeline
//!
//! Owns one market's books and processes its messages strictly in order:
//! decode, validate, apply, then one matching pass over the updated books.
//! Instructions go to the execution engine, the recorder, and the
//! pipeline's own ledger. With message capture on, every raw message is
//! recorded before decoding so the capture replays into the same books.

use super::types::{PassReport, PipelineError, PipelineStats};
use crate::data::DataRecorder;
use crate::event::{EventDecoder, MarketContext, MarketEvent, PONG};
use crate::execution::{ExecutionEngine, TradeInstruction};
use crate::market::MarketSubscription;
use crate::matching::{MatchingConfig, MatchingEngine};
use crate::orderbook::{OrderBookStore, StoreError};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

pub struct MarketPipeline {
    decoder: EventDecoder,
    store: OrderBookStore,
    engine: MatchingEngine,
    executor: Option<Arc<dyn ExecutionEngine>>,
    recorder: Option<Arc<DataRecorder>>,
    record_ladders: bool,
    record_messages: bool,
    ledger: Vec<TradeInstruction>,
    stats: PipelineStats,
}

impl MarketPipeline {
    /// Build a pipeline with empty books for `subscription`
    pub fn new(
        subscription: &MarketSubscription,
        matching: MatchingConfig,
    ) -> Result<Self, PipelineError> {
        subscription
            .validate()
            .map_err(|e| PipelineError::Setup(e.to_string()))?;

        Ok(Self {
            decoder: EventDecoder::new(MarketContext::new(subscription)),
            store: OrderBookStore::from_subscription(subscription)?,
            engine: MatchingEngine::new(matching),
            executor: None,
            recorder: None,
            record_ladders: false,
            record_messages: false,
            ledger: Vec::new(),
            stats: PipelineStats::default(),
        })
    }

    pub fn with_executor(mut self, executor: Arc<dyn ExecutionEngine>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Capture instructions, and ladders after every applied batch if `record_ladders`
    pub fn with_recorder(mut self, recorder: Arc<DataRecorder>, record_ladders: bool) -> Self {
        self.recorder = Some(recorder);
        self.record_ladders = record_ladders;
        self
    }

    /// Also capture every raw message through the recorder
    pub fn with_message_capture(mut self) -> Self {
        self.record_messages = true;
        self
    }

    pub fn market_slug(&self) -> &str {
        self.store.market_slug()
    }

    pub fn store(&self) -> &OrderBookStore {
        &self.store
    }

    /// Every instruction this pipeline has emitted, in emission order
    pub fn ledger(&self) -> &[TradeInstruction] {
        &self.ledger
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Process one raw transport message
    pub async fn process_message(&mut self, raw: &str) -> Result<PassReport, PipelineError> {
        let started = Instant::now();
        self.capture_message(raw).await;
        let batch = self.decoder.decode(raw);

        let rejected = batch.rejected.len();
        let skipped = batch.skipped_levels;

        self.stats.messages += 1;
        self.stats.events_rejected += rejected as u64;
        self.stats.levels_skipped += skipped as u64;
        telemetry::increment(CounterMetric::EventsRejected, self.market_slug(), rejected as u64);
        telemetry::increment(CounterMetric::LevelsSkipped, self.market_slug(), skipped as u64);

        let mut report = self.process_events(batch.events).await?;
        report.events_rejected += rejected;
        report.levels_skipped += skipped;

        telemetry::record_latency(LatencyMetric::Pass, self.market_slug(), started.elapsed());
        Ok(report)
    }

    /// Validate, apply, and match one batch of already decoded events
    pub async fn process_events(
        &mut self,
        events: Vec<MarketEvent>,
    ) -> Result<PassReport, PipelineError> {
        let mut report = PassReport::default();

        let context = self.decoder.context();
        let mut valid = Vec::with_capacity(events.len());
        for event in events {
            let require_outcome = context.contains(event.asset_id());
            match event.meta().validate(event.kind(), require_outcome) {
                Ok(()) => valid.push(event),
                Err(e) => {
                    tracing::warn!(market = %self.store.market_slug(), error = %e, "Dropping invalid event");
                    report.events_rejected += 1;
                }
            }
        }
        self.stats.events_rejected += report.events_rejected as u64;
        telemetry::increment(
            CounterMetric::EventsRejected,
            self.store.market_slug(),
            report.events_rejected as u64,
        );

        if valid.is_empty() {
            return Ok(report);
        }

        report.events_applied = match self.store.apply_events(&valid) {
            Ok(applied) => applied,
            Err(e) => {
                if matches!(e, StoreError::UnknownAsset { .. }) {
                    telemetry::increment(CounterMetric::UnknownAsset, self.store.market_slug(), 1);
                }
                return Err(e.into());
            }
        };
        self.stats.events_applied += report.events_applied as u64;
        telemetry::increment(
            CounterMetric::EventsApplied,
            self.store.market_slug(),
            report.events_applied as u64,
        );

        let now = Utc::now();
        let matching_started = Instant::now();
        let instructions = self.engine.run_store(&self.store, now);
        telemetry::record_latency(
            LatencyMetric::Matching,
            self.store.market_slug(),
            matching_started.elapsed(),
        );
        report.matched = true;
        self.stats.matching_passes += 1;

        if let Some(recorder) = &self.recorder {
            if self.record_ladders {
                if let Err(e) = recorder.record_ladders(&self.store, now).await {
                    tracing::error!(market = %self.store.market_slug(), error = %e, "Failed to record ladders");
                }
            }
        }

        if !instructions.is_empty() {
            self.dispatch(&instructions).await;
        }

        report.instructions = instructions;
        Ok(report)
    }

    async fn capture_message(&self, raw: &str) {
        let Some(recorder) = self.recorder.as_ref().filter(|_| self.record_messages) else {
            return;
        };
        let payload = raw.trim();
        if payload.is_empty() || payload == PONG {
            return;
        }
        if let Err(e) = recorder
            .record_message(self.market_slug(), payload, Utc::now())
            .await
        {
            tracing::error!(market = %self.market_slug(), error = %e, "Failed to record message");
        }
    }

    async fn dispatch(&mut self, instructions: &[TradeInstruction]) {
        let market = self.store.market_slug().to_string();

        tracing::info!(
            market = %market,
            pairs = instructions.len() / 2,
            best_a = %instructions[0].price,
            best_b = %instructions[1].price,
            "Arbitrage instructions emitted"
        );
        telemetry::increment(CounterMetric::Instructions, &market, instructions.len() as u64);

        if let Some(executor) = &self.executor {
            let started = Instant::now();
            match executor.submit(instructions).await {
                Ok(ids) => {
                    tracing::debug!(market = %market, orders = ids.len(), "Instructions submitted");
                }
                Err(e) => {
                    self.stats.submit_errors += 1;
                    telemetry::increment(CounterMetric::SubmitErrors, &market, 1);
                    tracing::error!(market = %market, error = %e, "Execution engine rejected instructions");
                }
            }
            telemetry::record_latency(LatencyMetric::Submission, &market, started.elapsed());
        }

        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record_instructions(instructions).await {
                tracing::error!(market = %market, error = %e, "Failed to record instructions");
            }
        }

        self.stats.instructions += instructions.len() as u64;
        self.ledger.extend_from_slice(instructions);
    }

    /// Consume messages until the channel closes or a batch fails
    pub async fn run(&mut self, rx: mpsc::Receiver<String>) -> Result<(), PipelineError> {
        self.run_until(rx, std::future::pending()).await
    }

    /// Like [`run`](Self::run), also stopping cleanly when `shutdown` resolves
    pub async fn run_until<F>(
        &mut self,
        mut rx: mpsc::Receiver<String>,
        shutdown: F,
    ) -> Result<(), PipelineError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        telemetry::adjust_gauge(GaugeMetric::ActivePipelines, 1.0);
        tracing::info!(
            market = %self.market_slug(),
            assets = ?self.store.asset_ids(),
            "Market pipeline started"
        );

        let result = loop {
            tokio::select! {
                message = rx.recv() => {
                    let Some(raw) = message else {
                        break Ok(());
                    };
                    if let Err(e) = self.process_message(&raw).await {
                        tracing::error!(market = %self.market_slug(), error = %e, "Market pipeline paused");
                        break Err(e);
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!(market = %self.market_slug(), "Shutdown requested");
                    break Ok(());
                }
            }
        };

        telemetry::adjust_gauge(GaugeMetric::ActivePipelines, -1.0);
        tracing::info!(
            market = %self.market_slug(),
            messages = self.stats.messages,
            instructions = self.stats.instructions,
            "Market pipeline stopped"
        );
        result
    }
}
