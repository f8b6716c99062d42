//! Data recorder for message, instruction and ladder capture

use super::parquet::{CaptureRecord, LadderRecord, MessageRecord, ParquetWriter};
use crate::execution::TradeInstruction;
use crate::orderbook::OrderBookStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

/// Configuration for data recording
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Output directory for Parquet files
    pub output_dir: PathBuf,
    /// Rotation interval in seconds
    pub rotation_interval_secs: u64,
    /// Records buffered before flushing
    pub buffer_size: usize,
    /// Maximum time between flushes
    pub flush_interval_secs: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./data"),
            rotation_interval_secs: 3600,
            buffer_size: 1000,
            flush_interval_secs: 60,
        }
    }
}

/// Counters for one record kind
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KindStats {
    pub received: u64,
    pub written: u64,
}

/// Recording statistics
#[derive(Debug, Default, Clone)]
pub struct RecorderStats {
    pub messages: KindStats,
    pub instructions: KindStats,
    pub ladders: KindStats,
    pub files_written: u64,
    pub write_errors: u64,
    pub last_flush: Option<DateTime<Utc>>,
}

/// Picks the counters a record kind reports into
trait Tally {
    fn tally(stats: &mut RecorderStats) -> &mut KindStats;
}

impl Tally for MessageRecord {
    fn tally(stats: &mut RecorderStats) -> &mut KindStats {
        &mut stats.messages
    }
}

impl Tally for TradeInstruction {
    fn tally(stats: &mut RecorderStats) -> &mut KindStats {
        &mut stats.instructions
    }
}

impl Tally for LadderRecord {
    fn tally(stats: &mut RecorderStats) -> &mut KindStats {
        &mut stats.ladders
    }
}

/// Records raw messages, trade instructions and book ladders to Parquet files.
///
/// Shared by all market pipelines; each record is filed under its own
/// market's directory.
pub struct DataRecorder {
    config: RecorderConfig,
    message_tx: mpsc::Sender<MessageRecord>,
    instruction_tx: mpsc::Sender<TradeInstruction>,
    ladder_tx: mpsc::Sender<LadderRecord>,
    stats: Arc<RwLock<RecorderStats>>,
    writers: Vec<JoinHandle<()>>,
}

impl DataRecorder {
    /// Create a recorder and spawn its writer tasks
    pub fn new(config: RecorderConfig) -> Self {
        let (message_tx, message_rx) = mpsc::channel(10_000);
        let (instruction_tx, instruction_rx) = mpsc::channel(10_000);
        let (ladder_tx, ladder_rx) = mpsc::channel(10_000);
        let stats = Arc::new(RwLock::new(RecorderStats::default()));

        let writers = vec![
            tokio::spawn(run_writer(message_rx, config.clone(), stats.clone())),
            tokio::spawn(run_writer(instruction_rx, config.clone(), stats.clone())),
            tokio::spawn(run_writer(ladder_rx, config.clone(), stats.clone())),
        ];

        tracing::info!(output_dir = ?config.output_dir, "Data recorder started");

        Self {
            config,
            message_tx,
            instruction_tx,
            ladder_tx,
            stats,
            writers,
        }
    }

    /// Queue one raw market-channel message for `market_slug`
    pub async fn record_message(
        &self,
        market_slug: &str,
        payload: &str,
        received_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.message_tx
            .send(MessageRecord {
                received_at,
                market_slug: market_slug.to_string(),
                payload: payload.to_string(),
            })
            .await
            .map_err(|e| anyhow::anyhow!("Failed to queue message: {}", e))
    }

    /// Queue the instructions of one matching pass
    pub async fn record_instructions(&self, instructions: &[TradeInstruction]) -> anyhow::Result<()> {
        for instruction in instructions {
            self.instruction_tx
                .send(instruction.clone())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to queue instruction: {}", e))?;
        }
        Ok(())
    }

    /// Queue the current ask ladders of both books in `store`
    pub async fn record_ladders(
        &self,
        store: &OrderBookStore,
        timestamp: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        for book in store.books() {
            for record in LadderRecord::from_book(book, timestamp) {
                self.ladder_tx
                    .send(record)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to queue ladder level: {}", e))?;
            }
        }
        Ok(())
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.config.output_dir
    }

    pub async fn stats(&self) -> RecorderStats {
        self.stats.read().await.clone()
    }

    /// Flush everything buffered and stop the writer tasks
    pub async fn shutdown(self) -> RecorderStats {
        let DataRecorder {
            message_tx,
            instruction_tx,
            ladder_tx,
            stats,
            writers,
            ..
        } = self;

        drop(message_tx);
        drop(instruction_tx);
        drop(ladder_tx);

        for writer in writers {
            if let Err(e) = writer.await {
                tracing::error!(error = %e, "Recorder writer task failed");
            }
        }

        let stats = stats.read().await.clone();
        tracing::info!(
            messages = stats.messages.written,
            instructions = stats.instructions.written,
            ladder_rows = stats.ladders.written,
            files = stats.files_written,
            "Data recorder stopped"
        );
        stats
    }
}

async fn run_writer<R: CaptureRecord + Tally>(
    mut rx: mpsc::Receiver<R>,
    config: RecorderConfig,
    stats: Arc<RwLock<RecorderStats>>,
) {
    let mut writer = ParquetWriter::new(config.output_dir.clone(), config.rotation_interval_secs);
    let mut buffer: Vec<R> = Vec::with_capacity(config.buffer_size);

    let mut flush_timer =
        tokio::time::interval(tokio::time::Duration::from_secs(config.flush_interval_secs.max(1)));
    flush_timer.tick().await;

    loop {
        tokio::select! {
            record = rx.recv() => {
                match record {
                    Some(record) => {
                        R::tally(&mut *stats.write().await).received += 1;
                        buffer.push(record);

                        if buffer.len() >= config.buffer_size {
                            flush(&mut buffer, &mut writer, &stats).await;
                        }
                    }
                    None => {
                        flush(&mut buffer, &mut writer, &stats).await;
                        tracing::debug!(kind = R::PREFIX, "Recorder writer shutting down");
                        break;
                    }
                }
            }

            _ = flush_timer.tick() => {
                flush(&mut buffer, &mut writer, &stats).await;
            }
        }
    }
}

/// Write buffered records, one file per market
async fn flush<R: CaptureRecord + Tally>(
    buffer: &mut Vec<R>,
    writer: &mut ParquetWriter,
    stats: &Arc<RwLock<RecorderStats>>,
) {
    if buffer.is_empty() {
        return;
    }

    let now = Utc::now();

    let mut by_market: BTreeMap<String, Vec<R>> = BTreeMap::new();
    for record in buffer.drain(..) {
        by_market
            .entry(record.market_slug().to_string())
            .or_default()
            .push(record);
    }

    for (market_slug, records) in by_market {
        let path = writer.next_path(R::PREFIX, &market_slug, now);

        match writer.write(&path, &records) {
            Ok(()) => {
                let mut s = stats.write().await;
                R::tally(&mut s).written += records.len() as u64;
                s.files_written += 1;
                s.last_flush = Some(now);
            }
            Err(e) => {
                stats.write().await.write_errors += 1;
                metrics::counter!("polyarb_recorder_write_errors_total").increment(1);
                tracing::error!(
                    error = %e,
                    market = %market_slug,
                    kind = R::PREFIX,
                    "Failed to write capture file"
                );
            }
        }
    }
}
