//! Parquet file writer with rotation

use crate::execution::TradeInstruction;
use crate::orderbook::{Side, SyntheticOrderBook};
use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

fn timestamp_field() -> Field {
    Field::new(
        "timestamp",
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    )
}

fn utf8(name: &str) -> Field {
    Field::new(name, DataType::Utf8, false)
}

fn timestamp_column(timestamps: impl Iterator<Item = DateTime<Utc>>) -> ArrayRef {
    let micros: Vec<i64> = timestamps.map(|t| t.timestamp_micros()).collect();
    Arc::new(TimestampMicrosecondArray::from(micros).with_timezone("UTC"))
}

fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from(values.collect::<Vec<_>>()))
}

// Decimals are stored as strings to keep their exact scale
fn decimal_column(values: impl Iterator<Item = Decimal>) -> ArrayRef {
    Arc::new(StringArray::from(
        values.map(|d| d.to_string()).collect::<Vec<_>>(),
    ))
}

/// A record kind captured to its own Parquet file series
pub trait CaptureRecord: Send + 'static {
    /// File name prefix
    const PREFIX: &'static str;

    fn market_slug(&self) -> &str;

    fn schema() -> Schema;

    /// Arrow columns in schema order
    fn columns(records: &[Self]) -> Vec<ArrayRef>
    where
        Self: Sized;
}

impl CaptureRecord for TradeInstruction {
    const PREFIX: &'static str = "instructions";

    fn market_slug(&self) -> &str {
        &self.market_slug
    }

    fn schema() -> Schema {
        Schema::new(vec![
            timestamp_field(),
            utf8("market_slug"),
            utf8("market_id"),
            utf8("asset_id"),
            utf8("outcome_name"),
            utf8("side"),
            utf8("price"),
            utf8("size"),
        ])
    }

    fn columns(records: &[Self]) -> Vec<ArrayRef> {
        vec![
            timestamp_column(records.iter().map(|r| r.timestamp)),
            string_column(records.iter().map(|r| r.market_slug.as_str())),
            string_column(records.iter().map(|r| r.market_id.as_str())),
            string_column(records.iter().map(|r| r.asset_id.as_str())),
            string_column(records.iter().map(|r| r.outcome_name.as_str())),
            string_column(records.iter().map(|r| r.side.as_str())),
            decimal_column(records.iter().map(|r| r.price)),
            decimal_column(records.iter().map(|r| r.size)),
        ]
    }
}

/// One ask level of a book at capture time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderRecord {
    pub timestamp: DateTime<Utc>,
    pub market_slug: String,
    pub asset_id: String,
    pub outcome_name: String,
    /// Position in the ladder, 0 = best ask
    pub level: u32,
    pub price: Decimal,
    pub size: Decimal,
}

impl LadderRecord {
    /// Flatten a book's ask ladder into rows
    pub fn from_book(book: &SyntheticOrderBook, timestamp: DateTime<Utc>) -> Vec<Self> {
        book.ask_ladder()
            .into_iter()
            .enumerate()
            .map(|(level, order)| Self {
                timestamp,
                market_slug: book.market_slug.clone(),
                asset_id: book.asset_id.clone(),
                outcome_name: book.outcome_name.clone(),
                level: level as u32,
                price: order.price,
                size: order.size,
            })
            .collect()
    }
}

impl CaptureRecord for LadderRecord {
    const PREFIX: &'static str = "ladders";

    fn market_slug(&self) -> &str {
        &self.market_slug
    }

    fn schema() -> Schema {
        Schema::new(vec![
            timestamp_field(),
            utf8("market_slug"),
            utf8("asset_id"),
            utf8("outcome_name"),
            Field::new("level", DataType::UInt32, false),
            utf8("price"),
            utf8("size"),
        ])
    }

    fn columns(records: &[Self]) -> Vec<ArrayRef> {
        vec![
            timestamp_column(records.iter().map(|r| r.timestamp)),
            string_column(records.iter().map(|r| r.market_slug.as_str())),
            string_column(records.iter().map(|r| r.asset_id.as_str())),
            string_column(records.iter().map(|r| r.outcome_name.as_str())),
            Arc::new(UInt32Array::from(
                records.iter().map(|r| r.level).collect::<Vec<_>>(),
            )),
            decimal_column(records.iter().map(|r| r.price)),
            decimal_column(records.iter().map(|r| r.size)),
        ]
    }
}

/// One raw market-channel message as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub received_at: DateTime<Utc>,
    pub market_slug: String,
    pub payload: String,
}

impl CaptureRecord for MessageRecord {
    const PREFIX: &'static str = "messages";

    fn market_slug(&self) -> &str {
        &self.market_slug
    }

    fn schema() -> Schema {
        Schema::new(vec![timestamp_field(), utf8("market_slug"), utf8("payload")])
    }

    fn columns(records: &[Self]) -> Vec<ArrayRef> {
        vec![
            timestamp_column(records.iter().map(|r| r.received_at)),
            string_column(records.iter().map(|r| r.market_slug.as_str())),
            string_column(records.iter().map(|r| r.payload.as_str())),
        ]
    }
}

/// Parquet file writer with time-based rotation.
///
/// Files live under `<output_dir>/<market_slug>/` and are named after the
/// start of the current rotation window plus a part number, since every
/// flush produces a new file.
pub struct ParquetWriter {
    output_dir: PathBuf,
    rotation_interval: Duration,
    window_start: Option<DateTime<Utc>>,
    part: u32,
}

impl ParquetWriter {
    pub fn new(output_dir: PathBuf, rotation_interval_secs: u64) -> Self {
        Self {
            output_dir,
            rotation_interval: Duration::seconds(rotation_interval_secs as i64),
            window_start: None,
            part: 0,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn needs_rotation(&self, now: DateTime<Utc>) -> bool {
        match self.window_start {
            None => true,
            Some(start) => now - start >= self.rotation_interval,
        }
    }

    /// Path for the next file of `prefix` in `market_slug`'s directory
    pub fn next_path(&mut self, prefix: &str, market_slug: &str, now: DateTime<Utc>) -> PathBuf {
        if self.needs_rotation(now) {
            self.window_start = Some(now);
            self.part = 0;
        }
        let start = self.window_start.unwrap_or(now);
        let path = self.output_dir.join(market_slug).join(format!(
            "{}_{}_{:04}.parquet",
            prefix,
            start.format("%Y%m%d_%H%M%S"),
            self.part
        ));
        self.part += 1;
        path
    }

    /// Write records to a new Parquet file at `path`
    pub fn write<R: CaptureRecord>(&self, path: &Path, records: &[R]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let schema = Arc::new(R::schema());
        let batch = RecordBatch::try_new(schema.clone(), R::columns(records))?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, count = records.len(), kind = R::PREFIX, "Wrote Parquet file");

        Ok(())
    }
}

/// Reader for captured Parquet files
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn batches(&self) -> anyhow::Result<Vec<RecordBatch>> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        Ok(reader.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn row_count(&self) -> anyhow::Result<usize> {
        Ok(self.batches()?.iter().map(|b| b.num_rows()).sum())
    }

    /// Read raw messages back, in capture order
    pub fn read_messages(&self) -> anyhow::Result<Vec<MessageRecord>> {
        let mut messages = Vec::new();

        for batch in self.batches()? {
            let timestamps = batch
                .column(0)
                .as_any()
                .downcast_ref::<TimestampMicrosecondArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid timestamp column"))?;
            let slugs = batch
                .column(1)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid market_slug column"))?;
            let payloads = batch
                .column(2)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid payload column"))?;

            for row in 0..batch.num_rows() {
                messages.push(MessageRecord {
                    received_at: DateTime::from_timestamp_micros(timestamps.value(row))
                        .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?,
                    market_slug: slugs.value(row).to_string(),
                    payload: payloads.value(row).to_string(),
                });
            }
        }

        Ok(messages)
    }

    /// Read trade instructions back from an instructions file
    pub fn read_instructions(&self) -> anyhow::Result<Vec<TradeInstruction>> {
        let mut instructions = Vec::new();

        for batch in self.batches()? {
            let timestamps = batch
                .column(0)
                .as_any()
                .downcast_ref::<TimestampMicrosecondArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid timestamp column"))?;
            let strings = (1..8)
                .map(|i| {
                    batch
                        .column(i)
                        .as_any()
                        .downcast_ref::<StringArray>()
                        .ok_or_else(|| anyhow::anyhow!("Invalid column {}", i))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            for row in 0..batch.num_rows() {
                let timestamp = DateTime::from_timestamp_micros(timestamps.value(row))
                    .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?;
                let side = Side::parse(strings[4].value(row))
                    .ok_or_else(|| anyhow::anyhow!("Invalid side {}", strings[4].value(row)))?;

                instructions.push(TradeInstruction {
                    market_slug: strings[0].value(row).to_string(),
                    market_id: strings[1].value(row).to_string(),
                    asset_id: strings[2].value(row).to_string(),
                    outcome_name: strings[3].value(row).to_string(),
                    side,
                    price: Decimal::from_str(strings[5].value(row))?,
                    size: Decimal::from_str(strings[6].value(row))?,
                    timestamp,
                });
            }
        }

        Ok(instructions)
    }
}
