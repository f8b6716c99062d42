//! Data capture module
//!
//! Stores raw market messages, emitted trade instructions and book ladders
//! to Parquet

mod parquet;
mod recorder;

pub use parquet::{CaptureRecord, LadderRecord, MessageRecord, ParquetReader, ParquetWriter};
pub use recorder::{DataRecorder, KindStats, RecorderConfig, RecorderStats};
