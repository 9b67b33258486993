//! Pulse Core - Streaming Pulse Reduction Engine
//!
//! Reduces per-channel digitized pulses, one frame per channel per event,
//! into raw rows or per-(channel, gain) averages.
//!
//! # Architecture
//!
//! ```text
//! JSONL events → EventReader → PulseProcessor
//!     ↓
//! BunchCrossingFilter (drop whole event)
//!     ↓
//! SegmentFlushController (lumi boundary → flush + reset)
//!     ↓
//! decode_frame (amplitude, gain, pedestal, gain mask)
//!     ↓
//! raw: OutputRecordEmitter    average: AggregationTable → OutputRecordEmitter
//!     ↓
//! RecordWriter → JSONL or SQLite backend   (driven by runner::run)
//! ```

pub mod accumulator;
pub mod bx_filter;
pub mod decoder;
pub mod event;
pub mod processor;
pub mod reader;
pub mod record;
pub mod runner;
pub mod segment;
pub mod writer_backend;
pub mod jsonl_writer;
pub mod sqlite_writer;
pub mod writer;

pub use accumulator::{AccumulatorKey, AggregationTable, AveragedPulse};
pub use bx_filter::BunchCrossingFilter;
pub use decoder::{decode_frame, DecodedFrame, NUM_SAMPLES};
pub use event::{PulseEvent, RawDigi};
pub use processor::{CloseSummary, ProcessorStats, PulseProcessor};
pub use reader::{EventReader, EventSourceError};
pub use record::{OutputRecord, OutputRecordEmitter, OutputSchema, RecordMeta};
pub use runner::{run, RunSummary};
pub use segment::{SegmentFlushController, SegmentId, SegmentTransition};
pub use writer_backend::{RecordWriterBackend, RecordWriterError};
pub use jsonl_writer::JsonlRecordWriter;
pub use sqlite_writer::SqliteRecordWriter;
pub use writer::RecordWriter;
