//! Read → process → write loop shared by the binary and tests
//!
//! A raised stop flag ends input early but never skips the final drain, so
//! averages accumulated so far are still written.

use super::processor::{ProcessorStats, PulseProcessor};
use super::event::PulseEvent;
use super::reader::EventSourceError;
use super::writer::RecordWriter;
use super::writer_backend::RecordWriterError;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: ProcessorStats,
    /// Lines skipped for bad encoding or malformed JSON
    pub bad_lines: u64,
    /// Input ended on a read error rather than end of stream
    pub read_failed: bool,
    pub interrupted: bool,
}

pub async fn run<I>(
    events: I,
    mut processor: PulseProcessor,
    writer: &mut RecordWriter,
    stop: &AtomicBool,
) -> Result<RunSummary, RecordWriterError>
where
    I: IntoIterator<Item = Result<PulseEvent, EventSourceError>>,
{
    let mut summary = RunSummary::default();

    for item in events {
        if stop.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }

        match item {
            Ok(event) => {
                let records = processor.process(&event);
                writer.write_all(&records).await?;
            }
            Err(e) if e.is_line_error() => {
                summary.bad_lines += 1;
                log::warn!("Skipping input line: {}", e);
            }
            Err(e) => {
                log::error!(
                    "❌ Event stream error after {} events: {}",
                    processor.stats().events_seen,
                    e
                );
                summary.read_failed = true;
                break;
            }
        }
    }

    let closed = processor.close();
    writer.write_all(&closed.records).await?;
    writer.flush().await?;

    summary.stats = closed.stats;
    Ok(summary)
}
