//! Unified writer interface for output records
//!
//! Routes writes to either JSONL or SQLite backend based on configuration.

use super::jsonl_writer::JsonlRecordWriter;
use super::record::{OutputRecord, OutputSchema};
use super::sqlite_writer::SqliteRecordWriter;
use super::writer_backend::{RecordWriterBackend, RecordWriterError};
use crate::config::BackendType;
use std::path::Path;

/// Unified writer that routes to either JSONL or SQLite backend
pub enum RecordWriter {
    Jsonl(JsonlRecordWriter),
    Sqlite(SqliteRecordWriter),
}

impl RecordWriter {
    /// Create a new record writer based on backend type
    pub fn new(
        backend: BackendType,
        path: impl AsRef<Path>,
        schema: OutputSchema,
    ) -> Result<Self, RecordWriterError> {
        match backend {
            BackendType::Jsonl => Ok(RecordWriter::Jsonl(JsonlRecordWriter::new(path)?)),
            BackendType::Sqlite => Ok(RecordWriter::Sqlite(SqliteRecordWriter::new(path, schema)?)),
        }
    }

    fn backend(&mut self) -> &mut dyn RecordWriterBackend {
        match self {
            RecordWriter::Jsonl(w) => w,
            RecordWriter::Sqlite(w) => w,
        }
    }

    /// Write a burst of records, e.g. one segment flush
    pub async fn write_all(&mut self, records: &[OutputRecord]) -> Result<(), RecordWriterError> {
        let backend = self.backend();
        for record in records {
            backend.write_record(record).await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), RecordWriterError> {
        self.backend().flush().await
    }

    pub fn backend_type(&self) -> &'static str {
        match self {
            RecordWriter::Jsonl(w) => w.backend_type(),
            RecordWriter::Sqlite(w) => w.backend_type(),
        }
    }
}
