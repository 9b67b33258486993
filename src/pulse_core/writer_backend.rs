//! Sink interface for reduced pulse rows
//!
//! A sink receives rows in emission order: raw rows per event, averaged rows
//! in bursts at each lumi flush and at close.

use super::record::OutputRecord;
use async_trait::async_trait;

#[derive(Debug)]
pub enum RecordWriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
}

impl From<std::io::Error> for RecordWriterError {
    fn from(err: std::io::Error) -> Self {
        RecordWriterError::Io(err)
    }
}

impl From<serde_json::Error> for RecordWriterError {
    fn from(err: serde_json::Error) -> Self {
        RecordWriterError::Serialization(err)
    }
}

impl From<rusqlite::Error> for RecordWriterError {
    fn from(err: rusqlite::Error) -> Self {
        RecordWriterError::Database(err.to_string())
    }
}

impl std::fmt::Display for RecordWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordWriterError::Io(e) => write!(f, "IO error: {}", e),
            RecordWriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
            RecordWriterError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for RecordWriterError {}

/// Destination for `OutputRecord` rows
#[async_trait]
pub trait RecordWriterBackend: Send {
    /// Append one row. Columns the record leaves unset stay absent (JSONL)
    /// or NULL (SQLite).
    async fn write_record(&mut self, record: &OutputRecord) -> Result<(), RecordWriterError>;

    /// Make every appended row durable, e.g. commit the pending SQLite batch
    async fn flush(&mut self) -> Result<(), RecordWriterError>;

    /// Short name shown in the startup log ("JSONL", "SQLite")
    fn backend_type(&self) -> &'static str;
}
