//! JSONL writer for output records - one serialized row per line

use super::record::OutputRecord;
use super::writer_backend::{RecordWriterBackend, RecordWriterError};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct JsonlRecordWriter {
    file: BufWriter<File>,
    rows_written: u64,
}

impl JsonlRecordWriter {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, RecordWriterError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        log::info!("📝 Writing records to: {}", path.display());

        Ok(Self {
            file: BufWriter::new(file),
            rows_written: 0,
        })
    }

    pub fn write_line(&mut self, record: &OutputRecord) -> Result<(), RecordWriterError> {
        let json = serde_json::to_string(record)?;
        writeln!(self.file, "{}", json)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl Drop for JsonlRecordWriter {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}

#[async_trait]
impl RecordWriterBackend for JsonlRecordWriter {
    async fn write_record(&mut self, record: &OutputRecord) -> Result<(), RecordWriterError> {
        self.write_line(record)
    }

    async fn flush(&mut self) -> Result<(), RecordWriterError> {
        self.file.flush()?;
        log::debug!("✅ Flushed JSONL output ({} rows)", self.rows_written);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}
