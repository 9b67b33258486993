//! SQLite writer for output records
//!
//! Rows go to a `pulses` table whose columns follow the run's
//! `OutputSchema`. Sample arrays are stored as JSON text.

use super::record::{OutputRecord, OutputSchema};
use super::writer_backend::{RecordWriterBackend, RecordWriterError};
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

const TABLE: &str = "pulses";

pub struct SqliteRecordWriter {
    conn: Connection,
    schema: OutputSchema,
    insert_sql: String,
    batch: Vec<OutputRecord>,
    batch_size: usize,
}

impl SqliteRecordWriter {
    pub fn new(db_path: impl AsRef<Path>, schema: OutputSchema) -> Result<Self, RecordWriterError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RecordWriterError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to create database directory {}: {}", parent.display(), e),
                ))
            })?;
        }

        let conn = Connection::open(db_path.as_ref())?;

        apply_optimized_pragmas(&conn)?;

        conn.execute(&create_table_sql(&schema), [])?;
        check_existing_columns(&conn, &schema)?;

        let columns = schema.columns();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            TABLE,
            columns.join(", "),
            placeholders.join(", ")
        );

        log::info!("✅ SQLite record writer initialized: {}", db_path.as_ref().display());

        Ok(Self {
            conn,
            schema,
            insert_sql,
            batch: Vec::with_capacity(100),
            batch_size: 100,
        })
    }

    fn flush_batch(&mut self) -> Result<(), RecordWriterError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for record in &self.batch {
                stmt.execute(params_from_iter(row_values(&self.schema, record)?))?;
            }
        }
        tx.commit()?;

        log::debug!("✅ Flushed {} records to SQLite", self.batch.len());
        self.batch.clear();

        Ok(())
    }
}

impl Drop for SqliteRecordWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush_batch() {
            log::error!("Failed to flush pending records on close: {}", e);
        }
    }
}

#[async_trait]
impl RecordWriterBackend for SqliteRecordWriter {
    async fn write_record(&mut self, record: &OutputRecord) -> Result<(), RecordWriterError> {
        self.batch.push(record.clone());

        if self.batch.len() >= self.batch_size {
            self.flush_batch()?;
        }

        Ok(())
    }

    async fn flush(&mut self) -> Result<(), RecordWriterError> {
        self.flush_batch()
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

fn column_type(column: &str) -> &'static str {
    match column {
        "run" | "id" => "INTEGER NOT NULL",
        "pulse" | "gain" => "TEXT NOT NULL",
        "pedestal" => "REAL NOT NULL",
        "pedestal_rms" => "REAL",
        _ => "INTEGER",
    }
}

fn create_table_sql(schema: &OutputSchema) -> String {
    let columns: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| format!("{} {}", c, column_type(c)))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            {}
        )",
        TABLE,
        columns.join(",\n            ")
    )
}

/// Appending to a table written with another column set would mix schemas
fn check_existing_columns(conn: &Connection, schema: &OutputSchema) -> Result<(), RecordWriterError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", TABLE))?;
    let existing: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<_, _>>()?;

    let expected: Vec<&str> = std::iter::once("row_id").chain(schema.columns()).collect();
    if existing != expected {
        return Err(RecordWriterError::Database(format!(
            "table {} has columns {:?}, this run writes {:?}",
            TABLE, existing, expected
        )));
    }

    Ok(())
}

fn row_values(schema: &OutputSchema, record: &OutputRecord) -> Result<Vec<Value>, RecordWriterError> {
    let optional = |v: Option<i64>| v.map_or(Value::Null, Value::Integer);

    let mut values = vec![Value::Integer(i64::from(record.run))];
    if schema.lumi {
        values.push(optional(record.lumi.map(i64::from)));
    }
    if schema.bx {
        values.push(optional(record.bx.map(i64::from)));
    }
    values.push(Value::Integer(i64::from(record.id)));
    values.push(Value::Text(serde_json::to_string(&record.pulse)?));
    values.push(Value::Text(serde_json::to_string(&record.gain)?));
    values.push(Value::Real(f64::from(record.pedestal)));
    if schema.pedestal_rms {
        values.push(match record.pedestal_rms {
            Some(rms) if !rms.is_nan() => Value::Real(f64::from(rms)),
            _ => Value::Null,
        });
    }
    if schema.gainmask {
        values.push(optional(record.gainmask.map(i64::from)));
    }
    if schema.nevt {
        values.push(optional(record.nevt.map(i64::from)));
    }

    Ok(values)
}
