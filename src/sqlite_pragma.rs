//! Connection tuning shared by SQLite writers
//!
//! WAL journal, NORMAL sync, in-memory temp store, 256 MB mmap, 64 MB page
//! cache and a 1000-page autocheckpoint.

use rusqlite::Connection;

pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    // journal_mode returns a row, so it cannot go through execute_batch
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

    conn.execute_batch(
        "PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;
         PRAGMA mmap_size = 268435456;
         PRAGMA cache_size = -64000;
         PRAGMA wal_autocheckpoint = 1000;",
    )?;

    Ok(())
}
