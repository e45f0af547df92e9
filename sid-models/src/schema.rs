//! Local cache schema definitions and table creation.
//!
//! The cache mirrors the resident roster so that search and letter
//! auto-fill work without a round-trip, and records when it was last synced.

use rusqlite::Connection;
use sid_core::error::{SidError, SidResult};
use tracing::debug;

/// Create all cache tables and indexes if they do not exist.
pub fn create_tables(conn: &Connection) -> SidResult<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| SidError::Database(format!("failed to create schema: {e}")))?;
    debug!("cache schema verified");
    Ok(())
}

/// Drop all tables (used for cache reset).
pub fn drop_tables(conn: &Connection) -> SidResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS penduduk_cache;
         DROP TABLE IF EXISTS sync_state;
         DROP TABLE IF EXISTS schema_version;",
    )
    .map_err(|e| SidError::Database(format!("failed to drop tables: {e}")))?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS penduduk_cache (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    remote_id           TEXT,
    nik                 TEXT NOT NULL UNIQUE,
    no_kk               TEXT NOT NULL,
    nama                TEXT NOT NULL,
    tempat_lahir        TEXT,
    tanggal_lahir       TEXT,
    jenis_kelamin       TEXT,
    agama               TEXT,
    pekerjaan           TEXT,
    status_perkawinan   TEXT,
    pendidikan          TEXT,
    alamat              TEXT,
    rt                  TEXT,
    rw                  TEXT,
    dusun               TEXT,
    hubungan_keluarga   TEXT,
    kewarganegaraan     TEXT
);

CREATE INDEX IF NOT EXISTS idx_penduduk_no_kk ON penduduk_cache(no_kk);
CREATE INDEX IF NOT EXISTS idx_penduduk_dusun ON penduduk_cache(dusun);

CREATE TABLE IF NOT EXISTS sync_state (
    resource        TEXT PRIMARY KEY,
    last_synced_at  TEXT,
    row_count       INTEGER NOT NULL DEFAULT 0
);
"#;
