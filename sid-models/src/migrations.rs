//! Versioned cache migrations.
//!
//! Migrations run sequentially from the stored version to the latest.
//! Each migration is idempotent.

use rusqlite::Connection;
use tracing::{info, warn};
use sid_core::error::{SidError, SidResult};
use sid_core::constants::DB_SCHEMA_VERSION;

/// Run all pending migrations on the database.
pub fn run_migrations(conn: &Connection) -> SidResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version >= DB_SCHEMA_VERSION {
        return Ok(());
    }

    info!("running cache migrations from version {current_version} to {DB_SCHEMA_VERSION}");

    for version in (current_version + 1)..=DB_SCHEMA_VERSION {
        run_migration(conn, version)?;
    }

    set_schema_version(conn, DB_SCHEMA_VERSION)?;
    Ok(())
}

fn get_schema_version(conn: &Connection) -> SidResult<i32> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .map_err(|e| SidError::Migration(e.to_string()))?;

    if count == 0 {
        conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])
            .map_err(|e| SidError::Migration(e.to_string()))?;
        return Ok(0);
    }

    conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .map_err(|e| SidError::Migration(e.to_string()))
}

fn set_schema_version(conn: &Connection, version: i32) -> SidResult<()> {
    conn.execute("UPDATE schema_version SET version = ?1", [version])
        .map_err(|e| SidError::Migration(e.to_string()))?;
    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> SidResult<()> {
    match version {
        1 => migration_v1(conn),
        2 => migration_v2(conn),
        _ => {
            warn!("unknown migration version {version}, skipping");
            Ok(())
        }
    }
}

/// v1: seed the sync bookkeeping row for the roster.
fn migration_v1(conn: &Connection) -> SidResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO sync_state (resource, last_synced_at, row_count) VALUES ('penduduk', NULL, 0)",
        [],
    )
    .map_err(|e| SidError::Migration(e.to_string()))?;
    Ok(())
}

/// v2: case-insensitive name lookups for roster search.
fn migration_v2(conn: &Connection) -> SidResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_penduduk_nama_nocase ON penduduk_cache(nama COLLATE NOCASE);",
    )
    .map_err(|e| SidError::Migration(e.to_string()))?;
    Ok(())
}
