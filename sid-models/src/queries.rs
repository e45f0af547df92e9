//! Query helpers over the local roster cache.
//!
//! All queries use parameterized SQL and return domain model types.

use rusqlite::{params, Connection};
use sid_core::error::{SidError, SidResult};

use crate::models::penduduk::Penduduk;

fn db_err(e: rusqlite::Error) -> SidError {
    SidError::Database(e.to_string())
}

// ─── Penduduk Queries ───────────────────────────────────────────────────────

/// Search cached residents by name (case-insensitive) or NIK prefix.
pub fn search_penduduk(conn: &Connection, query: &str, limit: i64) -> SidResult<Vec<Penduduk>> {
    let q = query.trim();
    let name_pattern = format!("%{q}%");
    let nik_pattern = format!("{q}%");

    let mut stmt = conn
        .prepare(
            "SELECT * FROM penduduk_cache
             WHERE nama LIKE ?1 COLLATE NOCASE OR nik LIKE ?2
             ORDER BY nama COLLATE NOCASE ASC
             LIMIT ?3",
        )
        .map_err(db_err)?;

    let rows = stmt
        .query_map(params![name_pattern, nik_pattern, limit], Penduduk::from_row)
        .map_err(db_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
}

/// List cached residents, optionally restricted to one dusun.
pub fn list_penduduk(conn: &Connection, dusun: Option<&str>) -> SidResult<Vec<Penduduk>> {
    let mut stmt = conn
        .prepare(
            "SELECT * FROM penduduk_cache
             WHERE (?1 IS NULL OR dusun = ?1)
             ORDER BY nama COLLATE NOCASE ASC",
        )
        .map_err(db_err)?;

    let rows = stmt.query_map([dusun], Penduduk::from_row).map_err(db_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
}

/// Members of one family card, head of family first.
pub fn list_by_no_kk(conn: &Connection, no_kk: &str) -> SidResult<Vec<Penduduk>> {
    let mut stmt = conn
        .prepare(
            "SELECT * FROM penduduk_cache
             WHERE no_kk = ?1
             ORDER BY CASE WHEN lower(hubungan_keluarga) = 'kepala keluarga' THEN 0 ELSE 1 END,
                      tanggal_lahir ASC",
        )
        .map_err(db_err)?;

    let rows = stmt.query_map([no_kk], Penduduk::from_row).map_err(db_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
}

/// Resident counts per dusun. Residents without a dusun are counted under `None`.
pub fn count_by_dusun(conn: &Connection) -> SidResult<Vec<(Option<String>, i64)>> {
    let mut stmt = conn
        .prepare(
            "SELECT NULLIF(trim(dusun), ''), COUNT(*) FROM penduduk_cache
             GROUP BY NULLIF(trim(dusun), '')
             ORDER BY 1 ASC",
        )
        .map_err(db_err)?;

    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(db_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
}

/// Remove every cached resident. Returns the number of rows deleted.
pub fn delete_all_penduduk(conn: &Connection) -> SidResult<usize> {
    conn.execute("DELETE FROM penduduk_cache", []).map_err(db_err)
}

// ─── Sync Bookkeeping ───────────────────────────────────────────────────────

/// Timestamp of the last successful sync of `resource`.
pub fn last_synced_at(conn: &Connection, resource: &str) -> SidResult<Option<String>> {
    match conn.query_row(
        "SELECT last_synced_at FROM sync_state WHERE resource = ?1",
        [resource],
        |row| row.get::<_, Option<String>>(0),
    ) {
        Ok(ts) => Ok(ts),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(db_err(e)),
    }
}

/// Record a completed sync of `resource`.
pub fn record_sync(conn: &Connection, resource: &str, synced_at: &str, row_count: i64) -> SidResult<()> {
    conn.execute(
        "INSERT INTO sync_state (resource, last_synced_at, row_count) VALUES (?1, ?2, ?3)
         ON CONFLICT(resource) DO UPDATE SET
            last_synced_at = excluded.last_synced_at,
            row_count = excluded.row_count",
        params![resource, synced_at, row_count],
    )
    .map_err(db_err)?;
    Ok(())
}
