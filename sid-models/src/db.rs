//! Cache database initialization, connection pooling, and lifecycle.
//!
//! SQLite in WAL mode behind an r2d2 pool. Runs an integrity check on
//! startup when configured, then creates the schema and applies migrations.

use std::path::Path;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{info, warn, error};

use sid_core::error::{SidError, SidResult};
use sid_core::config::DatabaseConfig;

use crate::schema;
use crate::migrations;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database wrapper providing initialization, pooling, and lifecycle management.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DbPool>,
}

impl Database {
    /// Open (creating if needed) the cache at `db_path`.
    pub fn init(db_path: &Path, config: &DatabaseConfig) -> SidResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("opening roster cache at {}", db_path.display());

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
            }))
            .build(manager)
            .map_err(|e| SidError::Pool(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
        };

        if config.integrity_check_on_startup {
            db.run_integrity_check()?;
        }

        {
            let conn = db.conn()?;
            schema::create_tables(&conn)?;
            migrations::run_migrations(&conn)?;
        }

        Ok(db)
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> SidResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| SidError::Pool(e.to_string()))
    }

    /// Run a SQLite integrity check.
    pub fn run_integrity_check(&self) -> SidResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(|e| SidError::Database(e.to_string()))?;

        if result != "ok" {
            error!("cache integrity check failed: {result}");
            return Err(SidError::IntegrityCheck(result));
        }
        Ok(())
    }

    /// Execute a function within a database transaction.
    pub fn transaction<T, F>(&self, f: F) -> SidResult<T>
    where
        F: FnOnce(&Connection) -> SidResult<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| SidError::Database(e.to_string()))?;

        let result = f(&tx)?;

        tx.commit()
            .map_err(|e| SidError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Row counts and last sync time.
    pub fn stats(&self) -> SidResult<DatabaseStats> {
        let conn = self.conn()?;
        let penduduk: i64 = conn
            .query_row("SELECT COUNT(*) FROM penduduk_cache", [], |row| row.get(0))
            .map_err(|e| SidError::Database(e.to_string()))?;
        let keluarga: i64 = conn
            .query_row("SELECT COUNT(DISTINCT no_kk) FROM penduduk_cache", [], |row| row.get(0))
            .map_err(|e| SidError::Database(e.to_string()))?;
        let last_synced_at = crate::queries::last_synced_at(&conn, "penduduk")?;

        Ok(DatabaseStats {
            penduduk,
            keluarga,
            last_synced_at,
        })
    }

    /// Drop and recreate all cache tables.
    pub fn reset(&self) -> SidResult<()> {
        warn!("resetting roster cache");
        let conn = self.conn()?;
        schema::drop_tables(&conn)?;
        schema::create_tables(&conn)?;
        migrations::run_migrations(&conn)?;
        Ok(())
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub penduduk: i64,
    pub keluarga: i64,
    pub last_synced_at: Option<String>,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "penduduk={}, keluarga={}, last_synced_at={}",
            self.penduduk,
            self.keluarga,
            self.last_synced_at.as_deref().unwrap_or("never")
        )
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        if self.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;",
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::init(&path, &DatabaseConfig::default()).unwrap();
        (db, dir)
    }

    #[test]
    fn test_database_init() {
        let (db, _dir) = test_db();
        let stats = db.stats().unwrap();
        assert_eq!(stats.penduduk, 0);
        assert!(stats.last_synced_at.is_none());
    }

    #[test]
    fn test_transaction_and_reset() {
        let (db, _dir) = test_db();
        let inserted = db.transaction(|conn| {
            conn.execute(
                "INSERT INTO penduduk_cache (nik, no_kk, nama) VALUES (?1, ?2, ?3)",
                rusqlite::params!["3201010101900001", "3201010101900100", "Budi"],
            )
            .map_err(|e| SidError::Database(e.to_string()))
        });
        assert_eq!(inserted.unwrap(), 1);
        assert_eq!(db.stats().unwrap().keluarga, 1);

        db.reset().unwrap();
        assert_eq!(db.stats().unwrap().penduduk, 0);
    }
}
