//! Resident service: remote CRUD plus the local roster cache.

use serde_json::Value;
use tracing::{debug, info};

use sid_api::{Backend, TableQuery};
use sid_core::constants::tables;
use sid_core::error::{SidError, SidResult};
use sid_models::db::DatabaseStats;
use sid_models::validation::validate_penduduk;
use sid_models::{queries, Database, Penduduk};

use crate::event_bus::{AppEvent, EventBus};
use crate::service::{impl_service, ServiceState};
use crate::session::{within_scope, AuthHandle};

/// Listing filters.
#[derive(Debug, Clone, Default)]
pub struct ResidentFilter {
    pub dusun: Option<String>,
    /// `L` or `P`.
    pub jenis_kelamin: Option<String>,
    /// Substring of nama or NIK.
    pub search: Option<String>,
}

pub struct ResidentService {
    state: ServiceState,
    database: Database,
    auth: AuthHandle,
    event_bus: EventBus,
}

impl_service!(ResidentService, "resident");

/// Characters that would break a PostgREST `or=(...)` expression.
fn sanitize_search(q: &str) -> String {
    q.chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '%' | '"'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn parse_rows(rows: Vec<Value>) -> SidResult<Vec<Penduduk>> {
    rows.iter().map(Penduduk::from_server_map).collect()
}

fn require_valid(p: &Penduduk) -> SidResult<()> {
    let issues = validate_penduduk(p);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(SidError::Validation(
            issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "),
        ))
    }
}

impl ResidentService {
    pub fn new(database: Database, auth: AuthHandle, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            database,
            auth,
            event_bus,
        }
    }

    /// Residents matching `filter`, by name. A kadus only sees its own dusun.
    pub async fn list(&self, backend: &dyn Backend, filter: &ResidentFilter) -> SidResult<Vec<Penduduk>> {
        let scope = self.auth.read().await.dusun_scope();
        if matches!(scope.as_deref(), Some(s) if s.trim().is_empty()) {
            debug!("kadus without dusun; returning no residents");
            return Ok(Vec::new());
        }

        let mut query = TableQuery::new().order("nama", true);
        if let Some(dusun) = scope.as_deref().or(filter.dusun.as_deref()) {
            query = query.eq("dusun", dusun);
        }
        if let Some(jk) = filter.jenis_kelamin.as_deref().filter(|j| !j.is_empty()) {
            query = query.eq("jenis_kelamin", jk);
        }
        if let Some(q) = filter.search.as_deref().map(sanitize_search).filter(|q| !q.is_empty()) {
            query = query.or(&format!("nama.ilike.*{q}*,nik.ilike.*{q}*"));
        }

        let mut residents = parse_rows(backend.select(tables::PENDUDUK, &query).await?)?;
        if scope.is_some() {
            residents.retain(|p| within_scope(scope.as_deref(), p.dusun.as_deref()));
        }
        Ok(residents)
    }

    pub async fn get(&self, backend: &dyn Backend, nik: &str) -> SidResult<Penduduk> {
        let rows = backend
            .select(tables::PENDUDUK, &TableQuery::new().eq("nik", nik))
            .await?;
        parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| SidError::NotFound(format!("penduduk NIK {nik}")))
    }

    pub async fn create(&self, backend: &dyn Backend, resident: &Penduduk) -> SidResult<Penduduk> {
        require_valid(resident)?;
        let rows = backend
            .insert(tables::PENDUDUK, &serde_json::to_value(resident)?)
            .await?;
        let created = parse_rows(rows)?.into_iter().next().unwrap_or_else(|| resident.clone());
        self.cache_one(&created);
        info!("created resident {}", created.nik);
        self.event_bus.emit(AppEvent::ResidentChanged { nik: created.nik.clone() });
        Ok(created)
    }

    pub async fn update(&self, backend: &dyn Backend, nik: &str, resident: &Penduduk) -> SidResult<Penduduk> {
        require_valid(resident)?;
        let rows = backend
            .update(
                tables::PENDUDUK,
                &TableQuery::new().eq("nik", nik),
                &serde_json::to_value(resident)?,
            )
            .await?;
        let updated = parse_rows(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| SidError::NotFound(format!("penduduk NIK {nik}")))?;
        if updated.nik != nik {
            self.uncache(nik);
        }
        self.cache_one(&updated);
        info!("updated resident {nik}");
        self.event_bus.emit(AppEvent::ResidentChanged { nik: updated.nik.clone() });
        Ok(updated)
    }

    pub async fn delete(&self, backend: &dyn Backend, nik: &str) -> SidResult<()> {
        let rows = backend
            .delete(tables::PENDUDUK, &TableQuery::new().eq("nik", nik))
            .await?;
        if rows.is_empty() {
            return Err(SidError::NotFound(format!("penduduk NIK {nik}")));
        }
        self.uncache(nik);
        info!("deleted resident {nik}");
        self.event_bus.emit(AppEvent::ResidentChanged { nik: nik.to_string() });
        Ok(())
    }

    /// Replace the local roster with the backend's. Returns the row count.
    pub async fn sync_cache(&self, backend: &dyn Backend) -> SidResult<usize> {
        let rows = backend
            .select(tables::PENDUDUK, &TableQuery::new().order("nama", true))
            .await?;
        let residents = parse_rows(rows)?;
        let count = residents.len();
        let synced_at = chrono::Utc::now().to_rfc3339();

        self.database.transaction(|conn| {
            queries::delete_all_penduduk(conn)?;
            for resident in &residents {
                resident.save(conn)?;
            }
            queries::record_sync(conn, "penduduk", &synced_at, count as i64)
        })?;

        info!("roster cache synced: {count} residents");
        self.event_bus.emit(AppEvent::RosterSynced { count });
        Ok(count)
    }

    /// Search the local cache by name or NIK prefix.
    pub fn search_cached(&self, query: &str, limit: i64) -> SidResult<Vec<Penduduk>> {
        let conn = self.database.conn()?;
        queries::search_penduduk(&conn, query, limit)
    }

    pub fn cache_stats(&self) -> SidResult<DatabaseStats> {
        self.database.stats()
    }

    fn cache_one(&self, resident: &Penduduk) {
        let result = self.database.conn().and_then(|conn| resident.save(&conn));
        if let Err(e) = result {
            debug!("roster cache not updated for {}: {e}", resident.nik);
        }
    }

    fn uncache(&self, nik: &str) {
        let result = self.database.conn().and_then(|conn| {
            conn.execute("DELETE FROM penduduk_cache WHERE nik = ?1", [nik])
                .map_err(|e| SidError::Database(e.to_string()))
        });
        if let Err(e) = result {
            debug!("roster cache entry {nik} not removed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_search() {
        assert_eq!(sanitize_search(" budi,(x) "), "budix");
        assert_eq!(sanitize_search("33010*"), "33010");
    }

    #[test]
    fn test_require_valid() {
        let ok = Penduduk {
            nik: "3301010101010001".into(),
            no_kk: "3301010101010000".into(),
            nama: "Budi".into(),
            ..Default::default()
        };
        assert!(require_valid(&ok).is_ok());
        let bad = Penduduk { nik: "1".into(), ..ok };
        assert!(matches!(require_valid(&bad), Err(SidError::Validation(_))));
    }
}
