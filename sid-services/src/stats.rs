//! Population statistics.
//!
//! The backend procedure is the source of truth. Figures computed from the
//! local cache are only produced when asked for explicitly.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use sid_api::Backend;
use sid_core::constants::rpc;
use sid_core::error::{SidError, SidResult};
use sid_models::{queries, Database};

use crate::registry::CapabilitiesHandle;
use crate::service::{impl_service, ServiceState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DusunCount {
    #[serde(default)]
    pub dusun: Option<String>,
    #[serde(default, alias = "count", alias = "total")]
    pub jumlah: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationStats {
    #[serde(default, alias = "total_penduduk")]
    pub total: i64,
    #[serde(default, alias = "laki")]
    pub laki_laki: i64,
    #[serde(default)]
    pub perempuan: i64,
    #[serde(default, alias = "total_kk", alias = "jumlah_kk")]
    pub keluarga: i64,
    #[serde(default, alias = "dusun")]
    pub per_dusun: Vec<DusunCount>,
}

impl PopulationStats {
    /// Parse the procedure result, which may be an object or a one-row array.
    pub fn from_value(value: Value) -> SidResult<Self> {
        let row = match value {
            Value::Array(rows) => rows.into_iter().next().unwrap_or(Value::Null),
            other => other,
        };
        if row.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(row)?)
    }
}

pub struct StatsService {
    state: ServiceState,
    database: Database,
    capabilities: CapabilitiesHandle,
}

impl_service!(StatsService, "stats");

impl StatsService {
    pub fn new(database: Database, capabilities: CapabilitiesHandle) -> Self {
        Self {
            state: ServiceState::Created,
            database,
            capabilities,
        }
    }

    /// Statistics from the backend procedure.
    pub async fn fetch(&self, backend: &dyn Backend) -> SidResult<PopulationStats> {
        if !self.capabilities.read().await.supports(rpc::POPULATION_STATS) {
            return Err(SidError::Unsupported(rpc::POPULATION_STATS.into()));
        }
        let value = backend.rpc(rpc::POPULATION_STATS, &json!({})).await?;
        let stats = PopulationStats::from_value(value)?;
        info!("population stats: {} residents", stats.total);
        Ok(stats)
    }

    /// Statistics computed from the local roster cache.
    pub fn local(&self) -> SidResult<PopulationStats> {
        let conn = self.database.conn()?;
        let residents = queries::list_penduduk(&conn, None)?;
        let cache = self.database.stats()?;
        let per_dusun = queries::count_by_dusun(&conn)?
            .into_iter()
            .map(|(dusun, jumlah)| DusunCount { dusun, jumlah })
            .collect();

        let count_jk = |jk: &str| {
            residents
                .iter()
                .filter(|p| p.jenis_kelamin.as_deref() == Some(jk))
                .count() as i64
        };

        Ok(PopulationStats {
            total: residents.len() as i64,
            laki_laki: count_jk("L"),
            perempuan: count_jk("P"),
            keluarga: cache.keluarga,
            per_dusun,
        })
    }
}
