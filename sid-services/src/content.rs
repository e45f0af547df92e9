//! Public site content.

use serde::de::DeserializeOwned;
use serde_json::Value;

use sid_api::{Backend, TableQuery};
use sid_core::constants::tables;
use sid_core::error::{SidError, SidResult};
use sid_models::{Agenda, Berita, Galeri, Pengumuman};

use crate::service::{impl_service, ServiceState};

fn parse_all<T: DeserializeOwned>(rows: Vec<Value>) -> SidResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(SidError::from))
        .collect()
}

pub struct ContentService {
    state: ServiceState,
}

impl_service!(ContentService, "content");

impl Default for ContentService {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentService {
    pub fn new() -> Self {
        Self {
            state: ServiceState::Created,
        }
    }

    /// Published news, newest first.
    pub async fn list_berita(&self, backend: &dyn Backend, limit: usize) -> SidResult<Vec<Berita>> {
        let query = TableQuery::new()
            .eq("published", true)
            .order("published_at", false)
            .range(0, limit.saturating_sub(1));
        parse_all(backend.select(tables::BERITA, &query).await?)
    }

    pub async fn berita_by_slug(&self, backend: &dyn Backend, slug: &str) -> SidResult<Berita> {
        let query = TableQuery::new().eq("slug", slug).eq("published", true);
        parse_all::<Berita>(backend.select(tables::BERITA, &query).await?)?
            .into_iter()
            .next()
            .ok_or_else(|| SidError::NotFound(format!("berita '{slug}'")))
    }

    pub async fn list_galeri(&self, backend: &dyn Backend, limit: usize) -> SidResult<Vec<Galeri>> {
        let query = TableQuery::new()
            .order("created_at", false)
            .range(0, limit.saturating_sub(1));
        parse_all(backend.select(tables::GALERI, &query).await?)
    }

    /// Announcements visible on `today` (ISO date), important ones first.
    pub async fn active_pengumuman(&self, backend: &dyn Backend, today: &str) -> SidResult<Vec<Pengumuman>> {
        let query = TableQuery::new().order("tanggal_mulai", false);
        let mut items: Vec<Pengumuman> = parse_all(backend.select(tables::PENGUMUMAN, &query).await?)?;
        items.retain(|p| p.is_active_on(today));
        items.sort_by_key(|p| !p.penting);
        Ok(items)
    }

    /// Agenda items starting on or after `from` (ISO date), soonest first.
    pub async fn upcoming_agenda(&self, backend: &dyn Backend, from: &str) -> SidResult<Vec<Agenda>> {
        let query = TableQuery::new().order("waktu_mulai", true);
        let mut items: Vec<Agenda> = parse_all(backend.select(tables::AGENDA, &query).await?)?;
        items.retain(|a| a.waktu_mulai.get(..10).unwrap_or(&a.waktu_mulai) >= from);
        Ok(items)
    }
}
