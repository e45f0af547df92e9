//! Letter service: templates, village info, the resident roster, and
//! finalization (archive row, rendering, download).

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use sid_api::{Backend, RenderRequest, TableQuery};
use sid_core::config::VillageConfig;
use sid_core::constants::{rpc, tables};
use sid_core::error::{SidError, SidResult};
use sid_models::{queries, Database, InfoDesa, Penduduk, SuratKeluar, TemplateSurat};

use super::draft::LetterDraft;
use crate::event_bus::{AppEvent, EventBus};
use crate::registry::CapabilitiesHandle;
use crate::service::{impl_service, ServiceState};

/// Where the letter number comes from at finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numbering {
    /// The sequence typed into the draft.
    Manual,
    /// The backend's numbering procedure.
    Remote,
}

/// A letter that has been numbered and archived.
#[derive(Debug, Clone)]
pub struct FinalizedLetter {
    pub archive: SuratKeluar,
    /// The fully substituted map sent for rendering.
    pub values: Map<String, Value>,
}

pub struct LetterService {
    state: ServiceState,
    database: Database,
    capabilities: CapabilitiesHandle,
    event_bus: EventBus,
    village: VillageConfig,
}

impl_service!(LetterService, "letter");

impl LetterService {
    pub fn new(
        database: Database,
        capabilities: CapabilitiesHandle,
        event_bus: EventBus,
        village: VillageConfig,
    ) -> Self {
        Self {
            state: ServiceState::Created,
            database,
            capabilities,
            event_bus,
            village,
        }
    }

    /// Active templates by name.
    pub async fn list_templates(&self, backend: &dyn Backend) -> SidResult<Vec<TemplateSurat>> {
        let rows = backend
            .select(tables::SURAT_TEMPLATES, &TableQuery::new().order("nama", true))
            .await?;
        let templates = rows
            .into_iter()
            .map(|row| serde_json::from_value::<TemplateSurat>(row).map_err(SidError::from))
            .collect::<SidResult<Vec<_>>>()?;
        Ok(templates
            .into_iter()
            .filter(|t| t.aktif != Some(false))
            .collect())
    }

    pub async fn get_template(&self, backend: &dyn Backend, id: &str) -> SidResult<TemplateSurat> {
        let rows = backend
            .select(tables::SURAT_TEMPLATES, &TableQuery::new().eq("id", id))
            .await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SidError::NotFound(format!("template surat {id}")))?;
        Ok(serde_json::from_value(row)?)
    }

    /// The village record with honorifics resolved. A missing record yields
    /// defaults so letters still render.
    pub async fn load_info_desa(&self, backend: &dyn Backend) -> SidResult<InfoDesa> {
        let rows = backend
            .select(tables::INFO_DESA, &TableQuery::new().range(0, 0))
            .await?;
        let info = match rows.into_iter().next() {
            Some(row) => serde_json::from_value(row)?,
            None => {
                warn!("no village record found; using defaults");
                InfoDesa::default()
            }
        };
        Ok(info.with_resolved_honorifics(&self.village))
    }

    /// The full roster from the backend, by name.
    pub async fn load_roster(&self, backend: &dyn Backend) -> SidResult<Vec<Penduduk>> {
        let rows = backend
            .select(tables::PENDUDUK, &TableQuery::new().order("nama", true))
            .await?;
        let roster = rows
            .iter()
            .map(Penduduk::from_server_map)
            .collect::<SidResult<Vec<_>>>()?;
        debug!("loaded roster of {} residents", roster.len());
        Ok(roster)
    }

    /// The roster from the local cache, for working offline.
    pub fn cached_roster(&self) -> SidResult<Vec<Penduduk>> {
        let conn = self.database.conn()?;
        queries::list_penduduk(&conn, None)
    }

    /// Start a draft for `template` dated today.
    pub async fn start_draft(
        &self,
        backend: &dyn Backend,
        template: TemplateSurat,
    ) -> SidResult<LetterDraft> {
        let info = self.load_info_desa(backend).await?;
        Ok(LetterDraft::new(template, info, chrono::Local::now().date_naive()))
    }

    /// Number and archive the letter.
    pub async fn finalize(
        &self,
        backend: &dyn Backend,
        draft: &mut LetterDraft,
        numbering: Numbering,
    ) -> SidResult<FinalizedLetter> {
        draft.ensure_complete()?;

        let nomor_urut = match numbering {
            Numbering::Manual => {
                let no = draft.sequence().value().ok_or_else(|| {
                    SidError::Validation("nomor urut surat belum diisi".into())
                })?;
                Some(no as i64)
            }
            Numbering::Remote => self.remote_number(backend, draft).await?,
        };

        let nomor_surat = draft
            .nomor_surat()
            .ok_or_else(|| SidError::Validation("nomor surat belum tersedia".into()))?;
        let values = draft.values();

        let record = SuratKeluar {
            id: None,
            template_id: draft.template().id.clone(),
            nomor_surat: nomor_surat.clone(),
            nomor_urut,
            tanggal_surat: draft.letter_date().format("%Y-%m-%d").to_string(),
            perihal: Some(draft.template().nama.clone()),
            penduduk_id: draft.primary_resident().and_then(|p| p.id.clone()),
            data: values.clone(),
            file_url: None,
            created_at: None,
        };

        let inserted = backend
            .insert(tables::SURAT_KELUAR, &serde_json::to_value(&record)?)
            .await?;
        let archive = match inserted.into_iter().next() {
            Some(row) => serde_json::from_value(row)?,
            None => record,
        };

        info!("archived letter {nomor_surat}");
        self.event_bus.emit(AppEvent::LetterGenerated {
            template_id: archive.template_id.clone(),
            nomor_surat,
        });
        Ok(FinalizedLetter { archive, values })
    }

    /// Send a finalized letter to the rendering endpoint and record the
    /// resulting file URL on the archive row.
    pub async fn render(
        &self,
        backend: &dyn Backend,
        template: &TemplateSurat,
        letter: &mut FinalizedLetter,
    ) -> SidResult<String> {
        let template_url = template
            .template_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                SidError::Validation(format!("template {} belum memiliki berkas dokumen", template.nama))
            })?;

        let request = RenderRequest {
            template_url,
            data: letter.values.clone(),
            template_id: template.id.clone(),
        };
        let file_url = backend.render(&request).await?.into_file_url()?;
        letter.archive.file_url = Some(file_url.clone());

        if let Some(id) = &letter.archive.id {
            if let Err(e) = backend
                .update(
                    tables::SURAT_KELUAR,
                    &TableQuery::new().eq("id", id),
                    &json!({ "file_url": file_url }),
                )
                .await
            {
                warn!("failed to record file url on letter {id}: {e}");
            }
        }
        Ok(file_url)
    }

    /// Download a rendered file into `dir` and return its path.
    pub async fn download_to(
        &self,
        backend: &dyn Backend,
        file_url: &str,
        dir: &Path,
        file_stem: &str,
    ) -> SidResult<PathBuf> {
        let bytes = backend.download(file_url).await?;
        let ext = file_url
            .split(&['?', '#'][..])
            .next()
            .and_then(|u| u.rsplit('/').next())
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, e)| e.to_string())
            .filter(|e| !e.is_empty() && e.len() <= 5)
            .unwrap_or_else(|| "docx".to_string());

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.{ext}", safe_file_stem(file_stem)));
        tokio::fs::write(&path, &bytes).await?;
        info!("saved letter to {}", path.display());
        Ok(path)
    }

    /// Archived letters, newest first.
    pub async fn list_archive(&self, backend: &dyn Backend, limit: usize) -> SidResult<Vec<SuratKeluar>> {
        let query = TableQuery::new()
            .order("created_at", false)
            .range(0, limit.saturating_sub(1));
        let rows = backend.select(tables::SURAT_KELUAR, &query).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(SidError::from))
            .collect()
    }

    async fn remote_number(
        &self,
        backend: &dyn Backend,
        draft: &mut LetterDraft,
    ) -> SidResult<Option<i64>> {
        if !self.capabilities.read().await.supports(rpc::GENERATE_LETTER_NUMBER) {
            return Err(SidError::Unsupported(rpc::GENERATE_LETTER_NUMBER.into()));
        }

        let args = json!({
            "p_template_id": draft.template().id,
            "p_tanggal": draft.letter_date().format("%Y-%m-%d").to_string(),
        });
        match backend.rpc(rpc::GENERATE_LETTER_NUMBER, &args).await? {
            Value::String(nomor) => {
                draft.assign_number(nomor);
                Ok(None)
            }
            Value::Number(n) => {
                let no = n
                    .as_u64()
                    .filter(|no| *no > 0)
                    .ok_or_else(|| SidError::Serialization(format!("invalid sequence number {n}")))?;
                draft.assign_sequence(no);
                Ok(Some(no as i64))
            }
            Value::Object(map) => {
                let urut = map.get("nomor_urut").and_then(Value::as_i64);
                match map.get("nomor_surat").and_then(Value::as_str) {
                    Some(nomor) => draft.assign_number(nomor.to_string()),
                    None => {
                        let no = urut.filter(|n| *n > 0).ok_or_else(|| {
                            SidError::Serialization("numbering procedure returned no number".into())
                        })?;
                        draft.assign_sequence(no as u64);
                    }
                }
                Ok(urut)
            }
            other => Err(SidError::Serialization(format!(
                "unexpected numbering result: {other}"
            ))),
        }
    }
}

/// Live filter over an in-memory roster by nama or NIK.
pub fn search_roster<'a>(roster: &'a [Penduduk], query: &str, limit: usize) -> Vec<&'a Penduduk> {
    roster
        .iter()
        .filter(|p| p.matches_query(query))
        .take(limit)
        .collect()
}

fn safe_file_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "surat".to_string()
    } else {
        cleaned
    }
}
