//! Form data service: loading and mutating submissions of runtime-defined forms.
//!
//! Reads go through the join procedure when the backend advertises it and
//! through an embedded-resource select otherwise. Updates and deletes use the
//! permission-checked procedures when available. Images that a mutation
//! replaces or removes are deleted from storage on a best-effort basis.

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use sid_api::endpoints::storage::object_path_from_public_url;
use sid_api::{Backend, Capabilities, TableQuery};
use sid_core::constants::{rpc, tables};
use sid_core::error::{SidError, SidResult};
use sid_models::{FormDefinition, FormSubmission};

use crate::event_bus::{AppEvent, EventBus};
use crate::grid::value::text_of;
use crate::registry::CapabilitiesHandle;
use crate::service::{impl_service, ServiceState};
use crate::session::{within_scope, AuthHandle};

/// How a failed grid action is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureView {
    /// Switch to the dedicated access-denied view.
    AccessDenied,
    /// Show a transient message; the grid keeps its previous state.
    Toast(String),
}

impl From<&SidError> for FailureView {
    fn from(err: &SidError) -> Self {
        if err.is_permission_denied() {
            FailureView::AccessDenied
        } else {
            FailureView::Toast(err.user_message())
        }
    }
}

pub struct FormDataService {
    state: ServiceState,
    auth: AuthHandle,
    capabilities: CapabilitiesHandle,
    event_bus: EventBus,
    bucket: String,
}

impl_service!(FormDataService, "form_data");

impl FormDataService {
    pub fn new(
        auth: AuthHandle,
        capabilities: CapabilitiesHandle,
        event_bus: EventBus,
        bucket: String,
    ) -> Self {
        Self {
            state: ServiceState::Created,
            auth,
            capabilities,
            event_bus,
            bucket,
        }
    }

    /// All form definitions, newest first.
    pub async fn list_forms(&self, backend: &dyn Backend) -> SidResult<Vec<FormDefinition>> {
        let rows = backend
            .select(tables::FORM_TUGAS, &TableQuery::new().order("created_at", false))
            .await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(SidError::from))
            .collect()
    }

    pub async fn get_form(&self, backend: &dyn Backend, form_id: &str) -> SidResult<FormDefinition> {
        let rows = backend
            .select(tables::FORM_TUGAS, &TableQuery::new().eq("id", form_id))
            .await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SidError::NotFound(format!("formulir {form_id}")))?;
        Ok(serde_json::from_value(row)?)
    }

    /// Submissions of `form_id` joined with their residents, oldest first,
    /// limited to the caller's dusun for a kadus.
    pub async fn load_submissions(
        &self,
        backend: &dyn Backend,
        form_id: &str,
    ) -> SidResult<Vec<FormSubmission>> {
        let caps = self.capabilities.read().await.clone();
        let rows: Vec<Value> = if caps.supports(rpc::FORM_DATA_WITH_PENDUDUK) {
            let result = backend
                .rpc(rpc::FORM_DATA_WITH_PENDUDUK, &json!({ "p_form_id": form_id }))
                .await?;
            match result {
                Value::Array(rows) => rows,
                Value::Null => Vec::new(),
                other => vec![other],
            }
        } else {
            let query = TableQuery::new()
                .select("*,penduduk(*)")
                .eq("form_id", form_id)
                .order("created_at", true);
            backend.select(tables::FORM_TUGAS_DATA, &query).await?
        };

        let mut submissions = rows
            .into_iter()
            .map(|row| serde_json::from_value::<FormSubmission>(row).map_err(SidError::from))
            .collect::<SidResult<Vec<_>>>()?;

        if let Some(scope) = self.auth.read().await.dusun_scope() {
            let before = submissions.len();
            submissions.retain(|s| {
                within_scope(
                    Some(&scope),
                    s.penduduk.as_ref().and_then(|p| p.dusun.as_deref()),
                )
            });
            debug!("dusun scope '{scope}' kept {} of {before} submissions", submissions.len());
        }

        info!("loaded {} submissions for form {form_id}", submissions.len());
        Ok(submissions)
    }

    /// Apply `changes` to a submission and return the stored result.
    ///
    /// Every changed key must be a field of `form` and pass its validation.
    /// An empty string or null clears the value.
    pub async fn update_submission(
        &self,
        backend: &dyn Backend,
        form: &FormDefinition,
        current: &FormSubmission,
        changes: Map<String, Value>,
    ) -> SidResult<FormSubmission> {
        for (key, value) in &changes {
            let field = form
                .field(key)
                .ok_or_else(|| SidError::Validation(format!("kolom '{key}' tidak ada di formulir")))?;
            field.validate(&text_of(value))?;
        }

        let mut merged = current.data.clone();
        for (key, value) in changes {
            if is_blank(&value) {
                merged.remove(&key);
            } else {
                merged.insert(key, value);
            }
        }

        let caps = self.capabilities.read().await.clone();
        let stored = self.store_update(backend, &caps, &current.id, &merged).await?;

        let mut updated: FormSubmission = match stored {
            Some(row) => serde_json::from_value(row)?,
            None => FormSubmission { data: merged, ..current.clone() },
        };
        if updated.penduduk.is_none() {
            updated.penduduk = current.penduduk.clone();
        }

        let stale = replaced_images(form, &current.data, &updated.data);
        self.cleanup_files(backend, &stale).await;

        self.event_bus.emit(AppEvent::FormDataUpdated {
            form_id: form.id.clone(),
            submission_id: current.id.clone(),
        });
        info!("updated submission {} of form {}", current.id, form.id);
        Ok(updated)
    }

    /// Delete a submission and its uploaded images.
    pub async fn delete_submission(
        &self,
        backend: &dyn Backend,
        form: &FormDefinition,
        current: &FormSubmission,
    ) -> SidResult<()> {
        let caps = self.capabilities.read().await.clone();
        if caps.supports(rpc::DELETE_FORM_DATA) {
            backend
                .rpc(rpc::DELETE_FORM_DATA, &json!({ "p_id": current.id }))
                .await?;
        } else {
            let deleted = backend
                .delete(tables::FORM_TUGAS_DATA, &TableQuery::new().eq("id", &current.id))
                .await?;
            if deleted.is_empty() {
                return Err(SidError::NotFound(format!("data formulir {}", current.id)));
            }
        }

        let empty = Map::new();
        let stale = replaced_images(form, &current.data, &empty);
        self.cleanup_files(backend, &stale).await;

        self.event_bus.emit(AppEvent::FormDataDeleted {
            form_id: form.id.clone(),
            submission_id: current.id.clone(),
        });
        info!("deleted submission {} of form {}", current.id, form.id);
        Ok(())
    }

    /// Upload an image for a form field and return its public URL.
    pub async fn upload_image(
        &self,
        backend: &dyn Backend,
        form_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> SidResult<String> {
        if bytes.is_empty() {
            return Err(SidError::Validation("berkas gambar kosong".into()));
        }
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, e)| e.to_lowercase())
            .filter(|e| !e.is_empty() && e.len() <= 5)
            .unwrap_or_else(|| "jpg".to_string());
        let path = format!("{form_id}/{}.{ext}", Uuid::new_v4());
        let stored = backend.upload(&self.bucket, &path, bytes, mime).await?;
        Ok(backend.public_url(&self.bucket, &stored))
    }

    async fn store_update(
        &self,
        backend: &dyn Backend,
        caps: &Capabilities,
        id: &str,
        data: &Map<String, Value>,
    ) -> SidResult<Option<Value>> {
        if caps.supports(rpc::UPDATE_FORM_DATA) {
            let result = backend
                .rpc(rpc::UPDATE_FORM_DATA, &json!({ "p_id": id, "p_data": data }))
                .await?;
            return Ok(match result {
                Value::Array(rows) => rows.into_iter().next(),
                Value::Object(_) => Some(result),
                _ => None,
            });
        }

        let rows = backend
            .update(
                tables::FORM_TUGAS_DATA,
                &TableQuery::new().eq("id", id),
                &json!({ "data": data }),
            )
            .await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row)),
            None => Err(SidError::NotFound(format!("data formulir {id}"))),
        }
    }

    async fn cleanup_files(&self, backend: &dyn Backend, urls: &[String]) {
        for url in urls {
            let path = object_path_from_public_url(url, &self.bucket).unwrap_or_else(|| url.clone());
            if let Err(e) = backend.remove(&self.bucket, std::slice::from_ref(&path)).await {
                warn!("failed to remove stored file {path}: {e}");
                self.event_bus.emit(AppEvent::FileCleanupFailed {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Image values present in `before` that `after` no longer holds.
fn replaced_images(
    form: &FormDefinition,
    before: &Map<String, Value>,
    after: &Map<String, Value>,
) -> Vec<String> {
    form.image_fields()
        .filter_map(|f| {
            let old = before.get(&f.name).map(text_of).filter(|s| !s.is_empty())?;
            let new = after.get(&f.name).map(text_of).unwrap_or_default();
            (old != new).then_some(old)
        })
        .collect()
}
