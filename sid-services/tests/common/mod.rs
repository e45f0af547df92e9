//! Shared test utilities for sid-services integration tests.
//!
//! Provides a temp roster cache, a config handle backed by a temp file, and
//! `FakeBackend`, an in-memory stand-in for the hosted backend.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tokio::sync::RwLock;

use sid_api::query::filter_value;
use sid_api::{AuthUser, Backend, Capabilities, Filter, RenderRequest, RenderResponse, Session, TableQuery};
use sid_core::config::{AppConfig, ConfigHandle, DatabaseConfig};
use sid_core::constants::STORAGE_PREFIX;
use sid_core::error::{SidError, SidResult};
use sid_models::{Database, Penduduk, Role, UserProfile};
use sid_services::event_bus::EventBus;
use sid_services::session::{AuthContext, AuthHandle};
use sid_services::CapabilitiesHandle;

pub const PASSWORD: &str = "rahasia";
pub const RENDERED_URL: &str = "https://render.desa.test/out/surat-001.docx";

/// Create a temporary roster cache for testing.
/// Returns the Database and the TempDir (which must be kept alive).
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let config = DatabaseConfig {
        pool_size: 2,
        wal_mode: true,
        integrity_check_on_startup: false,
        ..Default::default()
    };
    let db = Database::init(&db_path, &config).expect("failed to init test database");
    (db, dir)
}

/// Create a config handle that saves into `dir`.
pub fn create_test_config_handle(dir: &TempDir) -> ConfigHandle {
    ConfigHandle::with_path(AppConfig::default(), dir.path().join("config.toml"))
}

pub fn create_test_event_bus() -> EventBus {
    EventBus::new(64)
}

pub fn capabilities(procedures: &[&str]) -> CapabilitiesHandle {
    Arc::new(RwLock::new(Capabilities::new(procedures.iter().copied())))
}

/// An auth context signed in as `role`.
pub fn auth_as(role: Role, dusun: Option<&str>) -> AuthHandle {
    Arc::new(RwLock::new(signed_in(role, dusun)))
}

pub fn signed_in(role: Role, dusun: Option<&str>) -> AuthContext {
    AuthContext {
        session: Some(Session {
            access_token: "tok-admin".into(),
            refresh_token: String::new(),
            expires_in: None,
            user: AuthUser {
                id: "user-1".into(),
                email: Some("admin@desa.test".into()),
            },
        }),
        profile: Some(UserProfile {
            id: "user-1".into(),
            email: Some("admin@desa.test".into()),
            role,
            dusun: dusun.map(String::from),
            ..Default::default()
        }),
    }
}

pub fn penduduk(nik: &str, nama: &str, dusun: &str) -> Penduduk {
    Penduduk {
        id: Some(format!("p-{nik}")),
        nik: nik.into(),
        no_kk: format!("{}0000", &nik[..12]),
        nama: nama.into(),
        tempat_lahir: Some("Cilacap".into()),
        tanggal_lahir: Some("1980-05-01".into()),
        jenis_kelamin: Some("L".into()),
        dusun: Some(dusun.into()),
        rt: Some("001".into()),
        rw: Some("002".into()),
        hubungan_keluarga: Some("Kepala Keluarga".into()),
        ..Default::default()
    }
}

pub fn penduduk_json(nik: &str, nama: &str, dusun: &str) -> Value {
    let mut value = serde_json::to_value(penduduk(nik, nama, dusun)).expect("penduduk json");
    value["id"] = json!(format!("p-{nik}"));
    value
}

/// In-memory backend.
///
/// Tables are plain JSON rows. Filters understand eq/neq/ilike/in/is-null
/// and simple `or` expressions; `penduduk(*)` embeds are resolved through
/// `penduduk_id`.
#[derive(Default)]
pub struct FakeBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    rpc_results: Mutex<HashMap<String, Value>>,
    rpc_errors: Mutex<HashMap<String, (u16, String)>>,
    pub rpc_calls: Mutex<Vec<(String, Value)>>,
    capabilities: Mutex<Capabilities>,
    failing_inserts: Mutex<HashSet<usize>>,
    insert_count: AtomicUsize,
    denied_tables: Mutex<HashSet<String>>,
    fail_removals: AtomicBool,
    pub removed: Mutex<Vec<String>>,
    pub uploaded: Mutex<Vec<(String, String, usize)>>,
    pub rendered: Mutex<Vec<RenderRequest>>,
    pub updates: Mutex<Vec<(String, Value)>>,
    token: Mutex<Option<String>>,
    expired: AtomicBool,
    next_id: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(self, procedures: &[&str]) -> Self {
        *self.capabilities.lock().unwrap() = Capabilities::new(procedures.iter().copied());
        self
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    pub fn rpc_returns(&self, name: &str, value: Value) {
        self.rpc_results.lock().unwrap().insert(name.to_string(), value);
    }

    pub fn rpc_fails(&self, name: &str, status: u16, message: &str) {
        self.rpc_errors
            .lock()
            .unwrap()
            .insert(name.to_string(), (status, message.to_string()));
    }

    pub fn rpc_call_names(&self) -> Vec<String> {
        self.rpc_calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    /// Make the `n`th insert call (zero-based) fail with a conflict.
    pub fn fail_insert_call(&self, n: usize) {
        self.failing_inserts.lock().unwrap().insert(n);
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_count.load(Ordering::SeqCst)
    }

    /// Mutations on `table` are refused as if by row-level security.
    pub fn deny_table(&self, table: &str) {
        self.denied_tables.lock().unwrap().insert(table.to_string());
    }

    pub fn fail_removals(&self) {
        self.fail_removals.store(true, Ordering::SeqCst);
    }

    /// Treat any stored access token as expired.
    pub fn expire_tokens(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }

    pub fn access_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    pub fn image_url(&self, bucket: &str, path: &str) -> String {
        self.public_url(bucket, path)
    }

    fn check_denied(&self, table: &str) -> SidResult<()> {
        if self.denied_tables.lock().unwrap().contains(table) {
            return Err(SidError::from_backend(
                403,
                Some("42501".into()),
                format!("permission denied for table {table}"),
            ));
        }
        Ok(())
    }

    fn embed(&self, mut row: Value) -> Value {
        let pid = row.get("penduduk_id").and_then(Value::as_str).map(String::from);
        let joined = pid.and_then(|pid| {
            self.rows("penduduk")
                .into_iter()
                .find(|p| p.get("id").and_then(Value::as_str) == Some(pid.as_str()))
        });
        row["penduduk"] = joined.unwrap_or(Value::Null);
        row
    }
}

fn column_text(row: &Value, column: &str) -> Option<String> {
    row.get(column).filter(|v| !v.is_null()).map(filter_value)
}

fn ilike(haystack: Option<String>, pattern: &str) -> bool {
    let needle = pattern.trim_matches(&['%', '*'][..]).to_lowercase();
    haystack.map_or(false, |h| h.to_lowercase().contains(&needle))
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(col, v) => column_text(row, col).as_deref() == Some(v.as_str()),
        Filter::Neq(col, v) => column_text(row, col).as_deref() != Some(v.as_str()),
        Filter::ILike(col, p) => ilike(column_text(row, col), p),
        Filter::In(col, values) => column_text(row, col).map_or(false, |v| values.contains(&v)),
        Filter::IsNull(col) => column_text(row, col).is_none(),
        Filter::Or(expr) => expr.split(',').any(|part| {
            let mut it = part.splitn(3, '.');
            match (it.next(), it.next(), it.next()) {
                (Some(col), Some("ilike"), Some(p)) => ilike(column_text(row, col), p),
                (Some(col), Some("eq"), Some(v)) => column_text(row, col).as_deref() == Some(v),
                _ => false,
            }
        }),
    }
}

fn matches_all(row: &Value, query: &TableQuery) -> bool {
    query.filters().iter().all(|f| matches(row, f))
}

#[async_trait]
impl Backend for FakeBackend {
    async fn select(&self, table: &str, query: &TableQuery) -> SidResult<Vec<Value>> {
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| matches_all(row, query))
            .collect();

        for (col, asc) in query.ordering().iter().rev() {
            rows.sort_by(|a, b| {
                let ord = column_text(a, col).cmp(&column_text(b, col));
                if *asc { ord } else { ord.reverse() }
            });
        }
        if let Some((from, to)) = query.row_range() {
            rows = rows.into_iter().skip(from).take(to - from + 1).collect();
        }
        if query.columns().map_or(false, |c| c.contains("penduduk(")) {
            rows = rows.into_iter().map(|row| self.embed(row)).collect();
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: &Value) -> SidResult<Vec<Value>> {
        self.check_denied(table)?;
        let call = self.insert_count.fetch_add(1, Ordering::SeqCst);
        if self.failing_inserts.lock().unwrap().contains(&call) {
            return Err(SidError::from_backend(
                409,
                Some("23505".into()),
                "duplicate key value violates unique constraint".into(),
            ));
        }

        let batch = match rows {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        };
        let mut stored = Vec::with_capacity(batch.len());
        for mut row in batch {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            if row.get("id").map_or(true, Value::is_null) {
                row["id"] = json!(format!("{table}-{n}"));
            }
            if row.get("created_at").map_or(true, Value::is_null) {
                row["created_at"] = json!(format!("2024-08-17T10:00:{:02}Z", n % 60));
            }
            stored.push(row);
        }
        self.seed(table, stored.clone());
        Ok(stored)
    }

    async fn update(&self, table: &str, filter: &TableQuery, patch: &Value) -> SidResult<Vec<Value>> {
        self.check_denied(table)?;
        self.updates
            .lock()
            .unwrap()
            .push((table.to_string(), patch.clone()));
        let mut tables = self.tables.lock().unwrap();
        let mut changed = Vec::new();
        for row in tables.entry(table.to_string()).or_default().iter_mut() {
            if matches_all(row, filter) {
                if let (Value::Object(target), Value::Object(fields)) = (&mut *row, patch) {
                    for (k, v) in fields {
                        target.insert(k.clone(), v.clone());
                    }
                }
                changed.push(row.clone());
            }
        }
        Ok(changed)
    }

    async fn delete(&self, table: &str, filter: &TableQuery) -> SidResult<Vec<Value>> {
        self.check_denied(table)?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            rows.drain(..).partition(|row| matches_all(row, filter));
        *rows = kept;
        Ok(removed)
    }

    async fn upsert(&self, table: &str, rows: &Value, on_conflict: &str) -> SidResult<Vec<Value>> {
        let batch = match rows {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        };
        let mut out = Vec::new();
        for row in batch {
            let key = column_text(&row, on_conflict).unwrap_or_default();
            let filter = TableQuery::new().eq(on_conflict, &key);
            let updated = self.update(table, &filter, &row).await?;
            if updated.is_empty() {
                out.extend(self.insert(table, &row).await?);
            } else {
                out.extend(updated);
            }
        }
        Ok(out)
    }

    async fn rpc(&self, name: &str, args: &Value) -> SidResult<Value> {
        self.rpc_calls
            .lock()
            .unwrap()
            .push((name.to_string(), args.clone()));
        if let Some((status, message)) = self.rpc_errors.lock().unwrap().get(name) {
            return Err(SidError::from_backend(*status, None, message.clone()));
        }
        Ok(self
            .rpc_results
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn capabilities(&self) -> SidResult<Capabilities> {
        Ok(self.capabilities.lock().unwrap().clone())
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, _mime: &str) -> SidResult<String> {
        self.uploaded
            .lock()
            .unwrap()
            .push((bucket.to_string(), path.to_string(), bytes.len()));
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://desa.test{STORAGE_PREFIX}/object/public/{bucket}/{path}")
    }

    async fn remove(&self, _bucket: &str, paths: &[String]) -> SidResult<()> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(SidError::Http("storage unavailable".into()));
        }
        self.removed.lock().unwrap().extend(paths.iter().cloned());
        Ok(())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> SidResult<Session> {
        if password != PASSWORD {
            return Err(SidError::AuthFailed("Invalid login credentials".into()));
        }
        let token = format!("tok-{email}");
        *self.token.lock().unwrap() = Some(token.clone());
        Ok(Session {
            access_token: token,
            refresh_token: "refresh".into(),
            expires_in: Some(3600),
            user: AuthUser {
                id: "user-1".into(),
                email: Some(email.to_string()),
            },
        })
    }

    async fn sign_out(&self) -> SidResult<()> {
        Ok(())
    }

    async fn get_user(&self) -> SidResult<AuthUser> {
        if self.expired.load(Ordering::SeqCst) {
            return Err(SidError::AuthFailed("JWT expired".into()));
        }
        match self.token.lock().unwrap().as_deref() {
            Some(token) => Ok(AuthUser {
                id: "user-1".into(),
                email: token.strip_prefix("tok-").map(String::from),
            }),
            None => Err(SidError::AuthFailed("no session".into())),
        }
    }

    async fn set_access_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    async fn render(&self, request: &RenderRequest) -> SidResult<RenderResponse> {
        self.rendered.lock().unwrap().push(request.clone());
        Ok(RenderResponse {
            file_url: Some(RENDERED_URL.to_string()),
            error: None,
        })
    }

    async fn download(&self, _url: &str) -> SidResult<Vec<u8>> {
        Ok(b"PK-fake-docx".to_vec())
    }
}

/// A form with one derived column, a dropdown, an image and a currency field.
pub fn form_definition_json() -> Value {
    json!({
        "id": "form-rtlh",
        "judul": "Pendataan RTLH",
        "fields": [
            {"name": "nama", "label": "Nama", "type": "predefined", "column": "nama"},
            {"name": "dusun", "label": "Dusun", "type": "predefined", "column": "dusun"},
            {"name": "kondisi", "label": "Kondisi", "type": "dropdown",
             "options": ["Layak", "Tidak Layak"]},
            {"name": "foto", "label": "Foto Rumah", "type": "image"},
            {"name": "bantuan", "label": "Nilai Bantuan", "type": "currency"},
            {"name": "lokasi", "label": "Lokasi", "type": "coordinate"}
        ],
        "group_hierarchy": ["dusun", "kondisi"],
        "created_at": "2024-08-01T00:00:00Z"
    })
}

pub fn submission_json(id: &str, penduduk_id: &str, data: Value) -> Value {
    json!({
        "id": id,
        "form_id": "form-rtlh",
        "penduduk_id": penduduk_id,
        "data": data,
        "created_at": format!("2024-08-02T00:00:{}Z", &id[id.len() - 2..]),
    })
}

/// Seed residents in two dusun plus four submissions.
pub fn seed_form_data(backend: &FakeBackend) {
    backend.seed(
        "penduduk",
        vec![
            penduduk_json("3301010101010001", "Budi Santoso", "Krajan"),
            penduduk_json("3301010101010002", "Siti Aminah", "Krajan"),
            penduduk_json("3301010101010003", "Agus Salim", "Sukamaju"),
        ],
    );
    backend.seed("form_tugas", vec![form_definition_json()]);
    let foto = backend.image_url("uploads", "form-rtlh/lama.jpg");
    backend.seed(
        "form_tugas_data",
        vec![
            submission_json("sub-01", "p-3301010101010001", json!({"kondisi": "Tidak Layak", "foto": foto, "bantuan": 1500000})),
            submission_json("sub-02", "p-3301010101010002", json!({"kondisi": "Layak"})),
            submission_json("sub-03", "p-3301010101010003", json!({"kondisi": "Tidak Layak", "lokasi": "-7.7, 109.0"})),
            submission_json("sub-04", "p-3301010101010003", json!({})),
        ],
    );
}

pub fn data_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
