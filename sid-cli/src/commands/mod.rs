//! CLI command implementations.

pub mod config;
pub mod auth;
pub mod penduduk;
pub mod keluarga;
pub mod formulir;
pub mod surat;
pub mod pengguna;
pub mod statistik;
pub mod konten;

use std::sync::Arc;

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;
use serde::Serialize;
use tracing::warn;

use sid_api::ApiClient;
use sid_core::config::ConfigHandle;
use sid_core::error::{SidError, SidResult};
use sid_models::Database;
use sid_services::routes::{authorize, Access, Route};
use sid_services::{AuthContext, FailureView, ServiceRegistry, SessionService};

/// Helper to open the roster cache from config.
pub async fn init_database(config: &ConfigHandle) -> SidResult<Database> {
    let (db_path, db_config) = {
        let cfg = config.read().await;
        (cfg.effective_db_path()?, cfg.database.clone())
    };
    Database::init(&db_path, &db_config)
}

/// Helper to create an API client from config.
pub async fn create_api_client(config: &ConfigHandle) -> SidResult<ApiClient> {
    let cfg = config.read().await;
    ApiClient::new(&cfg)
}

/// Build the registry, discover capabilities and restore the saved session.
pub async fn connect(config: &ConfigHandle) -> SidResult<ServiceRegistry> {
    let db = init_database(config).await?;
    let api = create_api_client(config).await?;

    let mut registry = ServiceRegistry::new(config.clone(), db, Arc::new(api));
    registry.register_all().await;
    registry.init_all().await?;

    if let Err(e) = registry.refresh_capabilities().await {
        warn!("capability discovery failed, optional procedures disabled: {e}");
    }
    session_service(&registry).restore(registry.backend()).await?;
    Ok(registry)
}

pub fn session_service(registry: &ServiceRegistry) -> SessionService {
    SessionService::new(
        registry.config.clone(),
        registry.auth.clone(),
        registry.event_bus.clone(),
    )
}

/// Check that the current session may open `route`.
pub async fn require(registry: &ServiceRegistry, route: Route) -> SidResult<AuthContext> {
    let auth = registry.auth_snapshot().await;
    match authorize(&route, &auth) {
        Access::Allowed => Ok(auth),
        Access::RequiresLogin => Err(SidError::AuthFailed(
            "belum masuk, jalankan `sidesa login` terlebih dahulu".into(),
        )),
        Access::Forbidden => Err(SidError::PermissionDenied(format!(
            "peran {} tidak dapat membuka halaman ini",
            auth.role().unwrap_or_default()
        ))),
    }
}

/// Print a failed action the way the grid presents it, then pass the error on.
pub fn report_failure(err: SidError) -> SidError {
    match FailureView::from(&err) {
        FailureView::AccessDenied => {
            eprintln!();
            eprintln!("  {}", style("AKSES DITOLAK").red().bold());
            eprintln!("  Anda tidak memiliki izin untuk tindakan ini.");
            eprintln!("  Hubungi admin desa bila menurut Anda ini keliru.");
            eprintln!();
        }
        FailureView::Toast(message) => {
            eprintln!("  {} {message}", style("!").yellow().bold());
        }
    }
    err
}

/// A table with the standard preset.
pub fn new_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Truncate a string to a maximum number of characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

/// Map a dialoguer failure into the error type.
pub fn prompt_err(e: dialoguer::Error) -> SidError {
    SidError::Internal(format!("prompt failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Sukamaju", 20), "Sukamaju");
        assert_eq!(truncate("Rumah Tidak Layak Huni", 10), "Rumah T...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("  ")), "-");
        assert_eq!(or_dash(Some("Krajan")), "Krajan");
    }
}
