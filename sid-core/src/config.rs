//! Application configuration management.
//!
//! Handles loading, saving, and accessing application configuration including
//! the backend URL and key, the persisted session, local cache settings, and
//! village-level display preferences. Configuration is persisted as TOML.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{SidError, SidResult};
use crate::platform::Platform;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hosted backend connection settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Document rendering endpoint.
    #[serde(default)]
    pub render: RenderConfig,

    /// Object storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Local roster cache settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Spreadsheet import settings.
    #[serde(default)]
    pub import: ImportConfig,

    /// Data grid defaults.
    #[serde(default)]
    pub grid: GridConfig,

    /// Village display overrides.
    #[serde(default)]
    pub village: VillageConfig,

    /// Persisted sign-in session.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Hosted backend connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL (e.g., "https://abcd.supabase.co").
    #[serde(default)]
    pub url: String,

    /// Public anonymous API key sent as `apikey` on every request.
    #[serde(default)]
    pub anon_key: String,

    /// Custom HTTP headers as key-value pairs.
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,

    /// API request timeout in milliseconds.
    #[serde(default = "default_api_timeout")]
    pub api_timeout_ms: u64,

    /// Whether to accept invalid TLS certificates (self-hosted instances).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Document rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Rendering endpoint URL. Empty means `<backend>/functions/v1/generate-surat`.
    #[serde(default)]
    pub endpoint: String,

    /// Rendering timeout in milliseconds (documents take longer than queries).
    #[serde(default = "default_render_timeout")]
    pub timeout_ms: u64,
}

/// Object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket holding form images and letter templates.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

/// Local cache database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. If empty, uses default location.
    #[serde(default)]
    pub path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Run integrity check on startup.
    #[serde(default = "default_true")]
    pub integrity_check_on_startup: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

/// Spreadsheet import configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Rows per sequential insert batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Data grid defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Initial page size (one of 10, 20, 50, 100).
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

/// Village display overrides. Unset honorifics fall back to the backend
/// record, then to the fixed literals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VillageConfig {
    #[serde(default)]
    pub sebutan_desa: Option<String>,
    #[serde(default)]
    pub sebutan_kecamatan: Option<String>,
    #[serde(default)]
    pub sebutan_kabupaten: Option<String>,
}

/// Persisted session tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
}

// Default value functions for serde

fn default_api_timeout() -> u64 {
    constants::DEFAULT_API_TIMEOUT_MS
}

fn default_render_timeout() -> u64 {
    120_000
}

fn default_bucket() -> String {
    "uploads".to_string()
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_size() -> usize {
    constants::DEFAULT_IMPORT_BATCH_SIZE
}

fn default_page_size() -> usize {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            custom_headers: HashMap::new(),
            api_timeout_ms: default_api_timeout(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_ms: default_render_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { bucket: default_bucket() }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            wal_mode: true,
            pool_size: default_pool_size(),
            integrity_check_on_startup: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { batch_size: default_batch_size() }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { default_page_size: default_page_size() }
    }
}

impl SessionConfig {
    /// Whether a session token has been stored.
    pub fn is_present(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Forget the stored session.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> SidResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> SidResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file path.
    pub fn save_default(&self) -> SidResult<()> {
        let path = Self::default_config_path()?;
        self.save_to_file(&path)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> SidResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SidError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> SidResult<PathBuf> {
        Ok(Platform::config_dir()?.join("config.toml"))
    }

    /// Get the effective cache database path.
    pub fn effective_db_path(&self) -> SidResult<PathBuf> {
        if self.database.path.is_empty() {
            Ok(Platform::data_dir()?.join("sidesa.db"))
        } else {
            Ok(PathBuf::from(&self.database.path))
        }
    }

    /// Get the effective log directory.
    pub fn effective_log_dir(&self) -> SidResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Ok(Platform::data_dir()?.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Get the effective document rendering endpoint.
    pub fn effective_render_endpoint(&self) -> String {
        if self.render.endpoint.is_empty() {
            format!(
                "{}/functions/v1/generate-surat",
                Self::sanitize_backend_url(&self.backend.url)
            )
        } else {
            self.render.endpoint.clone()
        }
    }

    /// Check whether the backend connection is configured.
    pub fn is_backend_configured(&self) -> bool {
        !self.backend.url.is_empty() && !self.backend.anon_key.is_empty()
    }

    /// Validate values that serde defaults cannot guard.
    pub fn validate(&self) -> SidResult<()> {
        if !constants::PAGE_SIZES.contains(&self.grid.default_page_size) {
            return Err(SidError::Config(format!(
                "grid.default_page_size must be one of {:?}",
                constants::PAGE_SIZES
            )));
        }
        if self.import.batch_size == 0 {
            return Err(SidError::Config("import.batch_size must be positive".into()));
        }
        Ok(())
    }

    /// Sanitize and normalize a backend URL.
    ///
    /// Ensures the address has a scheme (https unless it is a local host)
    /// and strips trailing slashes.
    pub fn sanitize_backend_url(address: &str) -> String {
        let trimmed = address.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
            format!("http://{trimmed}")
        } else {
            format!("https://{trimmed}")
        };

        with_scheme.trim_end_matches('/').to_string()
    }
}

/// Thread-safe configuration holder for shared access across services.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
    path: Option<PathBuf>,
}

impl ConfigHandle {
    /// Create a new configuration handle persisted to the default path.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: None,
        }
    }

    /// Create a handle that saves back to a specific file.
    pub fn with_path(config: AppConfig, path: PathBuf) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: Some(path),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }

    /// The file this handle saves to.
    pub fn path(&self) -> SidResult<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => AppConfig::default_config_path(),
        }
    }

    /// Save the current configuration to disk.
    pub async fn save(&self) -> SidResult<()> {
        let config = self.inner.read().await;
        match &self.path {
            Some(path) => config.save_to_file(path),
            None => config.save_default(),
        }
    }
}
