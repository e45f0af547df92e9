//! Global error types for the SIDesa client.
//!
//! All error categories across the workspace are unified into a single
//! `SidError` enum with conversions from underlying library errors. Access
//! denial is classified in exactly one place, [`SidError::is_permission_denied`].

use thiserror::Error;

/// Convenience type alias for Results using SidError.
pub type SidResult<T> = Result<T, SidError>;

/// PostgreSQL `insufficient_privilege` code surfaced by the backend.
pub const PG_INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Unified error type covering all error categories in SIDesa.
#[derive(Error, Debug)]
pub enum SidError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Local cache errors --
    /// SQLite database error.
    #[error("database error: {0}")]
    Database(String),

    /// Database migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Database integrity check failed.
    #[error("database integrity check failed: {0}")]
    IntegrityCheck(String),

    // -- Network errors --
    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(String),

    /// HTTP request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Backend returned an error response.
    #[error("server error (status {status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Backend error code (PostgREST / Postgres), if any.
        code: Option<String>,
        /// Error message from the backend.
        message: String,
    },

    /// The backend refused the operation for the current user.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Sign-in failed or the session is missing/expired.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend does not offer a required capability.
    #[error("unsupported by backend: {0}")]
    Unsupported(String),

    // -- Domain errors --
    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Document rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// Spreadsheet read or write failed.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Service errors --
    /// A service failed to initialize.
    #[error("service init error: {0}")]
    ServiceInit(String),

    /// A service is not yet initialized.
    #[error("service not initialized: {0}")]
    ServiceNotInitialized(String),

    /// A service operation failed.
    #[error("service error: {0}")]
    Service(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for SidError {
    fn from(e: serde_json::Error) -> Self {
        SidError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SidError {
    fn from(e: toml::de::Error) -> Self {
        SidError::Config(e.to_string())
    }
}

impl SidError {
    /// Build an error from a backend response, mapping access denial to
    /// `PermissionDenied` and 404 to `NotFound`.
    pub fn from_backend(status: u16, code: Option<String>, message: String) -> Self {
        let denied = status == 401
            || status == 403
            || code.as_deref() == Some(PG_INSUFFICIENT_PRIVILEGE)
            || mentions_permission_denied(&message);

        if denied {
            SidError::PermissionDenied(message)
        } else if status == 404 {
            SidError::NotFound(message)
        } else {
            SidError::ServerError { status, code, message }
        }
    }

    /// Whether this error means the current user may not perform the action.
    ///
    /// Views use this to switch to the dedicated "access denied" state
    /// instead of a transient notification.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            SidError::PermissionDenied(_) => true,
            SidError::ServerError { status, code, message } => {
                *status == 401
                    || *status == 403
                    || code.as_deref() == Some(PG_INSUFFICIENT_PRIVILEGE)
                    || mentions_permission_denied(message)
            }
            _ => false,
        }
    }

    /// Short Indonesian message suitable for a toast notification.
    pub fn user_message(&self) -> String {
        match self {
            SidError::PermissionDenied(_) => {
                "Akses ditolak. Anda tidak memiliki izin untuk tindakan ini.".into()
            }
            SidError::AuthFailed(_) => "Sesi berakhir, silakan masuk kembali.".into(),
            SidError::NotFound(what) => format!("Data tidak ditemukan: {what}"),
            SidError::Validation(msg) => format!("Data tidak valid: {msg}"),
            SidError::Timeout(_) | SidError::Http(_) => {
                "Gagal terhubung ke server. Periksa koneksi Anda.".into()
            }
            SidError::Unsupported(what) => format!("Fitur belum didukung server: {what}"),
            other => format!("Terjadi kesalahan: {other}"),
        }
    }
}

fn mentions_permission_denied(message: &str) -> bool {
    message.to_lowercase().contains("permission denied")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sid_error_display() {
        let err = SidError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn test_from_backend_maps_privilege_code() {
        let err = SidError::from_backend(
            400,
            Some("42501".into()),
            "new row violates row-level security policy".into(),
        );
        assert!(matches!(err, SidError::PermissionDenied(_)));
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_from_backend_maps_status() {
        assert!(SidError::from_backend(403, None, "nope".into()).is_permission_denied());
        assert!(matches!(
            SidError::from_backend(404, None, "row".into()),
            SidError::NotFound(_)
        ));
        let generic = SidError::from_backend(500, Some("XX000".into()), "boom".into());
        assert!(!generic.is_permission_denied());
    }

    #[test]
    fn test_permission_denied_substring() {
        let err = SidError::ServerError {
            status: 400,
            code: None,
            message: "Permission denied for table penduduk".into(),
        };
        assert!(err.is_permission_denied());
        assert!(!SidError::Validation("nik".into()).is_permission_denied());
    }

    #[test]
    fn test_user_message_is_indonesian() {
        let msg = SidError::PermissionDenied("x".into()).user_message();
        assert!(msg.starts_with("Akses ditolak"));
    }
}
