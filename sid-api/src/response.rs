//! Backend error envelope.
//!
//! Failed table, RPC and auth requests answer with a JSON body of the form
//! ```json
//! { "code": "42501", "message": "permission denied for table penduduk", "details": null, "hint": null }
//! ```
//! The auth and storage services use `error`/`error_description`/`msg`
//! instead, so those are accepted as message aliases.

use serde::{Deserialize, Serialize};
use sid_core::error::SidError;

/// PostgREST code for "function not found in schema cache".
pub const PGRST_FUNCTION_NOT_FOUND: &str = "PGRST202";

/// Error body returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "msg", alias = "error_description")]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Parse a response body, tolerating non-JSON bodies.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self {
            message: Some(body.trim().to_string()).filter(|m| !m.is_empty()),
            ..Default::default()
        })
    }

    /// Best human-readable message in the envelope.
    pub fn best_message(&self) -> String {
        let mut msg = self
            .message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        if let Some(details) = self.details.as_deref().filter(|d| !d.is_empty()) {
            msg.push_str(&format!(" ({details})"));
        }
        msg
    }

    /// Convert into the unified error type.
    pub fn into_error(self, status: u16) -> SidError {
        let message = self.best_message();
        SidError::from_backend(status, self.code, message)
    }
}

/// Whether the error means the requested remote procedure does not exist.
pub fn is_missing_function(err: &SidError) -> bool {
    match err {
        SidError::NotFound(_) => true,
        SidError::ServerError { status, code, .. } => {
            *status == 404 || code.as_deref() == Some(PGRST_FUNCTION_NOT_FOUND)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_envelope() {
        let body = ApiErrorBody::parse(
            r#"{"code":"42501","message":"permission denied for table form_tugas_data","details":null,"hint":null}"#,
        );
        let err = body.into_error(400);
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_auth_style_envelope() {
        let body = ApiErrorBody::parse(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#);
        assert_eq!(body.best_message(), "Invalid login credentials");
    }

    #[test]
    fn test_plain_text_body() {
        let body = ApiErrorBody::parse("Bad Gateway");
        assert_eq!(body.best_message(), "Bad Gateway");
        assert!(body.code.is_none());
    }

    #[test]
    fn test_missing_function_detection() {
        let err = ApiErrorBody::parse(
            r#"{"code":"PGRST202","message":"Could not find the function public.api_capabilities"}"#,
        )
        .into_error(404);
        assert!(is_missing_function(&err));

        let other = ApiErrorBody::parse(r#"{"code":"23505","message":"duplicate key"}"#).into_error(409);
        assert!(!is_missing_function(&other));
    }
}
