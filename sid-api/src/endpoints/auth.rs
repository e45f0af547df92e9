//! Password auth endpoints (`/auth/v1`).

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use sid_core::error::{SidError, SidResult};

use crate::client::ApiClient;

/// The authenticated user as reported by the auth service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A signed-in session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

impl ApiClient {
    /// Sign in with email and password. Installs the new access token on success.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> SidResult<Session> {
        let url = Self::with_query(
            &self.auth_url("token"),
            &[("grant_type".to_string(), "password".to_string())],
        )?;
        let body = json!({ "email": email, "password": password });
        let resp = self
            .request_with_retry(Method::POST, &url, self.default_timeout(), &[], Some(&body))
            .await
            .map_err(|e| match e {
                SidError::ServerError { status: 400, message, .. } => SidError::AuthFailed(message),
                other => other,
            })?;
        let session: Session = Self::parse_json(resp).await?;
        self.set_access_token(Some(session.access_token.clone())).await;
        info!("signed in as {}", session.user.email.as_deref().unwrap_or(&session.user.id));
        Ok(session)
    }

    /// End the session on the server and drop the local token.
    pub async fn sign_out(&self) -> SidResult<()> {
        if self.has_session().await {
            let url = self.auth_url("logout");
            let result = self
                .request_with_retry(Method::POST, &url, self.default_timeout(), &[], None)
                .await;
            self.set_access_token(None).await;
            result?;
        }
        Ok(())
    }

    /// Resolve the user behind the current token.
    pub async fn get_user(&self) -> SidResult<AuthUser> {
        if !self.has_session().await {
            return Err(SidError::AuthFailed("no active session".into()));
        }
        let url = self.auth_url("user");
        let resp = self
            .request_with_retry(Method::GET, &url, self.default_timeout(), &[], None)
            .await?;
        Self::parse_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_wire_format() {
        let session: Session = serde_json::from_value(serde_json::json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r",
            "user": {"id": "u-1", "email": "operator@desa.id", "role": "authenticated"}
        }))
        .unwrap();
        assert_eq!(session.user.id, "u-1");
        assert_eq!(session.expires_in, Some(3600));
    }
}
