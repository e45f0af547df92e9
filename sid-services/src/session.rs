//! Session and role context.
//!
//! `AuthContext` is owned by the service registry and passed to whatever
//! needs to know who is signed in. It is filled at login (or when a saved
//! session is restored) and cleared at logout.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use sid_api::{Backend, Session, TableQuery};
use sid_core::config::ConfigHandle;
use sid_core::constants::tables;
use sid_core::error::{SidError, SidResult};
use sid_models::{Role, UserProfile};

use crate::event_bus::{AppEvent, EventBus};
use crate::service::{impl_service, ServiceState};

/// Who is signed in, and with which role.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub session: Option<Session>,
    pub profile: Option<UserProfile>,
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// The profile role. A session without a profile row counts as `warga`.
    pub fn role(&self) -> Option<Role> {
        self.session
            .as_ref()
            .map(|_| self.profile.as_ref().map(|p| p.role).unwrap_or_default())
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user.id.as_str())
    }

    /// The dusun a kadus is limited to. `None` means no restriction.
    pub fn dusun_scope(&self) -> Option<String> {
        match self.role() {
            Some(Role::Kadus) => Some(
                self.profile
                    .as_ref()
                    .and_then(|p| p.dusun.clone())
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }
}

/// Whether a record in `dusun` is visible under `scope`.
///
/// A kadus without an assigned dusun sees nothing.
pub fn within_scope(scope: Option<&str>, dusun: Option<&str>) -> bool {
    match scope {
        None => true,
        Some(s) => {
            let s = s.trim();
            !s.is_empty() && dusun.map_or(false, |d| d.trim().eq_ignore_ascii_case(s))
        }
    }
}

/// Shared handle to the auth context.
pub type AuthHandle = Arc<RwLock<AuthContext>>;

/// Service for signing in and out and restoring saved sessions.
pub struct SessionService {
    state: ServiceState,
    config: ConfigHandle,
    auth: AuthHandle,
    event_bus: EventBus,
}

impl_service!(SessionService, "session");

impl SessionService {
    pub fn new(config: ConfigHandle, auth: AuthHandle, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            config,
            auth,
            event_bus,
        }
    }

    /// Sign in, load the profile, and persist the tokens.
    pub async fn login(
        &self,
        backend: &dyn Backend,
        email: &str,
        password: &str,
    ) -> SidResult<AuthContext> {
        let session = backend.sign_in_with_password(email, password).await?;
        backend.set_access_token(Some(session.access_token.clone())).await;
        let profile = fetch_profile(backend, &session.user.id).await?;

        {
            let mut config = self.config.write().await;
            config.session.access_token = session.access_token.clone();
            config.session.refresh_token = session.refresh_token.clone();
            config.session.user_id = session.user.id.clone();
            config.session.email = session.user.email.clone().unwrap_or_default();
        }
        if let Err(e) = self.config.save().await {
            warn!("failed to persist session: {e}");
        }

        self.install(session, profile).await
    }

    /// Re-establish a saved session. Returns `None` when there is no saved
    /// session or it has expired.
    pub async fn restore(&self, backend: &dyn Backend) -> SidResult<Option<AuthContext>> {
        let saved = self.config.read().await.session.clone();
        if !saved.is_present() {
            return Ok(None);
        }

        backend.set_access_token(Some(saved.access_token.clone())).await;
        let user = match backend.get_user().await {
            Ok(user) => user,
            Err(e @ (SidError::AuthFailed(_) | SidError::PermissionDenied(_))) => {
                info!("saved session is no longer valid: {e}");
                self.clear_local().await;
                backend.set_access_token(None).await;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let profile = fetch_profile(backend, &user.id).await?;
        let session = Session {
            access_token: saved.access_token,
            refresh_token: saved.refresh_token,
            expires_in: None,
            user,
        };
        self.install(session, profile).await.map(Some)
    }

    /// Sign out remotely (best effort) and clear the local session.
    pub async fn logout(&self, backend: &dyn Backend) -> SidResult<()> {
        if let Err(e) = backend.sign_out().await {
            warn!("remote sign-out failed: {e}");
        }
        backend.set_access_token(None).await;
        self.clear_local().await;
        self.event_bus.emit(AppEvent::SessionEnded);
        Ok(())
    }

    /// Snapshot of the current context.
    pub async fn current(&self) -> AuthContext {
        self.auth.read().await.clone()
    }

    async fn install(&self, session: Session, profile: Option<UserProfile>) -> SidResult<AuthContext> {
        let ctx = AuthContext {
            session: Some(session),
            profile,
        };
        *self.auth.write().await = ctx.clone();

        let role = ctx.role().unwrap_or_default();
        info!("session active for {} ({role})", ctx.user_id().unwrap_or("?"));
        self.event_bus.emit(AppEvent::SessionStarted {
            user_id: ctx.user_id().unwrap_or_default().to_string(),
            role: role.to_string(),
        });
        Ok(ctx)
    }

    async fn clear_local(&self) {
        *self.auth.write().await = AuthContext::default();
        self.config.write().await.session.clear();
        if let Err(e) = self.config.save().await {
            warn!("failed to clear persisted session: {e}");
        }
    }
}

async fn fetch_profile(backend: &dyn Backend, user_id: &str) -> SidResult<Option<UserProfile>> {
    let rows = backend
        .select(tables::PROFILES, &TableQuery::new().eq("id", user_id))
        .await?;
    rows.into_iter()
        .next()
        .map(|row: Value| serde_json::from_value(row).map_err(SidError::from))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sid_api::AuthUser;

    fn ctx(role: Role, dusun: Option<&str>) -> AuthContext {
        AuthContext {
            session: Some(Session {
                access_token: "t".into(),
                refresh_token: String::new(),
                expires_in: None,
                user: AuthUser { id: "u1".into(), email: None },
            }),
            profile: Some(UserProfile {
                id: "u1".into(),
                role,
                dusun: dusun.map(String::from),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_anonymous_context() {
        let anon = AuthContext::default();
        assert!(!anon.is_authenticated());
        assert_eq!(anon.role(), None);
        assert_eq!(anon.dusun_scope(), None);
    }

    #[test]
    fn test_kadus_scope() {
        assert_eq!(ctx(Role::Kadus, Some("Krajan")).dusun_scope().as_deref(), Some("Krajan"));
        assert_eq!(ctx(Role::Kadus, None).dusun_scope().as_deref(), Some(""));
        assert_eq!(ctx(Role::Operator, Some("Krajan")).dusun_scope(), None);
        assert!(ctx(Role::Admin, None).is_admin());
    }

    #[test]
    fn test_within_scope() {
        assert!(within_scope(None, None));
        assert!(within_scope(Some("Krajan"), Some("krajan ")));
        assert!(!within_scope(Some("Krajan"), Some("Sukamaju")));
        assert!(!within_scope(Some("Krajan"), None));
        assert!(!within_scope(Some(""), Some("")));
    }
}
