//! User management: profiles and role assignment.

use serde_json::{json, Value};
use tracing::info;

use sid_api::{Backend, TableQuery};
use sid_core::constants::{rpc, tables};
use sid_core::error::{SidError, SidResult};
use sid_models::{Role, UserProfile};

use crate::event_bus::{AppEvent, EventBus};
use crate::registry::CapabilitiesHandle;
use crate::service::{impl_service, ServiceState};
use crate::session::AuthHandle;

pub struct UserService {
    state: ServiceState,
    auth: AuthHandle,
    capabilities: CapabilitiesHandle,
    event_bus: EventBus,
}

impl_service!(UserService, "users");

impl UserService {
    pub fn new(auth: AuthHandle, capabilities: CapabilitiesHandle, event_bus: EventBus) -> Self {
        Self {
            state: ServiceState::Created,
            auth,
            capabilities,
            event_bus,
        }
    }

    async fn require_admin(&self) -> SidResult<String> {
        let auth = self.auth.read().await;
        match auth.user_id() {
            Some(id) if auth.is_admin() => Ok(id.to_string()),
            Some(_) => Err(SidError::PermissionDenied("hanya admin yang dapat mengelola pengguna".into())),
            None => Err(SidError::AuthFailed("belum masuk".into())),
        }
    }

    pub async fn list_profiles(&self, backend: &dyn Backend) -> SidResult<Vec<UserProfile>> {
        self.require_admin().await?;
        let rows = backend
            .select(tables::PROFILES, &TableQuery::new().order("created_at", true))
            .await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(SidError::from))
            .collect()
    }

    /// Assign `role` to `user_id` through the permission-checked procedure.
    /// A kadus must be given a dusun.
    pub async fn change_role(
        &self,
        backend: &dyn Backend,
        user_id: &str,
        role: Role,
        dusun: Option<&str>,
    ) -> SidResult<UserProfile> {
        let me = self.require_admin().await?;
        if me == user_id {
            return Err(SidError::Validation("tidak dapat mengubah peran akun sendiri".into()));
        }

        let dusun = dusun.map(str::trim).filter(|d| !d.is_empty());
        if role == Role::Kadus && dusun.is_none() {
            return Err(SidError::Validation("peran kadus membutuhkan dusun".into()));
        }
        if !self.capabilities.read().await.supports(rpc::SET_USER_ROLE) {
            return Err(SidError::Unsupported(rpc::SET_USER_ROLE.into()));
        }

        let p_dusun = if role == Role::Kadus { dusun } else { None };
        let args = json!({
            "p_user_id": user_id,
            "p_role": role.as_str(),
            "p_dusun": p_dusun,
        });
        let result = backend.rpc(rpc::SET_USER_ROLE, &args).await?;

        let profile = match result {
            Value::Object(_) => serde_json::from_value(result)?,
            _ => self.fetch_profile(backend, user_id).await?,
        };

        info!("role of {user_id} set to {role}");
        self.event_bus.emit(AppEvent::UserRoleChanged {
            user_id: user_id.to_string(),
            role: role.to_string(),
        });
        Ok(profile)
    }

    async fn fetch_profile(&self, backend: &dyn Backend, user_id: &str) -> SidResult<UserProfile> {
        let rows = backend
            .select(tables::PROFILES, &TableQuery::new().eq("id", user_id))
            .await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SidError::NotFound(format!("pengguna {user_id}")))?;
        Ok(serde_json::from_value(row)?)
    }
}
