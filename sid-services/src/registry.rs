//! Service registry for dependency injection and lifecycle management.
//!
//! The registry owns the shared infrastructure (config, roster cache,
//! backend client, event bus, auth context, capability set), registers the
//! services in dependency order, and handles ordered startup and shutdown.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use sid_api::{Backend, Capabilities};
use sid_core::config::ConfigHandle;
use sid_core::error::{SidError, SidResult};
use sid_models::Database;

use crate::content::ContentService;
use crate::event_bus::{AppEvent, EventBus};
use crate::family::FamilyService;
use crate::form_data::FormDataService;
use crate::import::ImportService;
use crate::letter::LetterService;
use crate::resident::ResidentService;
use crate::service::{Service, ServiceState};
use crate::session::{AuthContext, AuthHandle, SessionService};
use crate::stats::StatsService;
use crate::users::UserService;

/// Shared handle to the backend's advertised procedures.
pub type CapabilitiesHandle = Arc<RwLock<Capabilities>>;

/// Central service registry that manages all application services.
pub struct ServiceRegistry {
    /// Application configuration.
    pub config: ConfigHandle,
    /// Local roster cache.
    pub database: Database,
    /// Hosted backend client.
    pub backend: Arc<dyn Backend>,
    /// Application-level event bus.
    pub event_bus: EventBus,
    /// Who is signed in.
    pub auth: AuthHandle,
    /// Procedures the backend advertises.
    pub capabilities: CapabilitiesHandle,
    /// Registered services in initialization order.
    services: Vec<(String, Arc<RwLock<Box<dyn Service>>>)>,
}

impl ServiceRegistry {
    pub fn new(config: ConfigHandle, database: Database, backend: Arc<dyn Backend>) -> Self {
        Self {
            config,
            database,
            backend,
            event_bus: EventBus::new(256),
            auth: Arc::new(RwLock::new(AuthContext::default())),
            capabilities: Arc::new(RwLock::new(Capabilities::default())),
            services: Vec::new(),
        }
    }

    /// Register a service. Services are initialized in registration order.
    pub fn register<S: Service + 'static>(&mut self, service: S) {
        let name = service.name().to_string();
        info!("registered service: {name}");
        self.services
            .push((name, Arc::new(RwLock::new(Box::new(service)))));
    }

    /// Register all default services.
    ///
    /// Initialization order:
    /// 1. Session (config, auth, event_bus)
    /// 2. Resident (database, auth, event_bus)
    /// 3. Family (database)
    /// 4. FormData (auth, capabilities, event_bus)
    /// 5. Letter (database, capabilities, event_bus)
    /// 6. Import (event_bus)
    /// 7. Stats (database, capabilities)
    /// 8. Content
    /// 9. Users (auth, capabilities, event_bus)
    pub async fn register_all(&mut self) {
        let bus = self.event_bus.clone();
        let (bucket, batch_size, village) = {
            let config = self.config.read().await;
            (
                config.storage.bucket.clone(),
                config.import.batch_size,
                config.village.clone(),
            )
        };

        self.register(SessionService::new(self.config.clone(), self.auth.clone(), bus.clone()));
        self.register(ResidentService::new(self.database.clone(), self.auth.clone(), bus.clone()));
        self.register(FamilyService::new(self.database.clone()));
        self.register(FormDataService::new(
            self.auth.clone(),
            self.capabilities.clone(),
            bus.clone(),
            bucket,
        ));
        self.register(LetterService::new(
            self.database.clone(),
            self.capabilities.clone(),
            bus.clone(),
            village,
        ));
        self.register(ImportService::new(bus.clone(), batch_size));
        self.register(StatsService::new(self.database.clone(), self.capabilities.clone()));
        self.register(ContentService::new());
        self.register(UserService::new(self.auth.clone(), self.capabilities.clone(), bus));

        info!("registered {} default services", self.services.len());
    }

    /// Initialize all registered services in order.
    pub async fn init_all(&self) -> SidResult<()> {
        info!("initializing {} services", self.services.len());

        for (name, service) in &self.services {
            let mut svc = service.write().await;
            if let Err(e) = svc.init() {
                error!("failed to initialize service {name}: {e}");
                return Err(SidError::ServiceInit(format!("{name}: {e}")));
            }
        }

        info!("all services initialized");
        Ok(())
    }

    /// Shut down all services in reverse order and forget the session.
    pub async fn shutdown_all(&self) -> SidResult<()> {
        info!("shutting down services");

        for (name, service) in self.services.iter().rev() {
            let mut svc = service.write().await;
            if let Err(e) = svc.shutdown() {
                error!("error shutting down service {name}: {e}");
            }
        }
        *self.auth.write().await = AuthContext::default();

        info!("all services shut down");
        Ok(())
    }

    /// Reload the backend's capability set.
    pub async fn refresh_capabilities(&self) -> SidResult<Capabilities> {
        let caps = self.backend.capabilities().await?;
        let count = caps.iter().count();
        *self.capabilities.write().await = caps.clone();
        self.event_bus.emit(AppEvent::CapabilitiesLoaded { count });
        Ok(caps)
    }

    pub async fn capabilities(&self) -> Capabilities {
        self.capabilities.read().await.clone()
    }

    /// Snapshot of the auth context.
    pub async fn auth_snapshot(&self) -> AuthContext {
        self.auth.read().await.clone()
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Get the health status of all services.
    pub async fn health_check(&self) -> Vec<(String, ServiceState, bool)> {
        let mut results = Vec::new();
        for (name, service) in &self.services {
            let svc = service.read().await;
            results.push((name.clone(), svc.state(), svc.is_healthy()));
        }
        results
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}
