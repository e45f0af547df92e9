//! Service trait and lifecycle management.
//!
//! All services implement the `Service` trait which provides a standard
//! lifecycle (init, shutdown) and health checking interface.

use sid_core::error::SidResult;

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Service has been created but not initialized.
    Created,
    /// Service is running and ready.
    Running,
    /// Service has been stopped.
    Stopped,
    /// Service encountered a fatal error.
    Failed,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Trait that all SIDesa services implement.
///
/// Services are initialized in registration order by the ServiceRegistry
/// and shut down in reverse.
pub trait Service: Send + Sync {
    /// Human-readable name of this service.
    fn name(&self) -> &str;

    /// Current state of this service.
    fn state(&self) -> ServiceState;

    /// Initialize the service. Called once during application startup.
    fn init(&mut self) -> SidResult<()>;

    /// Gracefully shut down the service. Called during application teardown.
    fn shutdown(&mut self) -> SidResult<()>;

    /// Health check. Returns true if the service is operational.
    fn is_healthy(&self) -> bool {
        self.state() == ServiceState::Running
    }
}

/// Implements [`Service`] for a struct with a `state: ServiceState` field.
macro_rules! impl_service {
    ($ty:ty, $name:expr) => {
        impl $crate::service::Service for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn state(&self) -> $crate::service::ServiceState {
                self.state
            }

            fn init(&mut self) -> sid_core::error::SidResult<()> {
                self.state = $crate::service::ServiceState::Running;
                tracing::info!("{} initialized", $name);
                Ok(())
            }

            fn shutdown(&mut self) -> sid_core::error::SidResult<()> {
                self.state = $crate::service::ServiceState::Stopped;
                Ok(())
            }
        }
    };
}

pub(crate) use impl_service;
