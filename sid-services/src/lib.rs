//! SIDesa Services - Business logic and service layer.
//!
//! This crate provides the service trait, the service registry, and the
//! concrete services covering:
//! - Session and role context, route authorization
//! - The schema-driven form data grid (search, filter, sort, grouping, pages)
//! - Form submission edits and deletes with stored-file cleanup
//! - The letter generator (numbering, terbilang, substitution, rendering)
//! - Spreadsheet import and export of residents and grid rows
//! - Residents, families, population statistics, public content
//! - User role management
//! - Event bus (typed intra-service communication)

pub mod service;
pub mod registry;
pub mod event_bus;
pub mod session;
pub mod routes;
pub mod grid;
pub mod form_data;
pub mod letter;
pub mod import;
pub mod export;
pub mod resident;
pub mod family;
pub mod stats;
pub mod content;
pub mod users;

// Re-export key types
pub use service::{Service, ServiceState};
pub use registry::{CapabilitiesHandle, ServiceRegistry};
pub use event_bus::{AppEvent, EventBus};
pub use session::{AuthContext, AuthHandle, SessionService};
pub use routes::{authorize, Access, AccessLevel, Route};
pub use grid::GridState;
pub use form_data::{FailureView, FormDataService};
pub use letter::{LetterDraft, LetterService, Numbering};
pub use import::{ImportReport, ImportService};
pub use export::ExportTable;
pub use resident::{ResidentFilter, ResidentService};
pub use family::{FamilyService, Keluarga};
pub use stats::{PopulationStats, StatsService};
pub use content::ContentService;
pub use users::UserService;
