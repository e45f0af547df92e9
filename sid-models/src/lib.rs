//! SIDesa Models - Entity models, validation, and the local roster cache.
//!
//! Remote records owned by the hosted backend get typed views here. The
//! crate also owns the local SQLite cache (schema, migrations, queries)
//! that keeps the resident roster searchable without a round-trip.

pub mod db;
pub mod schema;
pub mod models;
pub mod queries;
pub mod migrations;
pub mod validation;

// Re-export key types
pub use db::{Database, DbPool};
pub use models::penduduk::Penduduk;
pub use models::desa::InfoDesa;
pub use models::form::{Coordinate, DateFormat, FieldDescriptor, FieldKind, FormDefinition, FormSubmission, TextCase};
pub use models::surat::{FieldMapping, FieldSource, NumberSubtype, SuratKeluar, TemplateSurat};
pub use models::user::{Role, UserProfile};
pub use models::content::{Agenda, Berita, Galeri, Pengumuman};
