//! SIDesa API - HTTP client for the hosted backend.
//!
//! The backend exposes a PostgREST-style table API, named remote procedures,
//! object storage, password auth, and a document rendering function. This
//! crate wraps them in a typed client with retry and error classification,
//! and exposes the whole surface through the [`Backend`] trait so services
//! can be tested against an in-memory fake.

pub mod backend;
pub mod client;
pub mod endpoints;
pub mod query;
pub mod response;

// Re-export key types
pub use backend::Backend;
pub use client::{ApiClient, RetryConfig};
pub use endpoints::auth::{AuthUser, Session};
pub use endpoints::render::{RenderRequest, RenderResponse};
pub use endpoints::rpc::Capabilities;
pub use query::{Filter, TableQuery};
pub use response::ApiErrorBody;
