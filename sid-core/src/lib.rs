//! SIDesa Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other SIDesa crates:
//! - Application configuration (backend URL, keys, session, village settings)
//! - Global error type with permission-denied classification
//! - Structured logging with tracing
//! - Platform directory resolution
//! - Common constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, ConfigHandle};
pub use error::{SidError, SidResult};
pub use logging::init_logging;
pub use platform::Platform;
