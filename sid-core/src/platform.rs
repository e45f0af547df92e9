//! Platform directory resolution.

use std::path::PathBuf;
use crate::error::{SidError, SidResult};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Detect the current platform at compile time.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Get the platform-specific application data directory.
    ///
    /// - Windows: `%APPDATA%/SIDesa`
    /// - macOS: `~/Library/Application Support/SIDesa`
    /// - Linux: `~/.local/share/SIDesa`
    pub fn data_dir() -> SidResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| SidError::Config("could not determine data directory".into()))?;
        Ok(base.join("SIDesa"))
    }

    /// Get the platform-specific configuration directory.
    pub fn config_dir() -> SidResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| SidError::Config("could not determine config directory".into()))?;
        Ok(base.join("SIDesa"))
    }

    /// Directory where rendered letters and exports are written by default.
    pub fn documents_dir() -> SidResult<PathBuf> {
        let base = dirs::document_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| SidError::Config("could not determine documents directory".into()))?;
        Ok(base.join("SIDesa"))
    }

    /// Get a human-readable platform name.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
