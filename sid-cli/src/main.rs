//! SIDesa CLI - command-line client for the village administration system.
//!
//! Signs in against the hosted backend and exposes the admin workflows
//! (residents, families, custom forms, letters, users, statistics) plus the
//! public content listings from the terminal.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use sid_core::config::{AppConfig, ConfigHandle};
use sid_core::error::SidResult;
use sid_core::logging;

/// SIDesa - Sistem Informasi Desa.
#[derive(Parser)]
#[command(
    name = "sidesa",
    version,
    about = "SIDesa village administration client",
    long_about = "A command-line client for SIDesa.\n\
                  Manage residents, form data and outgoing letters of a village \
                  from any terminal."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// View and modify settings.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Sign in with email and password.
    Login {
        /// Account email.
        #[arg(short, long)]
        email: Option<String>,
        /// Account password (prompted when omitted).
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out and forget the saved session.
    Logout,
    /// Show who is signed in and what the backend supports.
    Status,
    /// Residents (penduduk).
    Penduduk {
        #[command(subcommand)]
        action: commands::penduduk::PendudukAction,
    },
    /// Families (keluarga).
    Keluarga {
        #[command(subcommand)]
        action: commands::keluarga::KeluargaAction,
    },
    /// Custom data-collection forms and their submissions.
    Formulir {
        #[command(subcommand)]
        action: commands::formulir::FormulirAction,
    },
    /// Letter templates, generation and the outgoing archive.
    Surat {
        #[command(subcommand)]
        action: commands::surat::SuratAction,
    },
    /// User accounts and roles (admin only).
    Pengguna {
        #[command(subcommand)]
        action: commands::pengguna::PenggunaAction,
    },
    /// Population statistics.
    Statistik {
        /// Compute from the local roster cache instead of the backend.
        #[arg(long)]
        lokal: bool,
    },
    /// Public site content.
    Konten {
        #[command(subcommand)]
        action: commands::konten::KontenAction,
    },
}

#[tokio::main]
async fn main() -> SidResult<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.as_deref() {
        Some(path) => PathBuf::from(path),
        None => AppConfig::default_config_path()?,
    };
    let config = if config_path.exists() {
        AppConfig::load_from_file(&config_path)?
    } else {
        AppConfig::default()
    };
    config.validate()?;

    let log_level = if cli.verbose { "debug".to_string() } else { config.logging.level.clone() };
    let log_dir = config.effective_log_dir()?;
    let _guard = logging::init_logging(&log_level, &log_dir, config.logging.json_output)?;

    let config_handle = ConfigHandle::with_path(config, config_path);

    info!("SIDesa CLI v{}", sid_core::constants::APP_VERSION);

    match cli.command {
        Commands::Config { action } => {
            commands::config::run(config_handle, action, cli.format).await
        }
        Commands::Login { email, password } => {
            commands::auth::login(config_handle, email, password, cli.format).await
        }
        Commands::Logout => commands::auth::logout(config_handle).await,
        Commands::Status => commands::auth::status(config_handle, cli.format).await,
        Commands::Penduduk { action } => {
            commands::penduduk::run(config_handle, action, cli.format).await
        }
        Commands::Keluarga { action } => {
            commands::keluarga::run(config_handle, action, cli.format).await
        }
        Commands::Formulir { action } => {
            commands::formulir::run(config_handle, action, cli.format).await
        }
        Commands::Surat { action } => {
            commands::surat::run(config_handle, action, cli.format).await
        }
        Commands::Pengguna { action } => {
            commands::pengguna::run(config_handle, action, cli.format).await
        }
        Commands::Statistik { lokal } => {
            commands::statistik::run(config_handle, lokal, cli.format).await
        }
        Commands::Konten { action } => {
            commands::konten::run(config_handle, action, cli.format).await
        }
    }
}
