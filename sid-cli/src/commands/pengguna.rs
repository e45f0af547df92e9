//! User (pengguna) commands.

use clap::Subcommand;
use console::style;

use sid_core::config::ConfigHandle;
use sid_core::error::{SidError, SidResult};
use sid_models::Role;
use sid_services::routes::Route;
use sid_services::UserService;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum PenggunaAction {
    /// List user profiles.
    List,
    /// Change a user's role.
    Peran {
        user_id: String,
        /// admin, operator, kadus or warga.
        role: String,
        /// Dusun for a kadus.
        #[arg(short, long)]
        dusun: Option<String>,
    },
}

pub async fn run(config: ConfigHandle, action: PenggunaAction, format: OutputFormat) -> SidResult<()> {
    let registry = super::connect(&config).await?;
    super::require(&registry, Route::Pengguna).await?;
    let users = UserService::new(
        registry.auth.clone(),
        registry.capabilities.clone(),
        registry.event_bus.clone(),
    );
    let backend = registry.backend();

    match action {
        PenggunaAction::List => {
            let profiles = users.list_profiles(backend).await.map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&profiles),
                OutputFormat::Text => {
                    let mut table = super::new_table(vec!["ID", "Nama", "Email", "Peran", "Dusun"]);
                    for p in &profiles {
                        table.add_row(vec![
                            p.id.clone(),
                            super::truncate(p.display_name(), 32),
                            super::or_dash(p.email.as_deref()).to_string(),
                            p.role.to_string(),
                            super::or_dash(p.dusun.as_deref()).to_string(),
                        ]);
                    }
                    println!("{table}");
                }
            }
        }
        PenggunaAction::Peran { user_id, role, dusun } => {
            let role = Role::parse(&role).ok_or_else(|| {
                SidError::Validation(format!(
                    "peran '{role}' tidak dikenal (admin, operator, kadus, warga)"
                ))
            })?;
            let profile = users
                .change_role(backend, &user_id, role, dusun.as_deref())
                .await
                .map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&profile),
                OutputFormat::Text => println!(
                    "{} {} sekarang {}{}",
                    style("OK").green().bold(),
                    profile.display_name(),
                    profile.role,
                    profile
                        .dusun
                        .as_deref()
                        .filter(|_| profile.role == Role::Kadus)
                        .map(|d| format!(" ({d})"))
                        .unwrap_or_default()
                ),
            }
        }
    }
    Ok(())
}
