//! Family (keluarga) commands.

use clap::Subcommand;
use console::style;

use sid_core::config::ConfigHandle;
use sid_core::error::{SidError, SidResult};
use sid_services::routes::Route;
use sid_services::{FamilyService, Keluarga, ResidentService};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum KeluargaAction {
    /// List family cards.
    List {
        #[arg(short, long)]
        dusun: Option<String>,
    },
    /// Show the members of one family card (from the local cache).
    Show { no_kk: String },
}

fn keluarga_json(k: &Keluarga) -> serde_json::Value {
    serde_json::json!({
        "no_kk": k.no_kk,
        "kepala": k.nama_kepala(),
        "dusun": k.dusun(),
        "anggota": k.anggota,
    })
}

pub async fn run(config: ConfigHandle, action: KeluargaAction, format: OutputFormat) -> SidResult<()> {
    let registry = super::connect(&config).await?;
    super::require(&registry, Route::Keluarga).await?;
    let families = FamilyService::new(registry.database.clone());

    match action {
        KeluargaAction::List { dusun } => {
            let residents = ResidentService::new(
                registry.database.clone(),
                registry.auth.clone(),
                registry.event_bus.clone(),
            );
            let list = families
                .list(registry.backend(), &residents, dusun)
                .await
                .map_err(super::report_failure)?;

            match format {
                OutputFormat::Json => {
                    let json: Vec<serde_json::Value> = list.iter().map(keluarga_json).collect();
                    super::print_json(&json);
                }
                OutputFormat::Text => {
                    if list.is_empty() {
                        println!("Tidak ada data keluarga.");
                        return Ok(());
                    }
                    let mut table = super::new_table(vec!["No. KK", "Kepala Keluarga", "Dusun", "Anggota"]);
                    for k in &list {
                        table.add_row(vec![
                            k.no_kk.clone(),
                            super::truncate(k.nama_kepala(), 32),
                            super::or_dash(k.dusun()).to_string(),
                            k.anggota.len().to_string(),
                        ]);
                    }
                    println!("{table}");
                    println!("  {} keluarga", list.len());
                }
            }
        }
        KeluargaAction::Show { no_kk } => {
            let k = families.members_cached(&no_kk)?;
            if k.anggota.is_empty() {
                return Err(SidError::NotFound(format!(
                    "keluarga {no_kk} tidak ada di cache lokal"
                )));
            }
            match format {
                OutputFormat::Json => super::print_json(&keluarga_json(&k)),
                OutputFormat::Text => {
                    println!("{} {}", style("No. KK").bold(), k.no_kk);
                    println!("  Kepala keluarga  {}", k.nama_kepala());
                    println!("  Dusun            {}", super::or_dash(k.dusun()));
                    let mut table = super::new_table(vec!["NIK", "Nama", "Hubungan", "Tgl Lahir"]);
                    for p in &k.anggota {
                        table.add_row(vec![
                            p.nik.clone(),
                            p.nama.clone(),
                            super::or_dash(p.hubungan_keluarga.as_deref()).to_string(),
                            super::or_dash(p.tanggal_lahir.as_deref()).to_string(),
                        ]);
                    }
                    println!("{table}");
                }
            }
        }
    }
    Ok(())
}
