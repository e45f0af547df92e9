//! Resident (penduduk) commands.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use sid_core::config::ConfigHandle;
use sid_core::error::{SidError, SidResult};
use sid_models::Penduduk;
use sid_services::event_bus::AppEvent;
use sid_services::export::{penduduk_table, write_xlsx};
use sid_services::routes::Route;
use sid_services::{ImportService, ResidentFilter, ResidentService, ServiceRegistry};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum PendudukAction {
    /// List residents.
    List {
        /// Only residents of this dusun.
        #[arg(short, long)]
        dusun: Option<String>,
        /// Gender, L or P.
        #[arg(long)]
        jk: Option<String>,
        /// Substring of name or NIK.
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one resident by NIK.
    Show { nik: String },
    /// Search the local roster cache by name or NIK prefix.
    Cari {
        query: String,
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
    /// Add a resident from a JSON file.
    Tambah { file: PathBuf },
    /// Replace a resident's record from a JSON file.
    Ubah { nik: String, file: PathBuf },
    /// Delete a resident.
    Hapus {
        nik: String,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Import residents from an .xlsx file.
    Import { file: PathBuf },
    /// Export residents to an .xlsx file.
    Export {
        file: PathBuf,
        #[arg(short, long)]
        dusun: Option<String>,
    },
    /// Refresh the local roster cache from the backend.
    Sync,
}

pub async fn run(config: ConfigHandle, action: PendudukAction, format: OutputFormat) -> SidResult<()> {
    let registry = super::connect(&config).await?;
    super::require(&registry, Route::Penduduk).await?;
    let residents = ResidentService::new(
        registry.database.clone(),
        registry.auth.clone(),
        registry.event_bus.clone(),
    );
    let backend = registry.backend();

    match action {
        PendudukAction::List { dusun, jk, search } => {
            let filter = ResidentFilter {
                dusun,
                jenis_kelamin: jk.map(|g| g.trim().to_uppercase()),
                search,
            };
            let list = residents.list(backend, &filter).await.map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&list),
                OutputFormat::Text => print_residents(&list),
            }
        }
        PendudukAction::Show { nik } => {
            let p = residents.get(backend, &nik).await.map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&p),
                OutputFormat::Text => print_resident_detail(&p),
            }
        }
        PendudukAction::Cari { query, limit } => {
            let found = residents.search_cached(&query, limit)?;
            match format {
                OutputFormat::Json => super::print_json(&found),
                OutputFormat::Text => {
                    if found.is_empty() {
                        println!("Tidak ada hasil di cache lokal. Jalankan `sidesa penduduk sync` bila cache kosong.");
                    } else {
                        print_residents(&found);
                    }
                }
            }
        }
        PendudukAction::Tambah { file } => {
            let p = read_resident(&file)?;
            let saved = residents.create(backend, &p).await.map_err(super::report_failure)?;
            println!("{} {} ({}) ditambahkan", style("OK").green().bold(), saved.nama, saved.nik);
        }
        PendudukAction::Ubah { nik, file } => {
            let p = read_resident(&file)?;
            let saved = residents.update(backend, &nik, &p).await.map_err(super::report_failure)?;
            println!("{} {} ({}) diperbarui", style("OK").green().bold(), saved.nama, saved.nik);
        }
        PendudukAction::Hapus { nik, yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Hapus penduduk dengan NIK {nik}?"))
                    .default(false)
                    .interact()
                    .map_err(super::prompt_err)?;
                if !confirmed {
                    println!("Dibatalkan.");
                    return Ok(());
                }
            }
            residents.delete(backend, &nik).await.map_err(super::report_failure)?;
            println!("{} penduduk {nik} dihapus", style("OK").green().bold());
        }
        PendudukAction::Import { file } => import(&registry, &file, format).await?,
        PendudukAction::Export { file, dusun } => {
            let filter = ResidentFilter { dusun, ..Default::default() };
            let list = residents.list(backend, &filter).await.map_err(super::report_failure)?;
            write_xlsx(&penduduk_table(&list), &file)?;
            println!(
                "{} {} penduduk diekspor ke {}",
                style("OK").green().bold(),
                list.len(),
                file.display()
            );
        }
        PendudukAction::Sync => {
            let count = residents.sync_cache(backend).await?;
            let stats = residents.cache_stats()?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({
                    "status": "complete",
                    "penduduk": count,
                    "keluarga": stats.keluarga,
                    "last_synced_at": stats.last_synced_at,
                })),
                OutputFormat::Text => {
                    println!("{} Cache diperbarui.", style("OK").green().bold());
                    println!("    Penduduk:  {}", stats.penduduk);
                    println!("    Keluarga:  {}", stats.keluarga);
                }
            }
        }
    }
    Ok(())
}

fn read_resident(path: &Path) -> SidResult<Penduduk> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    Penduduk::from_server_map(&value)
}

async fn import(registry: &ServiceRegistry, file: &Path, format: OutputFormat) -> SidResult<()> {
    if !file.exists() {
        return Err(SidError::NotFound(file.display().to_string()));
    }
    let batch_size = registry.config.read().await.import.batch_size;
    let service = ImportService::new(registry.event_bus.clone(), batch_size);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("membaca berkas...");

    let mut rx = registry.event_bus.subscribe();
    let pb_clone = pb.clone();
    let listener = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                AppEvent::ImportProgress { batch, total_batches, succeeded, failed } => {
                    pb_clone.set_message(format!(
                        "batch {batch}/{total_batches} (berhasil {succeeded}, gagal {failed})"
                    ));
                }
                AppEvent::ImportComplete { .. } => break,
                _ => {}
            }
        }
    });

    let result = service.import_file(registry.backend(), file).await;
    listener.abort();
    pb.finish_and_clear();
    let report = result?;

    match format {
        OutputFormat::Json => {
            let errors: Vec<serde_json::Value> = report
                .errors
                .iter()
                .map(|e| serde_json::json!({ "row": e.row, "message": e.message }))
                .collect();
            super::print_json(&serde_json::json!({
                "total": report.total,
                "succeeded": report.succeeded,
                "failed": report.failed,
                "batches": report.batches,
                "errors": errors,
            }));
        }
        OutputFormat::Text => {
            let mark = if report.failed == 0 {
                style("OK").green().bold()
            } else {
                style("WARN").yellow().bold()
            };
            println!(
                "  {mark} {} baris: {} berhasil, {} gagal ({} batch)",
                report.total, report.succeeded, report.failed, report.batches
            );
            for err in &report.errors {
                match err.row {
                    Some(row) => println!("    baris {row}: {}", err.message),
                    None => println!("    {}", err.message),
                }
            }
        }
    }
    Ok(())
}

fn print_residents(list: &[Penduduk]) {
    if list.is_empty() {
        println!("Tidak ada data penduduk.");
        return;
    }
    let mut table = super::new_table(vec!["NIK", "Nama", "JK", "Tgl Lahir", "Dusun", "RT/RW"]);
    for p in list {
        let rt_rw = match (p.rt.as_deref(), p.rw.as_deref()) {
            (Some(rt), Some(rw)) => format!("{rt}/{rw}"),
            (Some(rt), None) => rt.to_string(),
            _ => "-".to_string(),
        };
        table.add_row(vec![
            p.nik.clone(),
            super::truncate(&p.nama, 32),
            super::or_dash(p.jenis_kelamin.as_deref()).to_string(),
            super::or_dash(p.tanggal_lahir.as_deref()).to_string(),
            super::or_dash(p.dusun.as_deref()).to_string(),
            rt_rw,
        ]);
    }
    println!("{table}");
    println!("  {} penduduk", list.len());
}

fn print_resident_detail(p: &Penduduk) {
    let dash = |v: Option<&str>| super::or_dash(v).to_string();
    println!("{}", style(&p.nama).bold());
    let rows = [
        ("NIK", p.nik.clone()),
        ("No. KK", p.no_kk.clone()),
        ("Tempat lahir", dash(p.tempat_lahir.as_deref())),
        ("Tanggal lahir", dash(p.tanggal_lahir.as_deref())),
        ("Jenis kelamin", dash(p.jenis_kelamin.as_deref())),
        ("Agama", dash(p.agama.as_deref())),
        ("Pekerjaan", dash(p.pekerjaan.as_deref())),
        ("Status kawin", dash(p.status_perkawinan.as_deref())),
        ("Pendidikan", dash(p.pendidikan.as_deref())),
        ("Alamat", dash(p.alamat.as_deref())),
        ("RT / RW", format!("{} / {}", dash(p.rt.as_deref()), dash(p.rw.as_deref()))),
        ("Dusun", dash(p.dusun.as_deref())),
        ("Hubungan", dash(p.hubungan_keluarga.as_deref())),
        ("Kewarganegaraan", dash(p.kewarganegaraan.as_deref())),
    ];
    for (label, value) in rows {
        println!("  {label:<16} {value}");
    }
}
