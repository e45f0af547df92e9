//! Public content commands.

use clap::Subcommand;
use console::style;

use sid_core::config::ConfigHandle;
use sid_core::error::SidResult;
use sid_services::routes::Route;
use sid_services::ContentService;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum KontenAction {
    /// Published news, or one article by slug.
    Berita {
        slug: Option<String>,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Announcements active today.
    Pengumuman,
    /// Upcoming agenda.
    Agenda,
    /// Gallery photos.
    Galeri {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

pub async fn run(config: ConfigHandle, action: KontenAction, format: OutputFormat) -> SidResult<()> {
    let registry = super::connect(&config).await?;
    let content = ContentService::new();
    let backend = registry.backend();
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    match action {
        KontenAction::Berita { slug: Some(slug), .. } => {
            super::require(&registry, Route::BeritaDetail(slug.clone())).await?;
            let berita = content.berita_by_slug(backend, &slug).await.map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&berita),
                OutputFormat::Text => {
                    println!("{}", style(&berita.judul).bold());
                    println!(
                        "  {} {}",
                        super::or_dash(berita.published_at.as_deref()),
                        berita.penulis.as_deref().map(|p| format!("oleh {p}")).unwrap_or_default()
                    );
                    println!();
                    println!("{}", berita.konten);
                }
            }
        }
        KontenAction::Berita { slug: None, limit } => {
            super::require(&registry, Route::Berita).await?;
            let list = content.list_berita(backend, limit).await.map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&list),
                OutputFormat::Text => {
                    let mut table = super::new_table(vec!["Tanggal", "Judul", "Slug"]);
                    for b in &list {
                        table.add_row(vec![
                            super::or_dash(b.published_at.as_deref().and_then(|d| d.get(..10))).to_string(),
                            super::truncate(&b.judul, 50),
                            b.slug.clone(),
                        ]);
                    }
                    println!("{table}");
                }
            }
        }
        KontenAction::Pengumuman => {
            super::require(&registry, Route::Pengumuman).await?;
            let list = content
                .active_pengumuman(backend, &today)
                .await
                .map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&list),
                OutputFormat::Text => {
                    if list.is_empty() {
                        println!("Tidak ada pengumuman aktif.");
                    }
                    for p in &list {
                        let title = if p.penting {
                            style(format!("[PENTING] {}", p.judul)).red().bold()
                        } else {
                            style(p.judul.clone()).bold()
                        };
                        println!("{title}");
                        println!("  {}", p.isi);
                        println!();
                    }
                }
            }
        }
        KontenAction::Agenda => {
            super::require(&registry, Route::Agenda).await?;
            let list = content
                .upcoming_agenda(backend, &today)
                .await
                .map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&list),
                OutputFormat::Text => {
                    let mut table = super::new_table(vec!["Mulai", "Kegiatan", "Lokasi"]);
                    for a in &list {
                        table.add_row(vec![
                            a.waktu_mulai.clone(),
                            super::truncate(&a.judul, 40),
                            super::or_dash(a.lokasi.as_deref()).to_string(),
                        ]);
                    }
                    println!("{table}");
                }
            }
        }
        KontenAction::Galeri { limit } => {
            super::require(&registry, Route::Galeri).await?;
            let list = content.list_galeri(backend, limit).await.map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&list),
                OutputFormat::Text => {
                    let mut table = super::new_table(vec!["Judul", "Gambar"]);
                    for g in &list {
                        table.add_row(vec![super::truncate(&g.judul, 40), g.gambar_url.clone()]);
                    }
                    println!("{table}");
                }
            }
        }
    }
    Ok(())
}
