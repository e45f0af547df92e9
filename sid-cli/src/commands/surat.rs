//! Letter (surat) commands: templates, composing a letter, and the archive.

use std::path::PathBuf;

use clap::Subcommand;
use console::style;
use dialoguer::{Confirm, Input, Select};

use sid_core::config::ConfigHandle;
use sid_core::error::{SidError, SidResult};
use sid_core::platform::Platform;
use sid_models::validation::parse_date;
use sid_models::{Penduduk, SuratKeluar, TemplateSurat};
use sid_services::letter::search_roster;
use sid_services::routes::Route;
use sid_services::{LetterDraft, LetterService, Numbering, ServiceRegistry};
use crate::OutputFormat;

/// Roster matches offered per search.
const PICK_LIMIT: usize = 10;

#[derive(Subcommand)]
pub enum SuratAction {
    /// List active letter templates.
    Templates,
    /// Compose, number, archive and render a letter.
    Buat {
        template_id: String,
        /// Resident for a section as section=NIK; repeatable.
        #[arg(long = "penduduk")]
        residents: Vec<String>,
        /// Operator input as key=value; repeatable.
        #[arg(long = "isi")]
        inputs: Vec<String>,
        /// Sequence number of the letter.
        #[arg(long)]
        nomor: Option<String>,
        /// Let the backend assign the letter number.
        #[arg(long, conflicts_with = "nomor")]
        remote: bool,
        /// Letter date (defaults to today).
        #[arg(long)]
        tanggal: Option<String>,
        /// Pick residents from the local cache instead of the backend.
        #[arg(long)]
        cache: bool,
        /// Directory for the rendered document.
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Skip confirmation prompts.
        #[arg(short, long)]
        yes: bool,
    },
    /// List archived outgoing letters.
    Arsip {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn letter_service(registry: &ServiceRegistry, village: sid_core::config::VillageConfig) -> LetterService {
    LetterService::new(
        registry.database.clone(),
        registry.capabilities.clone(),
        registry.event_bus.clone(),
        village,
    )
}

fn split_pair(raw: &str) -> SidResult<(&str, &str)> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| SidError::Validation(format!("expected key=value, got '{raw}'")))
}

pub async fn run(config: ConfigHandle, action: SuratAction, format: OutputFormat) -> SidResult<()> {
    let registry = super::connect(&config).await?;
    let village = config.read().await.village.clone();
    let service = letter_service(&registry, village);
    let backend = registry.backend();

    match action {
        SuratAction::Templates => {
            super::require(&registry, Route::Surat).await?;
            let templates = service.list_templates(backend).await.map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&templates),
                OutputFormat::Text => print_templates(&templates),
            }
        }
        SuratAction::Buat {
            template_id,
            residents,
            inputs,
            nomor,
            remote,
            tanggal,
            cache,
            out,
            yes,
        } => {
            super::require(&registry, Route::Surat).await?;
            let template = service
                .get_template(backend, &template_id)
                .await
                .map_err(super::report_failure)?;
            let mut draft = service.start_draft(backend, template).await?;

            if let Some(raw) = tanggal {
                let date = parse_date(&raw)
                    .ok_or_else(|| SidError::Validation(format!("tanggal '{raw}' tidak dikenali")))?;
                draft.set_letter_date(date);
            }

            let roster = if cache {
                service.cached_roster()?
            } else {
                service.load_roster(backend).await.map_err(super::report_failure)?
            };
            pick_residents(&mut draft, &roster, &residents, yes)?;
            fill_inputs(&mut draft, &inputs, yes)?;

            let numbering = if remote {
                Numbering::Remote
            } else {
                let raw = match nomor {
                    Some(n) => n,
                    None if yes => {
                        return Err(SidError::Validation("nomor urut surat belum diisi".into()))
                    }
                    None => Input::<String>::new()
                        .with_prompt("Nomor urut surat")
                        .interact_text()
                        .map_err(super::prompt_err)?,
                };
                draft.sequence_mut().set(&raw)?;
                Numbering::Manual
            };

            print_preview(&draft);
            draft.ensure_complete()?;
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Simpan dan buat surat ini?")
                    .default(true)
                    .interact()
                    .map_err(super::prompt_err)?;
                if !confirmed {
                    println!("Dibatalkan.");
                    return Ok(());
                }
            }

            let template = draft.template().clone();
            let mut letter = service
                .finalize(backend, &mut draft, numbering)
                .await
                .map_err(super::report_failure)?;
            println!(
                "{} surat {} diarsipkan",
                style("OK").green().bold(),
                letter.archive.nomor_surat
            );

            let saved = if template.template_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                println!(
                    "  {} template belum memiliki berkas dokumen, surat tidak dirender",
                    style("!").yellow().bold()
                );
                None
            } else {
                let file_url = service
                    .render(backend, &template, &mut letter)
                    .await
                    .map_err(super::report_failure)?;
                let dir = match out {
                    Some(dir) => dir,
                    None => Platform::documents_dir()?,
                };
                let path = service
                    .download_to(backend, &file_url, &dir, &letter.archive.nomor_surat)
                    .await?;
                println!("  {} {}", style("Disimpan").green(), path.display());
                Some(path)
            };

            if format == OutputFormat::Json {
                super::print_json(&serde_json::json!({
                    "archive": letter.archive,
                    "file": saved,
                }));
            }
        }
        SuratAction::Arsip { limit } => {
            super::require(&registry, Route::ArsipSurat).await?;
            let archive = service
                .list_archive(backend, limit)
                .await
                .map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&archive),
                OutputFormat::Text => print_archive(&archive),
            }
        }
    }
    Ok(())
}

/// Select a resident for every section, from `section=NIK` arguments or
/// an interactive search.
fn pick_residents(
    draft: &mut LetterDraft,
    roster: &[Penduduk],
    given: &[String],
    non_interactive: bool,
) -> SidResult<()> {
    for raw in given {
        let (section, nik) = split_pair(raw)?;
        let resident = roster
            .iter()
            .find(|p| p.nik == nik)
            .cloned()
            .ok_or_else(|| SidError::NotFound(format!("penduduk {nik}")))?;
        draft.select_resident(section, resident)?;
    }

    for section in draft.sections() {
        if draft.resident(&section).is_some() || non_interactive {
            continue;
        }
        loop {
            let query: String = Input::new()
                .with_prompt(format!("Cari penduduk untuk bagian '{section}' (nama/NIK)"))
                .interact_text()
                .map_err(super::prompt_err)?;
            let matches = search_roster(roster, &query, PICK_LIMIT);
            if matches.is_empty() {
                println!("  tidak ada penduduk yang cocok, coba lagi");
                continue;
            }
            let labels: Vec<String> = matches
                .iter()
                .map(|p| format!("{} - {} ({})", p.nik, p.nama, super::or_dash(p.dusun.as_deref())))
                .collect();
            let idx = Select::new()
                .with_prompt("Pilih penduduk")
                .items(labels.as_slice())
                .default(0)
                .interact()
                .map_err(super::prompt_err)?;
            draft.select_resident(&section, matches[idx].clone())?;
            break;
        }
    }
    Ok(())
}

/// Fill operator inputs from `key=value` arguments, prompting for the rest.
fn fill_inputs(draft: &mut LetterDraft, given: &[String], non_interactive: bool) -> SidResult<()> {
    for raw in given {
        let (key, value) = split_pair(raw)?;
        draft.set_input(key, value)?;
    }
    if non_interactive {
        return Ok(());
    }

    let pending: Vec<(String, String, bool)> = draft
        .template()
        .fields
        .iter()
        .filter(|f| f.source.is_operator_input())
        .filter(|f| draft.input(&f.key).is_none())
        .map(|f| (f.key.clone(), f.label.clone(), f.required))
        .collect();

    for (key, label, required) in pending {
        loop {
            let value: String = Input::new()
                .with_prompt(if required { format!("{label} *") } else { label.clone() })
                .allow_empty(!required)
                .interact_text()
                .map_err(super::prompt_err)?;
            match draft.set_input(&key, &value) {
                Ok(shown) => {
                    if shown != value {
                        println!("  {}", style(&shown).dim());
                    }
                    break;
                }
                Err(e) => println!("  {} {}", style("!").yellow().bold(), e.user_message()),
            }
        }
    }
    Ok(())
}

fn print_preview(draft: &LetterDraft) {
    let preview = draft.preview();
    println!();
    println!("{}", style(&draft.template().nama).bold().underlined());
    if let Some(nomor) = draft.nomor_surat() {
        println!("Nomor: {nomor}");
    }
    println!();
    println!("{}", preview.text);
    println!();
    if !preview.unknown.is_empty() {
        println!(
            "  {} placeholder tanpa nilai: {}",
            style("!").yellow().bold(),
            preview.unknown.join(", ")
        );
    }
    let missing = draft.missing_required();
    if !missing.is_empty() {
        println!("  {} belum diisi: {}", style("!").red().bold(), missing.join(", "));
    }
}

fn print_templates(templates: &[TemplateSurat]) {
    if templates.is_empty() {
        println!("Belum ada template surat aktif.");
        return;
    }
    let mut table = super::new_table(vec!["ID", "Nama", "Kode", "Indeks", "Isian", "Dokumen"]);
    for t in templates {
        let has_doc = t.template_url.as_deref().map_or(false, |u| !u.trim().is_empty());
        table.add_row(vec![
            t.id.clone(),
            super::truncate(&t.nama, 40),
            super::or_dash(Some(t.kode.as_str())).to_string(),
            super::or_dash(t.indeks.as_deref()).to_string(),
            t.fields.len().to_string(),
            if has_doc { "ya" } else { "-" }.to_string(),
        ]);
    }
    println!("{table}");
}

fn print_archive(archive: &[SuratKeluar]) {
    if archive.is_empty() {
        println!("Arsip surat kosong.");
        return;
    }
    let mut table = super::new_table(vec!["Nomor Surat", "Tanggal", "Perihal", "Berkas"]);
    for s in archive {
        table.add_row(vec![
            s.nomor_surat.clone(),
            s.tanggal_surat.clone(),
            super::truncate(super::or_dash(s.perihal.as_deref()), 40),
            if s.file_url.is_some() { "ya" } else { "-" }.to_string(),
        ]);
    }
    println!("{table}");
}
