//! Custom form (formulir) commands: the submission grid, edits, deletes,
//! exports and image uploads.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use dialoguer::Confirm;
use serde_json::{Map, Value};

use sid_core::config::ConfigHandle;
use sid_core::error::{SidError, SidResult};
use sid_models::{FieldKind, FormDefinition, FormSubmission};
use sid_services::export::{grid_table, write_xlsx};
use sid_services::grid::{GridView, SortDirection};
use sid_services::routes::Route;
use sid_services::{FormDataService, GridState, ServiceRegistry};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum FormulirAction {
    /// List forms.
    List,
    /// Show the submissions of a form as a grid.
    Show {
        form_id: String,
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Edit fields of one submission.
    Edit {
        form_id: String,
        submission_id: String,
        /// Changes as field=value; an empty value clears the field.
        #[arg(required = true)]
        changes: Vec<String>,
    },
    /// Delete one submission and its uploaded images.
    Hapus {
        form_id: String,
        submission_id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Export the filtered grid to an .xlsx file.
    Export {
        form_id: String,
        file: PathBuf,
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Upload an image into an image field of a submission.
    Upload {
        form_id: String,
        submission_id: String,
        field: String,
        image: PathBuf,
    },
}

/// Grid controls shared by `show` and `export`.
#[derive(Args, Debug, Default)]
pub struct GridArgs {
    /// Grouping hierarchy, comma separated (defaults to the form's own).
    #[arg(long, value_delimiter = ',')]
    group: Option<Vec<String>>,
    /// Bucket to open at each grouping level, outermost first.
    #[arg(long = "buka")]
    path: Vec<String>,
    /// Free-text search across all columns.
    #[arg(long)]
    cari: Option<String>,
    /// Equality filter as field=value; repeatable.
    #[arg(long = "filter")]
    filters: Vec<String>,
    /// Sort column, with an optional ":desc" suffix.
    #[arg(long)]
    sort: Option<String>,
    #[arg(long, default_value = "1")]
    page: usize,
    #[arg(long)]
    page_size: Option<usize>,
}

fn split_assignment(raw: &str) -> SidResult<(&str, &str)> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| SidError::Validation(format!("expected field=value, got '{raw}'")))
}

fn parse_sort(raw: &str) -> (&str, SortDirection) {
    match raw.rsplit_once(':') {
        Some((field, dir)) if dir.eq_ignore_ascii_case("desc") => (field, SortDirection::Desc),
        Some((field, dir)) if dir.eq_ignore_ascii_case("asc") => (field, SortDirection::Asc),
        _ => (raw, SortDirection::Asc),
    }
}

/// Apply the command-line controls in the order a user would click them.
fn apply_grid_args(grid: &mut GridState, args: &GridArgs, default_page_size: usize) -> SidResult<()> {
    grid.set_page_size(args.page_size.unwrap_or(default_page_size))?;
    if let Some(hierarchy) = &args.group {
        let hierarchy = hierarchy
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        grid.set_hierarchy(hierarchy)?;
    }
    if let Some(text) = &args.cari {
        grid.set_search(text);
    }
    for raw in &args.filters {
        let (field, value) = split_assignment(raw)?;
        grid.set_filter(field, value)?;
    }
    if let Some(raw) = &args.sort {
        let (field, direction) = parse_sort(raw);
        grid.set_sort(field, direction)?;
    }
    for key in &args.path {
        grid.enter_group(key)?;
    }
    grid.set_page(args.page);
    Ok(())
}

fn form_service(registry: &ServiceRegistry, bucket: String) -> FormDataService {
    FormDataService::new(
        registry.auth.clone(),
        registry.capabilities.clone(),
        registry.event_bus.clone(),
        bucket,
    )
}

fn find_submission<'a>(records: &'a [FormSubmission], id: &str) -> SidResult<&'a FormSubmission> {
    records
        .iter()
        .find(|r| r.id == id)
        .ok_or_else(|| SidError::NotFound(format!("data formulir {id}")))
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

pub async fn run(config: ConfigHandle, action: FormulirAction, format: OutputFormat) -> SidResult<()> {
    let registry = super::connect(&config).await?;
    let (bucket, default_page_size) = {
        let cfg = config.read().await;
        (cfg.storage.bucket.clone(), cfg.grid.default_page_size)
    };
    let service = form_service(&registry, bucket);
    let backend = registry.backend();

    match action {
        FormulirAction::List => {
            super::require(&registry, Route::Formulir).await?;
            let forms = service.list_forms(backend).await.map_err(super::report_failure)?;
            match format {
                OutputFormat::Json => super::print_json(&forms),
                OutputFormat::Text => print_forms(&forms),
            }
        }
        FormulirAction::Show { form_id, grid: args } => {
            super::require(&registry, Route::FormulirData(form_id.clone())).await?;
            let grid = load_grid(&service, backend, &form_id, &args, default_page_size).await?;
            let view = grid.view();
            match format {
                OutputFormat::Json => super::print_json(&view_json(&view)),
                OutputFormat::Text => print_view(grid.form(), &view),
            }
        }
        FormulirAction::Edit { form_id, submission_id, changes } => {
            super::require(&registry, Route::FormulirData(form_id.clone())).await?;
            let form = service.get_form(backend, &form_id).await.map_err(super::report_failure)?;
            let records = service.load_submissions(backend, &form_id).await.map_err(super::report_failure)?;
            let current = find_submission(&records, &submission_id)?;

            let mut patch = Map::new();
            for raw in &changes {
                let (field, value) = split_assignment(raw)?;
                patch.insert(field.to_string(), Value::String(value.to_string()));
            }
            let updated = service
                .update_submission(backend, &form, current, patch)
                .await
                .map_err(super::report_failure)?;

            match format {
                OutputFormat::Json => super::print_json(&updated),
                OutputFormat::Text => {
                    println!("{} data {} diperbarui", style("OK").green().bold(), updated.id);
                }
            }
        }
        FormulirAction::Hapus { form_id, submission_id, yes } => {
            super::require(&registry, Route::FormulirData(form_id.clone())).await?;
            let form = service.get_form(backend, &form_id).await.map_err(super::report_failure)?;
            let records = service.load_submissions(backend, &form_id).await.map_err(super::report_failure)?;
            let current = find_submission(&records, &submission_id)?;

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Hapus data {submission_id} dari {}?", form.judul))
                    .default(false)
                    .interact()
                    .map_err(super::prompt_err)?;
                if !confirmed {
                    println!("Dibatalkan.");
                    return Ok(());
                }
            }
            service
                .delete_submission(backend, &form, current)
                .await
                .map_err(super::report_failure)?;
            println!("{} data {submission_id} dihapus", style("OK").green().bold());
        }
        FormulirAction::Export { form_id, file, grid: args } => {
            super::require(&registry, Route::FormulirData(form_id.clone())).await?;
            let grid = load_grid(&service, backend, &form_id, &args, default_page_size).await?;
            let table = grid_table(&grid);
            write_xlsx(&table, &file)?;
            println!(
                "{} {} baris diekspor ke {}",
                style("OK").green().bold(),
                grid.export_rows().len(),
                file.display()
            );
        }
        FormulirAction::Upload { form_id, submission_id, field, image } => {
            super::require(&registry, Route::FormulirData(form_id.clone())).await?;
            let form = service.get_form(backend, &form_id).await.map_err(super::report_failure)?;
            let descriptor = form
                .field(&field)
                .ok_or_else(|| SidError::Validation(format!("kolom '{field}' tidak ada di formulir")))?;
            if !matches!(descriptor.kind, FieldKind::Image) {
                return Err(SidError::Validation(format!("kolom '{field}' bukan kolom gambar")));
            }
            let records = service.load_submissions(backend, &form_id).await.map_err(super::report_failure)?;
            let current = find_submission(&records, &submission_id)?;

            let bytes = std::fs::read(&image)?;
            let file_name = image
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("gambar.jpg");
            let url = service
                .upload_image(backend, &form_id, file_name, bytes, mime_for(&image))
                .await
                .map_err(super::report_failure)?;

            let mut patch = Map::new();
            patch.insert(field.clone(), Value::String(url.clone()));
            service
                .update_submission(backend, &form, current, patch)
                .await
                .map_err(super::report_failure)?;

            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "field": field, "url": url })),
                OutputFormat::Text => println!("{} {field} -> {url}", style("OK").green().bold()),
            }
        }
    }
    Ok(())
}

async fn load_grid(
    service: &FormDataService,
    backend: &dyn sid_api::Backend,
    form_id: &str,
    args: &GridArgs,
    default_page_size: usize,
) -> SidResult<GridState> {
    let form = service.get_form(backend, form_id).await.map_err(super::report_failure)?;
    let records = service
        .load_submissions(backend, form_id)
        .await
        .map_err(super::report_failure)?;
    let mut grid = GridState::new(form, records);
    apply_grid_args(&mut grid, args, default_page_size)?;
    Ok(grid)
}

fn print_forms(forms: &[FormDefinition]) {
    if forms.is_empty() {
        println!("Belum ada formulir.");
        return;
    }
    let mut table = super::new_table(vec!["ID", "Judul", "Kolom", "Pengelompokan", "Dibuat"]);
    for f in forms {
        table.add_row(vec![
            f.id.clone(),
            super::truncate(&f.judul, 40),
            f.fields.len().to_string(),
            if f.group_hierarchy.is_empty() {
                "-".to_string()
            } else {
                f.group_hierarchy.join(" > ")
            },
            super::or_dash(f.created_at.as_deref()).to_string(),
        ]);
    }
    println!("{table}");
}

fn view_json(view: &GridView) -> Value {
    let breadcrumbs: Vec<Value> = view
        .breadcrumbs
        .iter()
        .map(|b| serde_json::json!({ "field": b.field, "key": b.key }))
        .collect();
    let buckets: Vec<Value> = view
        .buckets
        .iter()
        .map(|b| serde_json::json!({ "key": b.key, "count": b.count }))
        .collect();
    let rows: Vec<Value> = view
        .rows
        .iter()
        .map(|r| serde_json::json!({ "id": r.id, "cells": r.cells }))
        .collect();
    serde_json::json!({
        "columns": view.columns,
        "breadcrumbs": breadcrumbs,
        "buckets": buckets,
        "rows": rows,
        "page": view.page,
        "page_count": view.page_count,
        "page_size": view.page_size,
        "total": view.total,
    })
}

fn print_view(form: &FormDefinition, view: &GridView) {
    println!("{}", style(&form.judul).bold());
    if !view.breadcrumbs.is_empty() {
        let trail: Vec<String> = view
            .breadcrumbs
            .iter()
            .map(|b| format!("{}: {}", b.field, b.key))
            .collect();
        println!("  {}", style(trail.join(" > ")).dim());
    }

    if !view.buckets.is_empty() {
        let mut table = super::new_table(vec!["Kelompok", "Jumlah"]);
        for b in &view.buckets {
            table.add_row(vec![b.key.clone(), b.count.to_string()]);
        }
        println!("{table}");
        println!("  Buka kelompok dengan --buka <nama>. {} data.", view.total);
        return;
    }

    if view.rows.is_empty() {
        println!("Tidak ada data.");
        return;
    }
    let mut headers = vec!["ID"];
    headers.extend(view.columns.iter().map(String::as_str));
    let mut table = super::new_table(headers);
    for row in &view.rows {
        let mut cells = vec![row.id.clone()];
        cells.extend(row.cells.iter().map(|c| super::truncate(c, 40)));
        table.add_row(cells);
    }
    println!("{table}");
    println!(
        "  Halaman {}/{} ({} data, {} per halaman)",
        view.page, view.page_count, view.total, view.page_size
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("kondisi=Layak").unwrap(), ("kondisi", "Layak"));
        assert_eq!(split_assignment("bantuan=").unwrap(), ("bantuan", ""));
        assert!(split_assignment("=x").is_err());
        assert!(split_assignment("kondisi").is_err());
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort("nama"), ("nama", SortDirection::Asc));
        assert_eq!(parse_sort("bantuan:desc"), ("bantuan", SortDirection::Desc));
        assert_eq!(parse_sort("bantuan:ASC"), ("bantuan", SortDirection::Asc));
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for(Path::new("rumah.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("rumah")), "image/jpeg");
    }
}
