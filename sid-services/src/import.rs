//! Spreadsheet import of residents.
//!
//! The first worksheet is read into row maps keyed by normalized header.
//! Rows become [`Penduduk`] records, are validated, and are inserted in
//! fixed-size batches one after another. A batch is never retried; its
//! rows count as failed and the import moves on.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Reader};
use tracing::{info, warn};

use sid_api::Backend;
use sid_core::constants::tables;
use sid_core::error::{SidError, SidResult};
use sid_models::validation::{clean_identifier, normalize_jenis_kelamin, parse_date, validate_penduduk};
use sid_models::Penduduk;

use crate::event_bus::{AppEvent, EventBus};
use crate::service::{impl_service, ServiceState};

/// One spreadsheet row keyed by normalized header.
pub type SheetRow = BTreeMap<String, String>;

/// Spreadsheet header spellings mapped onto resident columns.
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("nomor_induk_kependudukan", "nik"),
    ("no_nik", "nik"),
    ("kk", "no_kk"),
    ("nomor_kk", "no_kk"),
    ("no_kartu_keluarga", "no_kk"),
    ("nomor_kartu_keluarga", "no_kk"),
    ("nama_lengkap", "nama"),
    ("tmp_lahir", "tempat_lahir"),
    ("tgl_lahir", "tanggal_lahir"),
    ("jk", "jenis_kelamin"),
    ("l_p", "jenis_kelamin"),
    ("status_kawin", "status_perkawinan"),
    ("pendidikan_terakhir", "pendidikan"),
    ("shdk", "hubungan_keluarga"),
    ("hubungan", "hubungan_keluarga"),
    ("status_hubungan", "hubungan_keluarga"),
    ("status_hubungan_keluarga", "hubungan_keluarga"),
    ("warga_negara", "kewarganegaraan"),
];

/// Lowercase, collapse non-alphanumerics to `_`, then apply aliases.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == out)
        .map(|(_, column)| (*column).to_string())
        .unwrap_or(out)
}

/// Text of a cell. Whole floats lose their `.0`; dates become ISO dates.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string().trim().to_string(),
    }
}

/// Read the first worksheet of an `.xlsx`/`.xls` file. Blank rows are
/// skipped; each kept row carries its 1-based row number in the sheet.
pub fn read_sheet(path: &Path) -> SidResult<Vec<(usize, SheetRow)>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| SidError::Spreadsheet(format!("{}: {e}", path.display())))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SidError::Spreadsheet(format!("{} has no worksheets", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| SidError::Spreadsheet(format!("{sheet}: {e}")))?;

    // The range begins at the first used cell, not necessarily at A1.
    let header_row = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| normalize_header(&cell_text(c))).collect(),
        None => return Ok(Vec::new()),
    };

    let out: Vec<(usize, SheetRow)> = rows
        .enumerate()
        .map(|(i, cells)| {
            let row = headers
                .iter()
                .zip(cells)
                .filter(|(h, _)| !h.is_empty())
                .map(|(h, c)| (h.clone(), cell_text(c)))
                .filter(|(_, v)| !v.is_empty())
                .collect::<SheetRow>();
            (header_row + 1 + i, row)
        })
        .filter(|(_, row)| !row.is_empty())
        .collect();
    info!("read {} rows from sheet '{sheet}'", out.len());
    Ok(out)
}

fn optional(row: &SheetRow, key: &str) -> Option<String> {
    row.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Build a resident from a sheet row, normalizing identifiers, dates and gender.
/// Values that cannot be normalized are kept as-is for validation to report.
pub fn row_to_penduduk(row: &SheetRow) -> Penduduk {
    let ident = |key: &str| optional(row, key).map(|v| clean_identifier(&v));
    let tanggal_lahir = optional(row, "tanggal_lahir").map(|raw| {
        parse_date(&raw)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or(raw)
    });
    let jenis_kelamin = optional(row, "jenis_kelamin").map(|raw| {
        normalize_jenis_kelamin(&raw)
            .map(str::to_string)
            .unwrap_or(raw)
    });

    Penduduk {
        id: None,
        nik: ident("nik").unwrap_or_default(),
        no_kk: ident("no_kk").unwrap_or_default(),
        nama: optional(row, "nama").unwrap_or_default(),
        tempat_lahir: optional(row, "tempat_lahir"),
        tanggal_lahir,
        jenis_kelamin,
        agama: optional(row, "agama"),
        pekerjaan: optional(row, "pekerjaan"),
        status_perkawinan: optional(row, "status_perkawinan"),
        pendidikan: optional(row, "pendidikan"),
        alamat: optional(row, "alamat"),
        rt: ident("rt"),
        rw: ident("rw"),
        dusun: optional(row, "dusun"),
        hubungan_keluarga: optional(row, "hubungan_keluarga"),
        kewarganegaraan: optional(row, "kewarganegaraan"),
    }
}

/// A rejected row or batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    /// Spreadsheet row number (header is row 1); `None` for a whole batch.
    pub row: Option<usize>,
    pub message: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub batches: usize,
    pub errors: Vec<ImportError>,
}

pub struct ImportService {
    state: ServiceState,
    event_bus: EventBus,
    batch_size: usize,
}

impl_service!(ImportService, "import");

impl ImportService {
    pub fn new(event_bus: EventBus, batch_size: usize) -> Self {
        Self {
            state: ServiceState::Created,
            event_bus,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Read a spreadsheet and import its rows. Errors name the sheet row.
    pub async fn import_file(&self, backend: &dyn Backend, path: &Path) -> SidResult<ImportReport> {
        let rows = read_sheet(path)?;
        let residents: Vec<(usize, Penduduk)> = rows
            .iter()
            .map(|(line, row)| (*line, row_to_penduduk(row)))
            .collect();
        self.import_numbered(backend, &residents).await
    }

    /// Validate and insert residents batch by batch, numbering them as if
    /// they were sheet rows directly below a header.
    ///
    /// `succeeded + failed` always equals the number of input rows.
    pub async fn import_penduduk(
        &self,
        backend: &dyn Backend,
        residents: &[Penduduk],
    ) -> SidResult<ImportReport> {
        let numbered: Vec<(usize, Penduduk)> = residents
            .iter()
            .enumerate()
            .map(|(i, p)| (i + 2, p.clone()))
            .collect();
        self.import_numbered(backend, &numbered).await
    }

    async fn import_numbered(
        &self,
        backend: &dyn Backend,
        residents: &[(usize, Penduduk)],
    ) -> SidResult<ImportReport> {
        let mut report = ImportReport {
            total: residents.len(),
            ..Default::default()
        };
        let total_batches = residents.len().div_ceil(self.batch_size);

        for (batch_idx, chunk) in residents.chunks(self.batch_size).enumerate() {
            let mut valid = Vec::with_capacity(chunk.len());

            for (line, resident) in chunk {
                let issues = validate_penduduk(resident);
                if issues.is_empty() {
                    valid.push(resident);
                } else {
                    report.failed += 1;
                    report.errors.push(ImportError {
                        row: Some(*line),
                        message: issues
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("; "),
                    });
                }
            }

            if !valid.is_empty() {
                let payload = serde_json::to_value(&valid)?;
                match backend.insert(tables::PENDUDUK, &payload).await {
                    Ok(_) => report.succeeded += valid.len(),
                    Err(e) => {
                        warn!("import batch {} failed: {e}", batch_idx + 1);
                        report.failed += valid.len();
                        report.errors.push(ImportError {
                            row: None,
                            message: format!("batch {}: {}", batch_idx + 1, e.user_message()),
                        });
                    }
                }
            }

            report.batches += 1;
            self.event_bus.emit(AppEvent::ImportProgress {
                batch: batch_idx + 1,
                total_batches,
                succeeded: report.succeeded,
                failed: report.failed,
            });
        }

        info!(
            "import finished: {} succeeded, {} failed in {} batches",
            report.succeeded, report.failed, report.batches
        );
        self.event_bus.emit(AppEvent::ImportComplete {
            succeeded: report.succeeded,
            failed: report.failed,
        });
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Nama Lengkap "), "nama");
        assert_eq!(normalize_header("No. KK"), "no_kk");
        assert_eq!(normalize_header("L/P"), "jenis_kelamin");
        assert_eq!(normalize_header("Tgl. Lahir"), "tanggal_lahir");
        assert_eq!(normalize_header("DUSUN"), "dusun");
        assert_eq!(normalize_header("---"), "");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(3301010101010001.0)), "3301010101010001");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::String(" Krajan ".into())), "Krajan");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_row_to_penduduk() {
        let row: SheetRow = [
            ("nik", "'3301010101010001"),
            ("no_kk", "3301 0101 0101 0000"),
            ("nama", " Sri Wahyuni "),
            ("tanggal_lahir", "17/08/1985"),
            ("jenis_kelamin", "Perempuan"),
            ("rt", "1.0"),
            ("dusun", "Krajan"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let p = row_to_penduduk(&row);
        assert_eq!(p.nik, "3301010101010001");
        assert_eq!(p.no_kk, "3301010101010000");
        assert_eq!(p.nama, "Sri Wahyuni");
        assert_eq!(p.tanggal_lahir.as_deref(), Some("1985-08-17"));
        assert_eq!(p.jenis_kelamin.as_deref(), Some("P"));
        assert_eq!(p.rt.as_deref(), Some("1"));
        assert_eq!(p.agama, None);
        assert!(validate_penduduk(&p).is_empty());
    }

    #[test]
    fn test_unrecognized_values_are_kept_for_validation() {
        let row: SheetRow = [("nik", "123"), ("jenis_kelamin", "X")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let p = row_to_penduduk(&row);
        assert_eq!(p.jenis_kelamin.as_deref(), Some("X"));
        assert!(!validate_penduduk(&p).is_empty());
    }
}
