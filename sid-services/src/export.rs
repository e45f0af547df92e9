//! `.xlsx` export of residents and filtered grid rows.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::info;

use sid_core::error::{SidError, SidResult};
use sid_models::Penduduk;

use crate::grid::GridState;

/// Column headers and rows ready to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    pub sheet: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn xlsx_err(e: XlsxError) -> SidError {
    SidError::Spreadsheet(e.to_string())
}

/// Write `table` as a single-sheet workbook with a bold header row.
pub fn write_xlsx(table: &ExportTable, path: &Path) -> SidResult<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(&table.sheet)).map_err(xlsx_err)?;

    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &bold)
            .map_err(xlsx_err)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            worksheet
                .write_string((r + 1) as u32, col as u16, value)
                .map_err(xlsx_err)?;
        }
    }
    worksheet.autofit();

    workbook.save(path).map_err(xlsx_err)?;
    info!("exported {} rows to {}", table.rows.len(), path.display());
    Ok(())
}

/// Worksheet names are limited to 31 characters and may not contain `[]:*?/\`.
fn sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Data".to_string()
    } else {
        cleaned
    }
}

const PENDUDUK_HEADERS: &[&str] = &[
    "NIK",
    "No. KK",
    "Nama",
    "Tempat Lahir",
    "Tanggal Lahir",
    "Jenis Kelamin",
    "Agama",
    "Pekerjaan",
    "Status Perkawinan",
    "Pendidikan",
    "Alamat",
    "RT",
    "RW",
    "Dusun",
    "Hubungan Keluarga",
    "Kewarganegaraan",
];

/// Residents in the same column layout the importer reads back.
pub fn penduduk_table(residents: &[Penduduk]) -> ExportTable {
    let rows = residents
        .iter()
        .map(|p| {
            [
                Some(p.nik.clone()),
                Some(p.no_kk.clone()),
                Some(p.nama.clone()),
                p.tempat_lahir.clone(),
                p.tanggal_lahir.clone(),
                p.jenis_kelamin.clone(),
                p.agama.clone(),
                p.pekerjaan.clone(),
                p.status_perkawinan.clone(),
                p.pendidikan.clone(),
                p.alamat.clone(),
                p.rt.clone(),
                p.rw.clone(),
                p.dusun.clone(),
                p.hubungan_keluarga.clone(),
                p.kewarganegaraan.clone(),
            ]
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect()
        })
        .collect();

    ExportTable {
        sheet: "Penduduk".to_string(),
        headers: PENDUDUK_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

/// The grid's filtered rows (all pages, current group path) as displayed.
pub fn grid_table(grid: &GridState) -> ExportTable {
    ExportTable {
        sheet: grid.form().judul.clone(),
        headers: grid.columns(),
        rows: grid.export_rows().into_iter().map(|r| r.cells).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{read_sheet, row_to_penduduk};

    fn resident(nik: &str, nama: &str) -> Penduduk {
        Penduduk {
            nik: nik.into(),
            no_kk: "3301010101010000".into(),
            nama: nama.into(),
            tanggal_lahir: Some("1990-01-31".into()),
            jenis_kelamin: Some("L".into()),
            dusun: Some("Krajan".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_sheet_name() {
        assert_eq!(sheet_name("Data: 2024/2025"), "Data 20242025");
        assert_eq!(sheet_name(""), "Data");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn test_export_reads_back_through_importer() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("penduduk.xlsx");
        let residents = vec![
            resident("3301010101010001", "Budi Santoso"),
            resident("3301010101010002", "Sri Wahyuni"),
        ];

        write_xlsx(&penduduk_table(&residents), &path).unwrap();
        let rows = read_sheet(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 2);

        let back: Vec<Penduduk> = rows.iter().map(|(_, row)| row_to_penduduk(row)).collect();
        assert_eq!(back, residents);
    }
}
