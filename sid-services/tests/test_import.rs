//! Batched resident import and spreadsheet export.

mod common;

use common::*;
use sid_core::constants::tables;
use sid_models::Penduduk;
use sid_services::event_bus::AppEvent;
use sid_services::export::{penduduk_table, write_xlsx, ExportTable};
use sid_services::ImportService;

fn residents(count: usize) -> Vec<Penduduk> {
    (0..count)
        .map(|i| {
            let mut p = penduduk(&format!("3301010101{i:06}"), &format!("Warga {i}"), "Krajan");
            p.id = None;
            p
        })
        .collect()
}

#[tokio::test]
async fn test_import_counts_every_row_once() {
    let backend = FakeBackend::new();
    backend.fail_insert_call(1);
    let bus = create_test_event_bus();
    let mut rx = bus.subscribe();
    let svc = ImportService::new(bus, 100);

    let mut rows = residents(250);
    rows[3].nik = "123".into();
    rows[150].nama = String::new();
    rows[249].tanggal_lahir = Some("kemarin".into());

    let report = svc.import_penduduk(&backend, &rows).await.unwrap();
    assert_eq!(report.total, 250);
    assert_eq!(report.batches, 3);
    assert_eq!(report.succeeded + report.failed, 250);
    assert_eq!(report.succeeded, 99 + 49);
    assert_eq!(report.failed, 3 + 99);
    assert_eq!(backend.insert_calls(), 3);
    assert_eq!(backend.rows(tables::PENDUDUK).len(), report.succeeded);

    let row_errors: Vec<usize> = report.errors.iter().filter_map(|e| e.row).collect();
    assert_eq!(row_errors, vec![5, 152, 251]);
    let batch_errors: Vec<&str> = report
        .errors
        .iter()
        .filter(|e| e.row.is_none())
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(batch_errors.len(), 1);
    assert!(batch_errors[0].starts_with("batch 2"));

    let mut progress = Vec::new();
    let mut completed = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            AppEvent::ImportProgress { batch, total_batches, .. } => progress.push((batch, total_batches)),
            AppEvent::ImportComplete { succeeded, failed } => completed = Some((succeeded, failed)),
            _ => {}
        }
    }
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(completed, Some((148, 102)));
}

#[tokio::test]
async fn test_import_empty_input() {
    let backend = FakeBackend::new();
    let svc = ImportService::new(create_test_event_bus(), 100);

    let report = svc.import_penduduk(&backend, &[]).await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.batches, 0);
    assert_eq!(backend.insert_calls(), 0);
}

#[tokio::test]
async fn test_zero_batch_size_is_clamped() {
    let backend = FakeBackend::new();
    let svc = ImportService::new(create_test_event_bus(), 0);
    assert_eq!(svc.batch_size(), 1);

    let report = svc.import_penduduk(&backend, &residents(3)).await.unwrap();
    assert_eq!(report.batches, 3);
    assert_eq!(report.succeeded, 3);
}

#[tokio::test]
async fn test_import_exported_spreadsheet() {
    let (_db, dir) = create_test_db();
    let path = dir.path().join("penduduk.xlsx");
    let original = residents(5);
    write_xlsx(&penduduk_table(&original), &path).unwrap();

    let backend = FakeBackend::new();
    let svc = ImportService::new(create_test_event_bus(), 2);
    let report = svc.import_file(&backend, &path).await.unwrap();

    assert_eq!(report.succeeded, 5);
    assert_eq!(report.batches, 3);
    let stored = backend.rows(tables::PENDUDUK);
    assert_eq!(stored[0]["nik"], serde_json::json!("3301010101000000"));
    assert_eq!(stored[4]["nama"], serde_json::json!("Warga 4"));
    assert_eq!(stored[0]["dusun"], serde_json::json!("Krajan"));
}

#[tokio::test]
async fn test_import_errors_name_sheet_rows_across_blank_rows() {
    let (_db, dir) = create_test_db();
    let path = dir.path().join("penduduk.xlsx");
    let mut invalid = residents(2);
    invalid[1].nik = "123".into();
    let full = penduduk_table(&invalid);

    // Header on row 1, valid resident on row 2, blank row 3, bad NIK on row 4.
    let table = ExportTable {
        rows: vec![full.rows[0].clone(), Vec::new(), full.rows[1].clone()],
        ..full
    };
    write_xlsx(&table, &path).unwrap();

    let backend = FakeBackend::new();
    let svc = ImportService::new(create_test_event_bus(), 100);
    let report = svc.import_file(&backend, &path).await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    let rows: Vec<usize> = report.errors.iter().filter_map(|e| e.row).collect();
    assert_eq!(rows, vec![4]);
}
