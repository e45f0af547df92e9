//! Letter generation against the in-memory backend: numbering, archiving,
//! rendering and download.

mod common;

use chrono::NaiveDate;
use serde_json::json;
use tempfile::TempDir;

use common::*;
use sid_core::config::VillageConfig;
use sid_core::constants::{rpc, tables};
use sid_core::error::SidError;
use sid_models::TemplateSurat;
use sid_services::event_bus::AppEvent;
use sid_services::letter::search_roster;
use sid_services::{LetterDraft, LetterService, Numbering};

fn template_json() -> serde_json::Value {
    json!({
        "id": "tpl-sku",
        "nama": "Surat Keterangan Usaha",
        "kode": "503",
        "indeks": "SKU",
        "isi": "{sebutan_desa} {nama_desa} menerangkan {nama} berpenghasilan {penghasilan}.",
        "template_url": "https://files.desa.test/templates/sku.docx",
        "aktif": true,
        "fields": [
            {"key": "nama", "label": "Nama", "type": "penduduk", "attribute": "nama", "required": true},
            {"key": "nik", "label": "NIK", "type": "penduduk", "attribute": "nik"},
            {"key": "alamat", "label": "Alamat", "type": "alamat"},
            {"key": "penghasilan", "label": "Penghasilan", "type": "angka", "subtype": "rupiah", "required": true},
            {"key": "keperluan", "label": "Keperluan", "type": "custom_textarea"}
        ]
    })
}

fn seeded_backend(procedures: &[&str]) -> FakeBackend {
    let backend = FakeBackend::new().with_capabilities(procedures);
    backend.seed(
        tables::SURAT_TEMPLATES,
        vec![
            template_json(),
            json!({"id": "tpl-old", "nama": "Arsip Lama", "aktif": false}),
            json!({"id": "tpl-dom", "nama": "Domisili", "kode": "470"}),
        ],
    );
    backend.seed(
        tables::INFO_DESA,
        vec![json!({"nama_desa": "Sukamaju", "kode_desa": "2005", "kepala_desa": "H. Darmo"})],
    );
    backend.seed(
        tables::PENDUDUK,
        vec![
            penduduk_json("3301010101010001", "Budi Santoso", "Krajan"),
            penduduk_json("3301010101010002", "Siti Aminah", "Krajan"),
        ],
    );
    backend
}

fn letter_service(procedures: &[&str]) -> (LetterService, TempDir) {
    let (db, dir) = create_test_db();
    let svc = LetterService::new(
        db,
        capabilities(procedures),
        create_test_event_bus(),
        VillageConfig::default(),
    );
    (svc, dir)
}

async fn ready_draft(svc: &LetterService, backend: &FakeBackend) -> LetterDraft {
    let template: TemplateSurat = svc.get_template(backend, "tpl-sku").await.unwrap();
    let info = svc.load_info_desa(backend).await.unwrap();
    let mut draft = LetterDraft::new(template, info, NaiveDate::from_ymd_opt(2024, 8, 17).unwrap());

    let roster = svc.load_roster(backend).await.unwrap();
    let budi = search_roster(&roster, "budi", 10)[0].clone();
    draft.select_resident("pemohon", budi).unwrap();
    assert_eq!(draft.set_input("penghasilan", "2500000").unwrap(), "2.500.000");
    draft
}

#[tokio::test]
async fn test_list_templates_skips_inactive() {
    let backend = seeded_backend(&[]);
    let (svc, _dir) = letter_service(&[]);

    let names: Vec<String> = svc
        .list_templates(&backend)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.nama)
        .collect();
    assert_eq!(names, vec!["Domisili".to_string(), "Surat Keterangan Usaha".to_string()]);

    assert!(matches!(
        svc.get_template(&backend, "tpl-nope").await,
        Err(SidError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_village_info_defaults_when_missing() {
    let backend = FakeBackend::new();
    let (svc, _dir) = letter_service(&[]);

    let info = svc.load_info_desa(&backend).await.unwrap();
    assert_eq!(info.sebutan_desa.as_deref(), Some("Desa"));
    assert_eq!(info.sebutan_kabupaten.as_deref(), Some("Kabupaten"));

    let seeded = seeded_backend(&[]);
    let info = svc.load_info_desa(&seeded).await.unwrap();
    assert_eq!(info.nama_desa, "Sukamaju");
    assert_eq!(info.sebutan_kecamatan.as_deref(), Some("Kecamatan"));
}

#[tokio::test]
async fn test_finalize_with_manual_sequence() {
    let backend = seeded_backend(&[]);
    let (db, _dir) = create_test_db();
    let bus = create_test_event_bus();
    let mut rx = bus.subscribe();
    let svc = LetterService::new(db, capabilities(&[]), bus, VillageConfig::default());

    let mut draft = ready_draft(&svc, &backend).await;
    let missing_seq = svc.finalize(&backend, &mut draft, Numbering::Manual).await;
    assert!(matches!(missing_seq, Err(SidError::Validation(_))));

    draft.sequence_mut().set("7").unwrap();
    let letter = svc.finalize(&backend, &mut draft, Numbering::Manual).await.unwrap();

    assert_eq!(letter.archive.nomor_surat, "SKU/007/503/2005/VIII/2024");
    assert_eq!(letter.archive.nomor_urut, Some(7));
    assert_eq!(letter.archive.tanggal_surat, "2024-08-17");
    assert_eq!(letter.archive.penduduk_id.as_deref(), Some("p-3301010101010001"));
    assert!(letter.archive.id.is_some());
    assert_eq!(letter.values["penghasilan_text"], json!("dua juta lima ratus ribu rupiah"));
    assert_eq!(letter.values["nomor_surat"], json!("SKU/007/503/2005/VIII/2024"));

    let archived = backend.rows(tables::SURAT_KELUAR);
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0]["data"]["nama"], json!("Budi Santoso"));

    match rx.try_recv().unwrap() {
        AppEvent::LetterGenerated { nomor_surat, template_id } => {
            assert_eq!(nomor_surat, "SKU/007/503/2005/VIII/2024");
            assert_eq!(template_id, "tpl-sku");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_incomplete_draft_is_not_archived() {
    let backend = seeded_backend(&[]);
    let (svc, _dir) = letter_service(&[]);
    let template = svc.get_template(&backend, "tpl-sku").await.unwrap();
    let mut draft = svc.start_draft(&backend, template).await.unwrap();
    draft.sequence_mut().set("1").unwrap();

    let err = svc.finalize(&backend, &mut draft, Numbering::Manual).await.unwrap_err();
    match err {
        SidError::Validation(msg) => {
            assert!(msg.contains("Nama"));
            assert!(msg.contains("Penghasilan"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(backend.rows(tables::SURAT_KELUAR).is_empty());
}

#[tokio::test]
async fn test_remote_numbering_requires_capability() {
    let backend = seeded_backend(&[]);
    let (svc, _dir) = letter_service(&[]);
    let mut draft = ready_draft(&svc, &backend).await;

    let err = svc.finalize(&backend, &mut draft, Numbering::Remote).await.unwrap_err();
    assert!(matches!(err, SidError::Unsupported(name) if name == rpc::GENERATE_LETTER_NUMBER));
    assert!(backend.rpc_call_names().is_empty());
    assert!(backend.rows(tables::SURAT_KELUAR).is_empty());
}

#[tokio::test]
async fn test_remote_numbering_result_shapes() {
    let caps = [rpc::GENERATE_LETTER_NUMBER];

    // a complete number string
    let backend = seeded_backend(&caps);
    backend.rpc_returns(rpc::GENERATE_LETTER_NUMBER, json!("SKU/042/503/2005/VIII/2024"));
    let (svc, _dir) = letter_service(&caps);
    let mut draft = ready_draft(&svc, &backend).await;
    let letter = svc.finalize(&backend, &mut draft, Numbering::Remote).await.unwrap();
    assert_eq!(letter.archive.nomor_surat, "SKU/042/503/2005/VIII/2024");
    assert_eq!(letter.archive.nomor_urut, None);
    let calls = backend.rpc_calls.lock().unwrap().clone();
    assert_eq!(calls[0].1["p_template_id"], json!("tpl-sku"));
    assert_eq!(calls[0].1["p_tanggal"], json!("2024-08-17"));

    // a bare sequence number rendered with the template layout
    let backend = seeded_backend(&caps);
    backend.rpc_returns(rpc::GENERATE_LETTER_NUMBER, json!(12));
    let mut draft = ready_draft(&svc, &backend).await;
    let letter = svc.finalize(&backend, &mut draft, Numbering::Remote).await.unwrap();
    assert_eq!(letter.archive.nomor_surat, "SKU/012/503/2005/VIII/2024");
    assert_eq!(letter.archive.nomor_urut, Some(12));

    // an object carrying both
    let backend = seeded_backend(&caps);
    backend.rpc_returns(
        rpc::GENERATE_LETTER_NUMBER,
        json!({"nomor_surat": "SKU/100/503/2005/VIII/2024", "nomor_urut": 100}),
    );
    let mut draft = ready_draft(&svc, &backend).await;
    let letter = svc.finalize(&backend, &mut draft, Numbering::Remote).await.unwrap();
    assert_eq!(letter.archive.nomor_surat, "SKU/100/503/2005/VIII/2024");
    assert_eq!(letter.archive.nomor_urut, Some(100));
}

#[tokio::test]
async fn test_remote_sequence_wider_than_typed_input() {
    let caps = [rpc::GENERATE_LETTER_NUMBER];
    let backend = seeded_backend(&caps);
    backend.rpc_returns(rpc::GENERATE_LETTER_NUMBER, json!(1_234_567));
    let (svc, _dir) = letter_service(&caps);
    let mut draft = ready_draft(&svc, &backend).await;

    let letter = svc.finalize(&backend, &mut draft, Numbering::Remote).await.unwrap();
    assert_eq!(letter.archive.nomor_surat, "SKU/1234567/503/2005/VIII/2024");
    assert_eq!(letter.archive.nomor_urut, Some(1_234_567));
    assert_eq!(backend.rows(tables::SURAT_KELUAR).len(), 1);
}

#[tokio::test]
async fn test_render_and_download() {
    let backend = seeded_backend(&[]);
    let (svc, dir) = letter_service(&[]);
    let template = svc.get_template(&backend, "tpl-sku").await.unwrap();
    let mut draft = ready_draft(&svc, &backend).await;
    draft.sequence_mut().set("3").unwrap();
    draft.set_input("keperluan", "Pengajuan KUR").unwrap();

    let mut letter = svc.finalize(&backend, &mut draft, Numbering::Manual).await.unwrap();
    let url = svc.render(&backend, &template, &mut letter).await.unwrap();
    assert_eq!(url, RENDERED_URL);
    assert_eq!(letter.archive.file_url.as_deref(), Some(RENDERED_URL));

    let requests = backend.rendered.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].template_url, "https://files.desa.test/templates/sku.docx");
    assert_eq!(requests[0].data, letter.values);
    assert_eq!(requests[0].data["keperluan"], json!("Pengajuan KUR"));

    let archived = backend.rows(tables::SURAT_KELUAR);
    assert_eq!(archived[0]["file_url"], json!(RENDERED_URL));

    let saved = svc
        .download_to(&backend, &url, &dir.path().join("surat"), &letter.archive.nomor_surat)
        .await
        .unwrap();
    assert_eq!(saved.extension().and_then(|e| e.to_str()), Some("docx"));
    assert!(!saved.file_name().unwrap().to_string_lossy().contains('/'));
    assert_eq!(std::fs::read(&saved).unwrap(), b"PK-fake-docx");
}

#[tokio::test]
async fn test_render_requires_document_template() {
    let backend = seeded_backend(&[]);
    let (svc, _dir) = letter_service(&[]);
    let mut template = svc.get_template(&backend, "tpl-sku").await.unwrap();
    let mut draft = ready_draft(&svc, &backend).await;
    draft.sequence_mut().set("4").unwrap();
    let mut letter = svc.finalize(&backend, &mut draft, Numbering::Manual).await.unwrap();

    template.template_url = None;
    let err = svc.render(&backend, &template, &mut letter).await.unwrap_err();
    assert!(matches!(err, SidError::Validation(_)));
    assert!(backend.rendered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_archive_newest_first() {
    let backend = seeded_backend(&[]);
    let (svc, _dir) = letter_service(&[]);
    for seq in ["1", "2", "3"] {
        let mut draft = ready_draft(&svc, &backend).await;
        draft.sequence_mut().set(seq).unwrap();
        svc.finalize(&backend, &mut draft, Numbering::Manual).await.unwrap();
    }

    let archive = svc.list_archive(&backend, 2).await.unwrap();
    let numbers: Vec<Option<i64>> = archive.iter().map(|s| s.nomor_urut).collect();
    assert_eq!(numbers, vec![Some(3), Some(2)]);
}
