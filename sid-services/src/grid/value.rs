//! Field value resolution for one record.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde_json::Value;

use sid_core::constants::{INVALID_COORDINATE, NOT_AVAILABLE, UNFILLED_BUCKET};
use sid_models::validation::{parse_amount, parse_date};
use sid_models::{Coordinate, FieldDescriptor, FieldKind, FormSubmission};

use super::format::{apply_case, format_date};
use crate::letter::number_format::format_rupiah;

/// A resolved, display-ready cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Value(String),
    NotAvailable,
    InvalidCoordinate,
}

impl Cell {
    pub fn display(&self) -> &str {
        match self {
            Cell::Value(s) => s,
            Cell::NotAvailable => NOT_AVAILABLE,
            Cell::InvalidCoordinate => INVALID_COORDINATE,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::NotAvailable)
    }
}

/// The raw value of `field` for `record`.
///
/// An explicit value in the record's data wins. Otherwise a system-derived
/// field reads the linked resident.
pub fn resolve_raw(field: &FieldDescriptor, record: &FormSubmission) -> Option<Value> {
    if let Some(v) = record.override_value(&field.name) {
        return Some(v.clone());
    }
    match &field.kind {
        FieldKind::SystemDerived { column } => record
            .penduduk
            .as_ref()
            .and_then(|p| p.attribute(column))
            .map(Value::String),
        _ => None,
    }
}

/// Plain text of a raw JSON value.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "Ya".to_string(),
        Value::Bool(false) => "Tidak".to_string(),
        Value::Array(items) => items.iter().map(text_of).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
        Value::Object(_) => value.to_string(),
    }
}

fn amount_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Resolve and format the cell for `field`.
pub fn resolve_cell(field: &FieldDescriptor, record: &FormSubmission) -> Cell {
    let Some(raw) = resolve_raw(field, record) else {
        return Cell::NotAvailable;
    };

    match &field.kind {
        FieldKind::Text { case } => {
            let text = text_of(&raw);
            Cell::Value(match case {
                Some(case) => apply_case(&text, *case),
                None => text,
            })
        }
        FieldKind::Date { format } => {
            let text = text_of(&raw);
            Cell::Value(match parse_date(&text) {
                Some(date) => format_date(date, *format),
                None => text,
            })
        }
        FieldKind::Coordinate => match Coordinate::parse(&raw) {
            Some(coord) => Cell::Value(coord.to_string()),
            None => Cell::InvalidCoordinate,
        },
        FieldKind::Currency => match amount_of(&raw) {
            Some(amount) => Cell::Value(format_rupiah(amount)),
            None => Cell::Value(text_of(&raw)),
        },
        FieldKind::Dropdown { .. } | FieldKind::Image | FieldKind::SystemDerived { .. } => {
            Cell::Value(text_of(&raw))
        }
    }
}

/// Grouping key for `field`: the displayed value, or the unfilled bucket.
pub fn group_key(field: &FieldDescriptor, record: &FormSubmission) -> String {
    match resolve_cell(field, record) {
        Cell::Value(s) if !s.trim().is_empty() => s,
        Cell::Value(_) | Cell::NotAvailable => UNFILLED_BUCKET.to_string(),
        Cell::InvalidCoordinate => INVALID_COORDINATE.to_string(),
    }
}

/// Comparable form of a field value.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum SortKey {
    Date(NaiveDate),
    Number(f64),
    Text(String),
    Missing,
}

impl SortKey {
    /// Total order. Variants order as declared, so `Missing` sorts after
    /// every present value.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

/// Sort key for `field` on `record`, typed by the field kind.
pub fn sort_key(field: &FieldDescriptor, record: &FormSubmission) -> SortKey {
    let Some(raw) = resolve_raw(field, record) else {
        return SortKey::Missing;
    };
    let text = text_of(&raw);
    match &field.kind {
        FieldKind::Date { .. } => parse_date(&text)
            .map(SortKey::Date)
            .unwrap_or_else(|| SortKey::Text(text.to_lowercase())),
        FieldKind::Currency => amount_of(&raw)
            .map(|n| SortKey::Number(n as f64))
            .unwrap_or_else(|| SortKey::Text(text.to_lowercase())),
        _ => match &raw {
            Value::Number(n) => n.as_f64().map(SortKey::Number).unwrap_or(SortKey::Missing),
            _ => SortKey::Text(text.to_lowercase()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sid_models::{DateFormat, Penduduk, TextCase};

    fn field(name: &str, kind: FieldKind) -> FieldDescriptor {
        FieldDescriptor { name: name.into(), label: name.into(), kind, required: false }
    }

    fn record() -> FormSubmission {
        let mut rec = FormSubmission {
            id: "s1".into(),
            penduduk: Some(Penduduk {
                nik: "3301010101010001".into(),
                no_kk: "3301010101010000".into(),
                nama: "Budi Santoso".into(),
                dusun: Some("Krajan".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        rec.data.insert("tgl".into(), json!("2024-08-17"));
        rec.data.insert("lokasi".into(), json!({"lat": -7.5, "lng": 110.25}));
        rec.data.insert("rusak".into(), json!("di sini"));
        rec.data.insert("biaya".into(), json!(1500000));
        rec.data.insert("ket".into(), json!("rumah tidak layak huni"));
        rec
    }

    #[test]
    fn test_override_beats_resident() {
        let nama = field("nama", FieldKind::SystemDerived { column: "nama".into() });
        let mut rec = record();
        assert_eq!(resolve_cell(&nama, &rec), Cell::Value("Budi Santoso".into()));
        rec.data.insert("nama".into(), json!("Budi S."));
        assert_eq!(resolve_cell(&nama, &rec), Cell::Value("Budi S.".into()));
    }

    #[test]
    fn test_missing_value() {
        let kosong = field("pekerjaan", FieldKind::SystemDerived { column: "pekerjaan".into() });
        let cell = resolve_cell(&kosong, &record());
        assert!(cell.is_missing());
        assert_eq!(cell.display(), NOT_AVAILABLE);
        assert_eq!(group_key(&kosong, &record()), UNFILLED_BUCKET);
    }

    #[test]
    fn test_kind_formatting() {
        let rec = record();
        let tgl = field("tgl", FieldKind::Date { format: DateFormat::Long });
        assert_eq!(resolve_cell(&tgl, &rec).display(), "17 Agustus 2024");

        let lokasi = field("lokasi", FieldKind::Coordinate);
        assert_eq!(resolve_cell(&lokasi, &rec).display(), "-7.5, 110.25");

        let rusak = field("rusak", FieldKind::Coordinate);
        assert_eq!(resolve_cell(&rusak, &rec), Cell::InvalidCoordinate);

        let biaya = field("biaya", FieldKind::Currency);
        assert_eq!(resolve_cell(&biaya, &rec).display(), "Rp 1.500.000");

        let ket = field("ket", FieldKind::Text { case: Some(TextCase::Capitalize) });
        assert_eq!(resolve_cell(&ket, &rec).display(), "Rumah Tidak Layak Huni");
    }

    #[test]
    fn test_sort_keys() {
        let rec = record();
        let tgl = field("tgl", FieldKind::Date { format: DateFormat::Long });
        assert_eq!(
            sort_key(&tgl, &rec),
            SortKey::Date(NaiveDate::from_ymd_opt(2024, 8, 17).unwrap())
        );
        let none = field("none", FieldKind::Text { case: None });
        assert_eq!(sort_key(&none, &rec), SortKey::Missing);
        assert_eq!(
            SortKey::Text("a".into()).compare(&SortKey::Missing),
            Ordering::Less
        );
    }
}
