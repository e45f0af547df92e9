//! A letter being composed: selected residents, typed inputs and the
//! sequence number, resolved into the flat map that fills the template.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde_json::{Map, Value};

use sid_core::error::{SidError, SidResult};
use sid_models::validation::parse_date;
use sid_models::{DateFormat, FieldMapping, FieldSource, InfoDesa, NumberSubtype, Penduduk, TemplateSurat};

use super::letter_number::{self, LetterNumberParts, SequenceInput, DEFAULT_FORMAT};
use super::number_format::{format_thousands, parse_formatted};
use super::placeholder::{substitute, Substitution};
use super::terbilang::{terbilang, terbilang_rupiah};
use crate::grid::format::format_date;

/// Village attributes always available to templates as `{name}`.
const VILLAGE_KEYS: &[&str] = &[
    "nama_desa",
    "kode_desa",
    "kecamatan",
    "kabupaten",
    "provinsi",
    "kode_pos",
    "alamat_kantor",
    "kepala_desa",
    "nip_kepala_desa",
    "sebutan_desa",
    "sebutan_kecamatan",
    "sebutan_kabupaten",
];

#[derive(Debug, Clone)]
pub struct LetterDraft {
    template: TemplateSurat,
    info: InfoDesa,
    residents: BTreeMap<String, Penduduk>,
    inputs: BTreeMap<String, String>,
    sequence: SequenceInput,
    letter_date: NaiveDate,
    assigned_number: Option<String>,
}

impl LetterDraft {
    /// Start a draft. `info` should already carry resolved honorifics.
    pub fn new(template: TemplateSurat, info: InfoDesa, letter_date: NaiveDate) -> Self {
        Self {
            template,
            info,
            residents: BTreeMap::new(),
            inputs: BTreeMap::new(),
            sequence: SequenceInput::new(),
            letter_date,
            assigned_number: None,
        }
    }

    pub fn template(&self) -> &TemplateSurat {
        &self.template
    }

    pub fn info(&self) -> &InfoDesa {
        &self.info
    }

    pub fn letter_date(&self) -> NaiveDate {
        self.letter_date
    }

    pub fn set_letter_date(&mut self, date: NaiveDate) {
        self.letter_date = date;
    }

    pub fn sections(&self) -> Vec<String> {
        self.template.sections()
    }

    /// Pick the resident for `section`. Every `penduduk` and `alamat` field
    /// of that section is filled from it.
    pub fn select_resident(&mut self, section: &str, resident: Penduduk) -> SidResult<()> {
        if !self.sections().iter().any(|s| s == section) {
            return Err(SidError::Validation(format!(
                "bagian '{section}' tidak dipakai oleh template {}",
                self.template.nama
            )));
        }
        self.residents.insert(section.to_string(), resident);
        Ok(())
    }

    pub fn clear_resident(&mut self, section: &str) -> Option<Penduduk> {
        self.residents.remove(section)
    }

    pub fn resident(&self, section: &str) -> Option<&Penduduk> {
        self.residents.get(section)
    }

    /// The resident of the first section, recorded on the archive row.
    pub fn primary_resident(&self) -> Option<&Penduduk> {
        self.sections().first().and_then(|s| self.residents.get(s))
    }

    /// Set an operator-typed value and return it as it should now be shown.
    /// Numbers are re-grouped on every keystroke.
    pub fn set_input(&mut self, key: &str, raw: &str) -> SidResult<String> {
        let field = self
            .template
            .fields
            .iter()
            .find(|f| f.key == key)
            .ok_or_else(|| SidError::Validation(format!("isian '{key}' tidak ada di template")))?;

        let shown = match &field.source {
            FieldSource::Angka { .. } => format_thousands(raw),
            FieldSource::Tanggal { .. } => {
                let trimmed = raw.trim();
                if !trimmed.is_empty() && parse_date(trimmed).is_none() {
                    return Err(SidError::Validation(format!(
                        "tanggal '{trimmed}' tidak dikenali untuk {}",
                        field.label
                    )));
                }
                trimmed.to_string()
            }
            FieldSource::CustomInput | FieldSource::CustomTextarea => raw.to_string(),
            _ => {
                return Err(SidError::Validation(format!(
                    "{} diisi otomatis dan tidak dapat diketik",
                    field.label
                )))
            }
        };
        self.inputs.insert(key.to_string(), shown.clone());
        Ok(shown)
    }

    pub fn input(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).map(String::as_str)
    }

    pub fn sequence(&self) -> &SequenceInput {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut SequenceInput {
        &mut self.sequence
    }

    /// Fix the letter number to one produced by the backend.
    pub fn assign_number(&mut self, nomor_surat: String) {
        self.assigned_number = Some(nomor_surat);
    }

    /// Fix the letter number to backend sequence `no`, rendered with the
    /// template layout. The typed-input digit cap does not apply.
    pub fn assign_sequence(&mut self, no: u64) {
        let nomor = letter_number::render(self.number_format(), &self.number_parts(no));
        self.assigned_number = Some(nomor);
    }

    /// Letter-number parts for sequence `no`.
    pub fn number_parts(&self, no: u64) -> LetterNumberParts {
        LetterNumberParts {
            indeks_no: self.template.indeks.clone().unwrap_or_default(),
            no,
            kode: self.template.kode.clone(),
            kode_desa: self.info.kode_desa.clone().unwrap_or_default(),
            month: self.letter_date.month(),
            year: self.letter_date.year(),
        }
    }

    pub fn number_format(&self) -> &str {
        self.template
            .format_nomor
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(DEFAULT_FORMAT)
    }

    /// The letter number: the assigned one, else the typed sequence rendered
    /// with the template layout.
    pub fn nomor_surat(&self) -> Option<String> {
        if let Some(assigned) = &self.assigned_number {
            return Some(assigned.clone());
        }
        let no = self.sequence.value()?;
        Some(letter_number::render(self.number_format(), &self.number_parts(no)))
    }

    /// Every placeholder value: village attributes, letter number and date,
    /// then the template's own field mappings.
    pub fn values(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for key in VILLAGE_KEYS {
            out.insert((*key).to_string(), text(self.info.attribute(key)));
        }
        out.insert("nomor_surat".into(), text(self.nomor_surat()));
        out.insert(
            "tanggal_surat".into(),
            Value::String(format_date(self.letter_date, DateFormat::Long)),
        );
        out.insert("tahun".into(), Value::String(self.letter_date.year().to_string()));

        for field in &self.template.fields {
            self.resolve_field(field, &mut out);
        }
        out
    }

    fn resolve_field(&self, field: &FieldMapping, out: &mut Map<String, Value>) {
        let key = field.key.clone();
        match &field.source {
            FieldSource::Penduduk { section, attribute } => {
                let value = self
                    .residents
                    .get(section)
                    .and_then(|p| resident_attribute(p, attribute));
                out.insert(key, text(value));
            }
            FieldSource::Alamat { section } => {
                let value = self.residents.get(section).map(Penduduk::alamat_lengkap);
                out.insert(key, text(value.filter(|a| !a.is_empty())));
            }
            FieldSource::Tanggal { format } => {
                let value = self
                    .inputs
                    .get(&field.key)
                    .and_then(|raw| parse_date(raw))
                    .map(|d| format_date(d, *format));
                out.insert(key, text(value));
            }
            FieldSource::Angka { subtype } => {
                let shown = self.inputs.get(&field.key).cloned().unwrap_or_default();
                let words = match (parse_formatted(&shown), subtype) {
                    (Some(n), NumberSubtype::Rupiah) => terbilang_rupiah(n),
                    (Some(n), NumberSubtype::Biasa) => terbilang(n),
                    (None, _) => String::new(),
                };
                out.insert(format!("{key}_text"), Value::String(words));
                out.insert(key, Value::String(shown));
            }
            FieldSource::Sistem { name } => {
                let value = match name.as_str() {
                    "nomor_surat" => self.nomor_surat(),
                    "tanggal_surat" | "tanggal" => Some(format_date(self.letter_date, DateFormat::Long)),
                    "tahun" => Some(self.letter_date.year().to_string()),
                    other => self.info.attribute(other),
                };
                out.insert(key, text(value));
            }
            FieldSource::CustomInput | FieldSource::CustomTextarea => {
                out.insert(key, text(self.inputs.get(&field.key).cloned()));
            }
        }
    }

    /// Labels of required fields that still resolve to nothing.
    pub fn missing_required(&self) -> Vec<String> {
        let values = self.values();
        self.template
            .fields
            .iter()
            .filter(|f| f.required)
            .filter(|f| {
                values
                    .get(&f.key)
                    .and_then(Value::as_str)
                    .map_or(true, |s| s.trim().is_empty())
            })
            .map(|f| f.label.clone())
            .collect()
    }

    /// Fail with the list of missing required fields, if any.
    pub fn ensure_complete(&self) -> SidResult<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SidError::Validation(format!("belum diisi: {}", missing.join(", "))))
        }
    }

    /// The body with every known placeholder substituted.
    pub fn preview(&self) -> Substitution {
        substitute(&self.template.isi, &self.values())
    }
}

fn text(value: Option<String>) -> Value {
    Value::String(value.unwrap_or_default())
}

/// Resident attributes with letter-friendly transforms.
fn resident_attribute(p: &Penduduk, attribute: &str) -> Option<String> {
    let raw = p.attribute(attribute)?;
    let shown = match attribute {
        "tanggal_lahir" => parse_date(&raw)
            .map(|d| format_date(d, DateFormat::Long))
            .unwrap_or(raw),
        "tempat_tanggal_lahir" => match (p.tempat_lahir.as_deref(), p.tanggal_lahir.as_deref().and_then(parse_date)) {
            (Some(tempat), Some(tgl)) if !tempat.is_empty() => {
                format!("{tempat}, {}", format_date(tgl, DateFormat::Long))
            }
            _ => raw,
        },
        "jenis_kelamin" => match raw.as_str() {
            "L" => "Laki-laki".to_string(),
            "P" => "Perempuan".to_string(),
            _ => raw,
        },
        _ => raw,
    };
    Some(shown)
}
