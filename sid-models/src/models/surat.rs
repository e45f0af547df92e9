//! Letter templates (template surat) and the outgoing letter archive (surat keluar).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::form::DateFormat;

/// Number input flavour for `angka` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberSubtype {
    /// Currency; words get a trailing "rupiah".
    Rupiah,
    /// Plain number.
    #[default]
    Biasa,
}

fn default_section() -> String {
    "pemohon".to_string()
}

/// Where a mapped letter field takes its value from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldSource {
    /// An attribute of the resident selected for `section`.
    Penduduk {
        #[serde(default = "default_section")]
        section: String,
        attribute: String,
    },
    /// The full address of the resident selected for `section`.
    Alamat {
        #[serde(default = "default_section")]
        section: String,
    },
    /// A date typed by the operator.
    Tanggal {
        #[serde(default)]
        format: DateFormat,
    },
    /// A number typed by the operator; also exposes `{key}_text`.
    Angka {
        #[serde(default)]
        subtype: NumberSubtype,
    },
    /// A fixed system value (village info, today's date, letter number),
    /// looked up by `name`.
    Sistem { name: String },
    CustomInput,
    CustomTextarea,
}

impl FieldSource {
    /// Section name for resident-backed sources.
    pub fn section(&self) -> Option<&str> {
        match self {
            FieldSource::Penduduk { section, .. } | FieldSource::Alamat { section } => {
                Some(section.as_str())
            }
            _ => None,
        }
    }

    /// Whether the operator types this value.
    pub fn is_operator_input(&self) -> bool {
        matches!(
            self,
            FieldSource::Tanggal { .. }
                | FieldSource::Angka { .. }
                | FieldSource::CustomInput
                | FieldSource::CustomTextarea
        )
    }
}

/// Binds a `{key}` placeholder to its value source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub source: FieldSource,
    #[serde(default)]
    pub required: bool,
}

/// A letter template row (`surat_templates`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSurat {
    pub id: String,
    pub nama: String,
    /// Classification code placed in `[kode]` of the letter number, e.g. "470".
    #[serde(default)]
    pub kode: String,
    /// Letter index placed in `[indeks_no]`, e.g. "Ket" or "SKU".
    #[serde(default)]
    pub indeks: Option<String>,
    /// Body text with `{placeholder}` tokens.
    #[serde(default)]
    pub isi: String,
    /// Stored document template used by the rendering endpoint.
    #[serde(default)]
    pub template_url: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
    /// Letter-number layout; defaults to the standard six-part layout.
    #[serde(default)]
    pub format_nomor: Option<String>,
    #[serde(default)]
    pub aktif: Option<bool>,
}

impl TemplateSurat {
    /// Distinct resident sections used by this template, in first-seen order.
    pub fn sections(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for field in &self.fields {
            if let Some(section) = field.source.section() {
                if !out.iter().any(|s| s == section) {
                    out.push(section.to_string());
                }
            }
        }
        out
    }
}

/// An archived outgoing letter (`surat_keluar`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuratKeluar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub template_id: String,
    pub nomor_surat: String,
    /// Sequence number within the year, when known.
    #[serde(default)]
    pub nomor_urut: Option<i64>,
    pub tanggal_surat: String,
    #[serde(default)]
    pub perihal: Option<String>,
    #[serde(default)]
    pub penduduk_id: Option<String>,
    /// The substituted field map submitted for rendering.
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}
