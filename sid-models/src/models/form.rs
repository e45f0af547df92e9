//! Custom data-collection forms (form tugas) and their submissions.
//!
//! A form's schema is defined at runtime by administrators: an ordered list
//! of field descriptors whose kind decides how values are validated and
//! displayed. Submissions either reference a resident or carry free-form data,
//! or both.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sid_core::error::{SidError, SidResult};

use crate::models::penduduk::Penduduk;
use crate::validation;

/// Case transform applied to text fields on display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCase {
    Upper,
    Lower,
    /// Capitalize each word.
    Capitalize,
}

/// Date display template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    /// `17 Agustus 2024`.
    #[default]
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "dd-mm-yyyy")]
    DashDmy,
    #[serde(rename = "dd/mm/yyyy")]
    SlashDmy,
}

/// The kind of a form field, with its per-kind display options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text {
        #[serde(default)]
        case: Option<TextCase>,
    },
    Date {
        #[serde(default)]
        format: DateFormat,
    },
    Dropdown {
        #[serde(default)]
        options: Vec<String>,
    },
    Coordinate,
    Image,
    Currency,
    /// Read from the linked resident record unless the submission overrides it.
    #[serde(rename = "predefined", alias = "system_derived")]
    SystemDerived { column: String },
}

/// One column of a runtime-defined form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

impl FieldDescriptor {
    /// Validate a raw input value against this field's kind.
    ///
    /// Empty input passes unless the field is required.
    pub fn validate(&self, raw: &str) -> SidResult<()> {
        let value = raw.trim();
        if value.is_empty() {
            if self.required {
                return Err(SidError::Validation(format!("{} wajib diisi", self.label)));
            }
            return Ok(());
        }

        let ok = match &self.kind {
            FieldKind::Text { .. } | FieldKind::Image | FieldKind::SystemDerived { .. } => true,
            FieldKind::Date { .. } => validation::parse_date(value).is_some(),
            FieldKind::Dropdown { options } => {
                options.is_empty() || options.iter().any(|o| o == value)
            }
            FieldKind::Coordinate => Coordinate::parse_str(value).is_some(),
            FieldKind::Currency => validation::parse_amount(value).is_some(),
        };

        if ok {
            Ok(())
        } else {
            Err(SidError::Validation(format!(
                "nilai '{value}' tidak valid untuk {}",
                self.label
            )))
        }
    }
}

/// A form definition row (`form_tugas`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinition {
    pub id: String,
    pub judul: String,
    #[serde(default)]
    pub deskripsi: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Default grouping hierarchy (field names, outermost first).
    #[serde(default)]
    pub group_hierarchy: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl FormDefinition {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of image-valued fields.
    pub fn image_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| matches!(f.kind, FieldKind::Image))
    }
}

/// A submitted row (`form_tugas_data`), optionally joined with its resident.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSubmission {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub form_id: String,
    #[serde(default)]
    pub penduduk_id: Option<String>,
    /// Joined resident row when fetched through the join procedure.
    #[serde(default, skip_serializing)]
    pub penduduk: Option<Penduduk>,
    /// Free-form values and overrides, keyed by field name.
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl FormSubmission {
    /// The override value for a field, if the submission carries a non-empty one.
    pub fn override_value(&self, field: &str) -> Option<&Value> {
        self.data.get(field).filter(|v| match v {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    }
}

/// A geographic coordinate normalized for display as `"lat, lng"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Parse either a `"lat, lng"` string or a serialized `{lat, lng}` object.
    pub fn parse(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse_str(s),
            Value::Object(map) => Self::from_object(map),
            _ => None,
        }
    }

    /// Parse a string form, which may itself be JSON.
    pub fn parse_str(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.starts_with('{') {
            let map: Map<String, Value> = serde_json::from_str(trimmed).ok()?;
            return Self::from_object(&map);
        }

        let (lat, lng) = trimmed.split_once(',')?;
        Self::checked(lat.trim().parse().ok()?, lng.trim().parse().ok()?)
    }

    fn from_object(map: &Map<String, Value>) -> Option<Self> {
        let read = |keys: &[&str]| {
            keys.iter().find_map(|k| match map.get(*k)? {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
        };
        Self::checked(read(&["lat", "latitude"])?, read(&["lng", "lon", "longitude"])?)
    }

    fn checked(lat: f64, lng: f64) -> Option<Self> {
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
            Some(Self { lat, lng })
        } else {
            None
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.lat, self.lng)
    }
}
