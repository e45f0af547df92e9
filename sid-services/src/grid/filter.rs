//! Free-text search and per-field equality filters.

use std::collections::BTreeMap;

use sid_models::{FieldDescriptor, FormSubmission};

use super::value::{group_key, resolve_cell};

/// Active search text and equality filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridFilter {
    pub search: String,
    /// Field name to required displayed value. `Belum Diisi` selects
    /// records with no value.
    pub equals: BTreeMap<String, String>,
}

impl GridFilter {
    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.equals.is_empty()
    }

    /// Whether `record` passes the search and every equality filter.
    ///
    /// Filters on fields the form does not define are ignored.
    pub fn matches(&self, fields: &[FieldDescriptor], record: &FormSubmission) -> bool {
        for (name, expected) in &self.equals {
            let Some(field) = fields.iter().find(|f| &f.name == name) else {
                continue;
            };
            if !group_key(field, record).eq_ignore_ascii_case(expected.trim()) {
                return false;
            }
        }

        let query = self.search.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        fields.iter().any(|field| {
            let cell = resolve_cell(field, record);
            !cell.is_missing() && cell.display().to_lowercase().contains(&query)
        })
    }
}
