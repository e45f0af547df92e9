//! Village information (info desa) model.

use serde::{Deserialize, Serialize};
use sid_core::config::VillageConfig;
use sid_core::constants::honorifics;

/// Village profile row from the backend `info_desa` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfoDesa {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub nama_desa: String,
    /// Administrative code used in letter numbers.
    #[serde(default)]
    pub kode_desa: Option<String>,
    #[serde(default)]
    pub kecamatan: Option<String>,
    #[serde(default)]
    pub kabupaten: Option<String>,
    #[serde(default)]
    pub provinsi: Option<String>,
    #[serde(default)]
    pub kode_pos: Option<String>,
    #[serde(default)]
    pub alamat_kantor: Option<String>,
    #[serde(default)]
    pub kepala_desa: Option<String>,
    #[serde(default)]
    pub nip_kepala_desa: Option<String>,
    #[serde(default)]
    pub sebutan_desa: Option<String>,
    #[serde(default)]
    pub sebutan_kecamatan: Option<String>,
    #[serde(default)]
    pub sebutan_kabupaten: Option<String>,
    #[serde(default)]
    pub visi: Option<String>,
    #[serde(default)]
    pub misi: Option<String>,
    #[serde(default)]
    pub sejarah: Option<String>,
}

impl InfoDesa {
    /// Resolve the honorific fields once, at merge time.
    ///
    /// Precedence: local config override, then the backend value, then the
    /// fixed literal. Blank strings count as unset.
    pub fn with_resolved_honorifics(mut self, overrides: &VillageConfig) -> Self {
        self.sebutan_desa = Some(resolve(
            overrides.sebutan_desa.as_deref(),
            self.sebutan_desa.as_deref(),
            honorifics::DESA,
        ));
        self.sebutan_kecamatan = Some(resolve(
            overrides.sebutan_kecamatan.as_deref(),
            self.sebutan_kecamatan.as_deref(),
            honorifics::KECAMATAN,
        ));
        self.sebutan_kabupaten = Some(resolve(
            overrides.sebutan_kabupaten.as_deref(),
            self.sebutan_kabupaten.as_deref(),
            honorifics::KABUPATEN,
        ));
        self
    }

    /// Read a field by name, for `sistem` letter fields.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let value = match name {
            "nama_desa" => Some(self.nama_desa.clone()),
            "kode_desa" => self.kode_desa.clone(),
            "kecamatan" => self.kecamatan.clone(),
            "kabupaten" => self.kabupaten.clone(),
            "provinsi" => self.provinsi.clone(),
            "kode_pos" => self.kode_pos.clone(),
            "alamat_kantor" => self.alamat_kantor.clone(),
            "kepala_desa" => self.kepala_desa.clone(),
            "nip_kepala_desa" => self.nip_kepala_desa.clone(),
            "sebutan_desa" => self.sebutan_desa.clone(),
            "sebutan_kecamatan" => self.sebutan_kecamatan.clone(),
            "sebutan_kabupaten" => self.sebutan_kabupaten.clone(),
            _ => None,
        };
        value.filter(|v| !v.trim().is_empty())
    }
}

fn resolve(override_value: Option<&str>, stored: Option<&str>, fallback: &str) -> String {
    override_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| stored.filter(|v| !v.trim().is_empty()))
        .unwrap_or(fallback)
        .to_string()
}
