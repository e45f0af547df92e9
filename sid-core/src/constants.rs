//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "SIDesa";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// REST (table) API prefix on the hosted backend.
pub const REST_PREFIX: &str = "/rest/v1";

/// Auth API prefix on the hosted backend.
pub const AUTH_PREFIX: &str = "/auth/v1";

/// Object storage API prefix on the hosted backend.
pub const STORAGE_PREFIX: &str = "/storage/v1";

/// Default backend API timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Rows per sequential import batch.
pub const DEFAULT_IMPORT_BATCH_SIZE: usize = 100;

/// Page sizes offered by data grids.
pub const PAGE_SIZES: [usize; 4] = [10, 20, 50, 100];

/// Bucket label for records with no value at a grouping level.
pub const UNFILLED_BUCKET: &str = "Belum Diisi";

/// Displayed when a field has no value for a record.
pub const NOT_AVAILABLE: &str = "Tidak tersedia";

/// Displayed when a coordinate value cannot be parsed.
pub const INVALID_COORDINATE: &str = "Koordinat tidak valid";

/// Local cache schema version.
pub const DB_SCHEMA_VERSION: i32 = 2;

/// Remote table names.
pub mod tables {
    pub const PENDUDUK: &str = "penduduk";
    pub const INFO_DESA: &str = "info_desa";
    pub const FORM_TUGAS: &str = "form_tugas";
    pub const FORM_TUGAS_DATA: &str = "form_tugas_data";
    pub const SURAT_TEMPLATES: &str = "surat_templates";
    pub const SURAT_KELUAR: &str = "surat_keluar";
    pub const PROFILES: &str = "profiles";
    pub const BERITA: &str = "berita";
    pub const GALERI: &str = "galeri";
    pub const PENGUMUMAN: &str = "pengumuman";
    pub const AGENDA: &str = "agenda";
}

/// Remote procedure names.
pub mod rpc {
    pub const CAPABILITIES: &str = "api_capabilities";
    pub const POPULATION_STATS: &str = "get_population_stats";
    pub const FORM_DATA_WITH_PENDUDUK: &str = "get_form_data_with_penduduk";
    pub const UPDATE_FORM_DATA: &str = "update_form_data_checked";
    pub const DELETE_FORM_DATA: &str = "delete_form_data_checked";
    pub const GENERATE_LETTER_NUMBER: &str = "generate_nomor_surat";
    pub const SET_USER_ROLE: &str = "set_user_role";
}

/// Honorific fallbacks used when the village record leaves them unset.
pub mod honorifics {
    pub const DESA: &str = "Desa";
    pub const KECAMATAN: &str = "Kecamatan";
    pub const KABUPATEN: &str = "Kabupaten";
}
