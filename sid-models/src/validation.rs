//! Input validation and normalization shared by imports, forms, and letters.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::penduduk::Penduduk;

lazy_static! {
    static ref SIXTEEN_DIGITS: Regex = Regex::new(r"^\d{16}$").expect("static regex");
}

/// A single problem found in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// NIK is exactly 16 digits.
pub fn is_valid_nik(nik: &str) -> bool {
    SIXTEEN_DIGITS.is_match(nik.trim())
}

/// No. KK is exactly 16 digits.
pub fn is_valid_no_kk(no_kk: &str) -> bool {
    SIXTEEN_DIGITS.is_match(no_kk.trim())
}

/// Strip spreadsheet artefacts from an identifier: spaces, a leading
/// apostrophe, and a trailing ".0" from numeric cells.
pub fn clean_identifier(raw: &str) -> String {
    let s = raw.trim().trim_start_matches('\'');
    let s = s.strip_suffix(".0").unwrap_or(s);
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Normalize gender spellings to `L` / `P`.
pub fn normalize_jenis_kelamin(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "l" | "lk" | "laki-laki" | "laki laki" | "laki" | "pria" => Some("L"),
        "p" | "pr" | "perempuan" | "wanita" => Some("P"),
        _ => None,
    }
}

/// Parse `YYYY-MM-DD`, `DD-MM-YYYY`, or `DD/MM/YYYY`. An ISO timestamp is
/// accepted by its date prefix.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let candidate = if s.len() > 10 && s.as_bytes().get(10) == Some(&b'T') {
        &s[..10]
    } else {
        s
    };
    ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
}

/// Parse an amount typed with optional "Rp" prefix and `.` thousands
/// separators. Anything after a decimal comma is dropped.
pub fn parse_amount(raw: &str) -> Option<u64> {
    let s = raw.trim();
    let s = s
        .strip_prefix("Rp")
        .or_else(|| s.strip_prefix("rp"))
        .unwrap_or(s);
    let integer = s.split(',').next().unwrap_or("");
    let digits: String = integer.chars().filter(|c| !matches!(c, '.' | ' ')).collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Validate a resident record before it is sent to the backend.
pub fn validate_penduduk(p: &Penduduk) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if !is_valid_nik(&p.nik) {
        issues.push(ValidationIssue {
            field: "nik",
            message: format!("NIK harus 16 digit (diterima '{}')", p.nik),
        });
    }
    if !is_valid_no_kk(&p.no_kk) {
        issues.push(ValidationIssue {
            field: "no_kk",
            message: format!("No. KK harus 16 digit (diterima '{}')", p.no_kk),
        });
    }
    if p.nama.trim().is_empty() {
        issues.push(ValidationIssue {
            field: "nama",
            message: "nama wajib diisi".into(),
        });
    }
    if let Some(date) = p.tanggal_lahir.as_deref().filter(|d| !d.is_empty()) {
        if parse_date(date).is_none() {
            issues.push(ValidationIssue {
                field: "tanggal_lahir",
                message: format!("tanggal lahir tidak dikenali: '{date}'"),
            });
        }
    }
    if let Some(jk) = p.jenis_kelamin.as_deref().filter(|j| !j.is_empty()) {
        if normalize_jenis_kelamin(jk).is_none() {
            issues.push(ValidationIssue {
                field: "jenis_kelamin",
                message: format!("jenis kelamin tidak dikenali: '{jk}'"),
            });
        }
    }

    issues
}
