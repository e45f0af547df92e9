//! Letter-number layout and the sequence-number input.
//!
//! A layout is a string with `[token]` parts, by default
//! `[indeks_no]/[no]/[kode]/[kode_desa]/[bulan_romawi]/[tahun]`. Tokens that
//! render empty drop out together with their separator, so a template
//! without an index yields `001/470/...` rather than `/001/470/...`.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use sid_core::error::{SidError, SidResult};

use super::roman::to_roman;

/// Standard six-part layout.
pub const DEFAULT_FORMAT: &str = "[indeks_no]/[no]/[kode]/[kode_desa]/[bulan_romawi]/[tahun]";

/// Longest sequence number the operator can type.
pub const MAX_SEQUENCE_DIGITS: usize = 6;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\[([a-z_]+)\]").expect("static regex");
}

/// Values substituted into a layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LetterNumberParts {
    pub indeks_no: String,
    pub no: u64,
    pub kode: String,
    pub kode_desa: String,
    /// Month 1..=12 of the letter date.
    pub month: u32,
    pub year: i32,
}

impl LetterNumberParts {
    fn token(&self, name: &str) -> Option<String> {
        let value = match name {
            "indeks_no" => self.indeks_no.trim().to_string(),
            "no" => format!("{:03}", self.no),
            "kode" => self.kode.trim().to_string(),
            "kode_desa" => self.kode_desa.trim().to_string(),
            "bulan_romawi" => to_roman(self.month).to_string(),
            "bulan" => format!("{:02}", self.month),
            "tahun" => self.year.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

/// Render `format` with `parts`. Unknown tokens are left as written.
pub fn render(format: &str, parts: &LetterNumberParts) -> String {
    let substituted = TOKEN.replace_all(format, |caps: &Captures| {
        parts
            .token(&caps[1])
            .unwrap_or_else(|| caps[0].to_string())
    });

    substituted
        .split('/')
        .filter(|segment| !segment.trim().is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sequence number typed one digit at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceInput {
    digits: String,
}

impl SequenceInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a digit. Returns false when `c` is not a digit or the input is full.
    pub fn push_digit(&mut self, c: char) -> bool {
        if !c.is_ascii_digit() || self.digits.len() >= MAX_SEQUENCE_DIGITS {
            return false;
        }
        self.digits.push(c);
        true
    }

    /// Remove the last digit. Returns false when already empty.
    pub fn backspace(&mut self) -> bool {
        self.digits.pop().is_some()
    }

    /// Replace the whole input with a manually entered number.
    pub fn set(&mut self, raw: &str) -> SidResult<()> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_SEQUENCE_DIGITS
            || !trimmed.chars().all(|c| c.is_ascii_digit())
        {
            return Err(SidError::Validation(format!(
                "nomor urut harus 1-{MAX_SEQUENCE_DIGITS} digit angka (diterima '{raw}')"
            )));
        }
        self.digits = trimmed.to_string();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// The typed number; `None` while empty or zero.
    pub fn value(&self) -> Option<u64> {
        self.digits.parse().ok().filter(|n| *n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> LetterNumberParts {
        LetterNumberParts {
            indeks_no: "Ket".into(),
            no: 7,
            kode: "470".into(),
            kode_desa: "2005".into(),
            month: 8,
            year: 2024,
        }
    }

    #[test]
    fn test_default_layout() {
        assert_eq!(render(DEFAULT_FORMAT, &parts()), "Ket/007/470/2005/VIII/2024");
    }

    #[test]
    fn test_empty_parts_collapse() {
        let p = LetterNumberParts { indeks_no: String::new(), kode_desa: " ".into(), ..parts() };
        assert_eq!(render(DEFAULT_FORMAT, &p), "007/470/VIII/2024");
    }

    #[test]
    fn test_custom_layout_and_unknown_token() {
        assert_eq!(render("[kode]/[no]/[bulan]/[tahun]", &parts()), "470/007/08/2024");
        assert_eq!(render("[no]/[rahasia]", &parts()), "007/[rahasia]");
    }

    #[test]
    fn test_sequence_typing() {
        let mut seq = SequenceInput::new();
        assert!(seq.push_digit('1'));
        assert!(seq.push_digit('2'));
        assert!(!seq.push_digit('x'));
        assert_eq!(seq.value(), Some(12));
        assert!(seq.backspace());
        assert_eq!(seq.as_str(), "1");
        assert!(seq.backspace());
        assert!(!seq.backspace());
        assert_eq!(seq.value(), None);

        for _ in 0..MAX_SEQUENCE_DIGITS {
            assert!(seq.push_digit('9'));
        }
        assert!(!seq.push_digit('9'));
    }

    #[test]
    fn test_sequence_manual_entry() {
        let mut seq = SequenceInput::new();
        seq.set("045").unwrap();
        assert_eq!(seq.value(), Some(45));
        assert!(seq.set("4a").is_err());
        assert!(seq.set("").is_err());
        assert_eq!(seq.as_str(), "045");
        seq.set("0").unwrap();
        assert_eq!(seq.value(), None);
    }
}
