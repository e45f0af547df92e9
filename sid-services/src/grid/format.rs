//! Display formatting shared by the grid and the letter generator.

use chrono::{Datelike, NaiveDate};
use sid_models::{DateFormat, TextCase};

/// Indonesian month names, January first.
pub const MONTHS: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni", "Juli", "Agustus", "September",
    "Oktober", "November", "Desember",
];

/// Format a date with one of the supported templates.
pub fn format_date(date: NaiveDate, format: DateFormat) -> String {
    match format {
        DateFormat::Long => format!(
            "{} {} {}",
            date.day(),
            MONTHS[date.month0() as usize],
            date.year()
        ),
        DateFormat::DashDmy => date.format("%d-%m-%Y").to_string(),
        DateFormat::SlashDmy => date.format("%d/%m/%Y").to_string(),
    }
}

/// Apply a text case transform. `Capitalize` upper-cases the first letter of
/// each word and lower-cases the rest, keeping the original spacing.
pub fn apply_case(text: &str, case: TextCase) -> String {
    match case {
        TextCase::Upper => text.to_uppercase(),
        TextCase::Lower => text.to_lowercase(),
        TextCase::Capitalize => {
            let mut out = String::with_capacity(text.len());
            let mut at_word_start = true;
            for c in text.chars() {
                if c.is_whitespace() {
                    at_word_start = true;
                    out.push(c);
                } else if at_word_start {
                    out.extend(c.to_uppercase());
                    at_word_start = false;
                } else {
                    out.extend(c.to_lowercase());
                }
            }
            out
        }
    }
}
