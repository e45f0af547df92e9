//! Month numbers as Roman numerals for letter numbers.

const MONTHS: [&str; 12] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII"];

/// Uppercase Roman numeral for a month 1..=12; empty otherwise.
pub fn to_roman(month: u32) -> &'static str {
    match month {
        1..=12 => MONTHS[(month - 1) as usize],
        _ => "",
    }
}
