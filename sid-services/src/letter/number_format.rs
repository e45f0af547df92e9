//! Thousands grouping for typed amounts (id-ID: `.` separator).

/// Digits of `raw` before any decimal comma.
pub fn digits_only(raw: &str) -> String {
    raw.split(',')
        .next()
        .unwrap_or("")
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Re-group whatever the operator typed, e.g. `"1500000"` -> `"1.500.000"`.
///
/// Applying it to its own output returns the same string. Input without
/// digits yields an empty string.
pub fn format_thousands(raw: &str) -> String {
    let digits = digits_only(raw);
    let trimmed = digits.trim_start_matches('0');
    if digits.is_empty() {
        return String::new();
    }
    if trimmed.is_empty() {
        return "0".to_string();
    }
    group(trimmed)
}

/// Group an integer with `.` separators.
pub fn group_thousands(n: u64) -> String {
    group(&n.to_string())
}

/// `Rp 1.500.000`.
pub fn format_rupiah(n: u64) -> String {
    format!("Rp {}", group_thousands(n))
}

/// Numeric value of a formatted or raw amount.
pub fn parse_formatted(raw: &str) -> Option<u64> {
    let digits = digits_only(raw);
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

fn group(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
