//! Indonesian numeral-to-words conversion.

const UNITS: [&str; 12] = [
    "", "satu", "dua", "tiga", "empat", "lima", "enam", "tujuh", "delapan", "sembilan",
    "sepuluh", "sebelas",
];

/// Exclusive upper bound of supported values (10^15).
pub const LIMIT: u64 = 1_000_000_000_000_000;

/// Spell out `n` in Indonesian, e.g. `123` -> "seratus dua puluh tiga".
///
/// Returns an empty string for values at or above [`LIMIT`].
pub fn terbilang(n: u64) -> String {
    if n == 0 {
        return "nol".to_string();
    }
    if n >= LIMIT {
        return String::new();
    }
    words(n)
}

/// Spell out an amount of money with a trailing "rupiah".
pub fn terbilang_rupiah(n: u64) -> String {
    let w = terbilang(n);
    if w.is_empty() {
        w
    } else {
        format!("{w} rupiah")
    }
}

fn words(n: u64) -> String {
    match n {
        0 => String::new(),
        1..=11 => UNITS[n as usize].to_string(),
        12..=19 => format!("{} belas", words(n - 10)),
        20..=99 => join(format!("{} puluh", words(n / 10)), words(n % 10)),
        100..=199 => join("seratus".to_string(), words(n - 100)),
        200..=999 => join(format!("{} ratus", words(n / 100)), words(n % 100)),
        1_000..=1_999 => join("seribu".to_string(), words(n - 1_000)),
        2_000..=999_999 => join(format!("{} ribu", words(n / 1_000)), words(n % 1_000)),
        1_000_000..=999_999_999 => {
            join(format!("{} juta", words(n / 1_000_000)), words(n % 1_000_000))
        }
        1_000_000_000..=999_999_999_999 => join(
            format!("{} miliar", words(n / 1_000_000_000)),
            words(n % 1_000_000_000),
        ),
        _ => join(
            format!("{} triliun", words(n / 1_000_000_000_000)),
            words(n % 1_000_000_000_000),
        ),
    }
}

fn join(head: String, tail: String) -> String {
    if tail.is_empty() {
        head
    } else {
        format!("{head} {tail}")
    }
}
