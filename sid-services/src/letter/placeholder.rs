//! `{placeholder}` substitution for letter bodies.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("static regex");
}

/// Result of substituting a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// Placeholders without a value, in order of first appearance.
    pub unknown: Vec<String>,
}

/// Distinct placeholder names in `body`, in order of first appearance.
pub fn placeholders(body: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(body) {
        let name = &caps[1];
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}

/// Render a field value as letter text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace every known placeholder; unknown ones stay in the text.
pub fn substitute(body: &str, values: &Map<String, Value>) -> Substitution {
    let mut unknown: Vec<String> = Vec::new();
    let text = PLACEHOLDER
        .replace_all(body, |caps: &Captures| match values.get(&caps[1]) {
            Some(v) => value_text(v),
            None => {
                if !unknown.iter().any(|n| n == &caps[1]) {
                    unknown.push(caps[1].to_string());
                }
                caps[0].to_string()
            }
        })
        .into_owned();
    Substitution { text, unknown }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_substitute_known_and_unknown() {
        let mut values = Map::new();
        values.insert("nama".into(), json!("Sri Wahyuni"));
        values.insert("umur".into(), json!(41));

        let out = substitute("Nama: {nama}, umur {umur}. {ttd} {ttd} {x-y}", &values);
        assert_eq!(out.text, "Nama: Sri Wahyuni, umur 41. {ttd} {ttd} {x-y}");
        assert_eq!(out.unknown, vec!["ttd"]);
    }

    #[test]
    fn test_placeholders_in_order() {
        assert_eq!(
            placeholders("{b} {a} {b} {nomor_surat}"),
            vec!["b", "a", "nomor_surat"]
        );
        assert!(placeholders("tanpa isian").is_empty());
    }

    #[test]
    fn test_null_value_renders_empty() {
        let mut values = Map::new();
        values.insert("catatan".into(), Value::Null);
        assert_eq!(substitute("[{catatan}]", &values).text, "[]");
    }
}
