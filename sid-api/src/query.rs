//! Table query builder with PostgREST filter chaining.
//!
//! A `TableQuery` collects filters, ordering, column selection and a row
//! range, and renders them as query-string pairs. The same builder is used
//! as the row filter for `update` and `delete`.

use serde_json::Value;

/// One row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    Neq(String, String),
    /// Case-insensitive pattern match; `%` is the wildcard.
    ILike(String, String),
    In(String, Vec<String>),
    IsNull(String),
    /// Raw disjunction, e.g. `nama.ilike.*budi*,nik.ilike.*budi*`.
    Or(String),
}

impl Filter {
    fn to_pair(&self) -> (String, String) {
        match self {
            Filter::Eq(col, v) => (col.clone(), format!("eq.{v}")),
            Filter::Neq(col, v) => (col.clone(), format!("neq.{v}")),
            Filter::ILike(col, p) => (col.clone(), format!("ilike.{}", p.replace('%', "*"))),
            Filter::In(col, values) => {
                let list: Vec<String> = values.iter().map(|v| quote_list_value(v)).collect();
                (col.clone(), format!("in.({})", list.join(",")))
            }
            Filter::IsNull(col) => (col.clone(), "is.null".to_string()),
            Filter::Or(expr) => ("or".to_string(), format!("({expr})")),
        }
    }
}

fn quote_list_value(v: &str) -> String {
    if v.contains(&[',', '(', ')', '"', ' '][..]) {
        format!("\"{}\"", v.replace('"', "\\\""))
    } else {
        v.to_string()
    }
}

/// Render a JSON scalar the way PostgREST expects it in a filter.
pub fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Builder for table reads and row filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    columns: Option<String>,
    filters: Vec<Filter>,
    order: Vec<(String, bool)>,
    range: Option<(usize, usize)>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict returned columns. Embedded resources use PostgREST syntax,
    /// e.g. `*,penduduk(*)`.
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.to_string()));
        self
    }

    pub fn neq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::Neq(column.to_string(), value.to_string()));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.filters.push(Filter::ILike(column.to_string(), pattern.to_string()));
        self
    }

    pub fn in_list<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull(column.to_string()));
        self
    }

    pub fn or(mut self, expr: &str) -> Self {
        self.filters.push(Filter::Or(expr.to_string()));
        self
    }

    /// Append a sort key. Keys apply in the order they were added.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    /// Inclusive row range, zero-based.
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.range = Some((from, to.max(from)));
        self
    }

    pub fn columns(&self) -> Option<&str> {
        self.columns.as_deref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> &[(String, bool)] {
        &self.order
    }

    pub fn row_range(&self) -> Option<(usize, usize)> {
        self.range
    }

    /// Whether the query narrows rows at all. Unfiltered updates and
    /// deletes are refused by the client.
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Query-string pairs for a read.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![(
            "select".to_string(),
            self.columns.clone().unwrap_or_else(|| "*".to_string()),
        )];
        pairs.extend(self.filter_pairs());

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(col, asc)| format!("{col}.{}", if *asc { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        if let Some((from, to)) = self.range {
            pairs.push(("offset".to_string(), from.to_string()));
            pairs.push(("limit".to_string(), (to - from + 1).to_string()));
        }

        pairs
    }

    /// Query-string pairs for the row filter only (update/delete).
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters.iter().map(Filter::to_pair).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_default_selects_all() {
        assert_eq!(TableQuery::new().to_pairs(), vec![pair("select", "*")]);
    }

    #[test]
    fn test_filter_chaining() {
        let q = TableQuery::new()
            .select("id,nama")
            .eq("dusun", "Krajan")
            .neq("jenis_kelamin", "L")
            .ilike("nama", "%budi%")
            .is_null("deleted_at")
            .order("nama", true)
            .order("created_at", false)
            .range(20, 29);

        assert_eq!(
            q.to_pairs(),
            vec![
                pair("select", "id,nama"),
                pair("dusun", "eq.Krajan"),
                pair("jenis_kelamin", "neq.L"),
                pair("nama", "ilike.*budi*"),
                pair("deleted_at", "is.null"),
                pair("order", "nama.asc,created_at.desc"),
                pair("offset", "20"),
                pair("limit", "10"),
            ]
        );
    }

    #[test]
    fn test_in_list_quotes_awkward_values() {
        let q = TableQuery::new().in_list("dusun", ["Krajan", "Dusun I, Barat"]);
        assert_eq!(q.filter_pairs(), vec![pair("dusun", "in.(Krajan,\"Dusun I, Barat\")")]);
    }

    #[test]
    fn test_or_expression() {
        let q = TableQuery::new().or("nama.ilike.*sri*,nik.ilike.*sri*");
        assert_eq!(q.filter_pairs(), vec![pair("or", "(nama.ilike.*sri*,nik.ilike.*sri*)")]);
        assert!(q.has_filters());
        assert!(!TableQuery::new().has_filters());
    }

    #[test]
    fn test_filter_value_rendering() {
        assert_eq!(filter_value(&serde_json::json!("abc")), "abc");
        assert_eq!(filter_value(&serde_json::json!(42)), "42");
        assert_eq!(filter_value(&serde_json::json!(true)), "true");
    }
}
