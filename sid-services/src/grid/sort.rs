//! Single-key sorting with an asc/desc toggle.

use std::cmp::Ordering;

use sid_models::{FieldDescriptor, FormSubmission};

use super::value::{sort_key, SortKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// The active sort column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Next sort after the header of `field` is clicked: a new column starts
    /// ascending, the same column flips direction.
    pub fn toggle(current: Option<&SortSpec>, field: &str) -> SortSpec {
        match current {
            Some(spec) if spec.field == field => SortSpec {
                field: field.to_string(),
                direction: match spec.direction {
                    SortDirection::Asc => SortDirection::Desc,
                    SortDirection::Desc => SortDirection::Asc,
                },
            },
            _ => SortSpec {
                field: field.to_string(),
                direction: SortDirection::Asc,
            },
        }
    }
}

/// Sort record indices in place. The sort is stable, so equal keys keep
/// their insertion order, and missing values stay last in both directions.
pub fn sort_indices(
    indices: &mut [usize],
    records: &[FormSubmission],
    field: &FieldDescriptor,
    direction: SortDirection,
) {
    let keys: Vec<SortKey> = records.iter().map(|r| sort_key(field, r)).collect();
    indices.sort_by(|&a, &b| compare(&keys[a], &keys[b], direction));
}

fn compare(a: &SortKey, b: &SortKey, direction: SortDirection) -> Ordering {
    match (a, b) {
        (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
        (SortKey::Missing, _) => Ordering::Greater,
        (_, SortKey::Missing) => Ordering::Less,
        _ => match direction {
            SortDirection::Asc => a.compare(b),
            SortDirection::Desc => b.compare(a),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sid_models::FieldKind;

    fn records(values: &[Option<i64>]) -> Vec<FormSubmission> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut r = FormSubmission { id: format!("r{i}"), ..Default::default() };
                if let Some(v) = v {
                    r.data.insert("n".into(), json!(v));
                }
                r
            })
            .collect()
    }

    fn field() -> FieldDescriptor {
        FieldDescriptor {
            name: "n".into(),
            label: "N".into(),
            kind: FieldKind::Currency,
            required: false,
        }
    }

    #[test]
    fn test_toggle() {
        let first = SortSpec::toggle(None, "nama");
        assert_eq!(first.direction, SortDirection::Asc);
        let second = SortSpec::toggle(Some(&first), "nama");
        assert_eq!(second.direction, SortDirection::Desc);
        let third = SortSpec::toggle(Some(&second), "nama");
        assert_eq!(third.direction, SortDirection::Asc);
        let other = SortSpec::toggle(Some(&second), "umur");
        assert_eq!(other, SortSpec { field: "umur".into(), direction: SortDirection::Asc });
    }

    #[test]
    fn test_stable_with_missing_last() {
        let recs = records(&[Some(3), None, Some(1), Some(3), None, Some(2)]);
        let mut idx: Vec<usize> = (0..recs.len()).collect();
        sort_indices(&mut idx, &recs, &field(), SortDirection::Asc);
        assert_eq!(idx, vec![2, 5, 0, 3, 1, 4]);

        let mut idx: Vec<usize> = (0..recs.len()).collect();
        sort_indices(&mut idx, &recs, &field(), SortDirection::Desc);
        assert_eq!(idx, vec![0, 3, 5, 2, 1, 4]);
    }
}
