//! Hierarchical grouping of records by field values.
//!
//! A hierarchy is an ordered list of field names. Records are partitioned
//! by the first field, each bucket by the second, and so on. Navigation
//! descends one level at a time; the path taken is kept as breadcrumbs.

use std::collections::BTreeMap;

use sid_core::constants::UNFILLED_BUCKET;

/// Records sharing one value at a grouping level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub key: String,
    /// Record indices, in input order.
    pub records: Vec<usize>,
}

/// Partition `records` by `key_of`. Buckets are ordered by key, with the
/// unfilled bucket last.
pub fn partition(records: &[usize], key_of: impl Fn(usize) -> String) -> Vec<Bucket> {
    let mut map: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for &idx in records {
        map.entry(key_of(idx)).or_default().push(idx);
    }

    let unfilled = map.remove(UNFILLED_BUCKET);
    let mut buckets: Vec<Bucket> = map
        .into_iter()
        .map(|(key, records)| Bucket { key, records })
        .collect();
    if let Some(records) = unfilled {
        buckets.push(Bucket { key: UNFILLED_BUCKET.to_string(), records });
    }
    buckets
}

/// A node of the full grouping tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
    pub key: String,
    pub count: usize,
    pub children: Vec<GroupNode>,
    /// Record indices; only populated at the deepest level.
    pub records: Vec<usize>,
}

/// Build the whole tree for `hierarchy`. `key_of(field, idx)` yields the
/// grouping key of record `idx` for `field`.
pub fn group_tree<F>(records: &[usize], hierarchy: &[String], key_of: &F) -> Vec<GroupNode>
where
    F: Fn(&str, usize) -> String,
{
    let Some((field, rest)) = hierarchy.split_first() else {
        return Vec::new();
    };
    partition(records, |idx| key_of(field, idx))
        .into_iter()
        .map(|bucket| {
            let children = group_tree(&bucket.records, rest, key_of);
            GroupNode {
                key: bucket.key,
                count: bucket.records.len(),
                records: if rest.is_empty() { bucket.records } else { Vec::new() },
                children,
            }
        })
        .collect()
}

/// All leaf record lists of a tree, depth first.
pub fn leaves(nodes: &[GroupNode]) -> Vec<&[usize]> {
    let mut out = Vec::new();
    for node in nodes {
        if node.children.is_empty() {
            out.push(node.records.as_slice());
        } else {
            out.extend(leaves(&node.children));
        }
    }
    out
}

/// One step of the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub field: String,
    pub key: String,
}

/// Position within a grouping hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupNavigator {
    hierarchy: Vec<String>,
    path: Vec<String>,
}

impl GroupNavigator {
    pub fn new(hierarchy: Vec<String>) -> Self {
        Self { hierarchy, path: Vec::new() }
    }

    pub fn hierarchy(&self) -> &[String] {
        &self.hierarchy
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// At the deepest level (or grouping disabled): show the flat table.
    pub fn is_leaf(&self) -> bool {
        self.path.len() >= self.hierarchy.len()
    }

    /// Field grouped on at the current level.
    pub fn current_field(&self) -> Option<&str> {
        self.hierarchy.get(self.path.len()).map(String::as_str)
    }

    /// Descend into the bucket `key`. Returns false at the leaf level.
    pub fn enter(&mut self, key: &str) -> bool {
        if self.is_leaf() {
            return false;
        }
        self.path.push(key.to_string());
        true
    }

    /// Go up one level. Returns false at the top.
    pub fn leave(&mut self) -> bool {
        self.path.pop().is_some()
    }

    /// Jump back to `depth` levels below the top, as when a breadcrumb is clicked.
    pub fn go_to(&mut self, depth: usize) {
        self.path.truncate(depth);
    }

    pub fn reset(&mut self) {
        self.path.clear();
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.hierarchy
            .iter()
            .zip(&self.path)
            .map(|(field, key)| Breadcrumb { field: field.clone(), key: key.clone() })
            .collect()
    }

    /// Records inside the current path.
    pub fn narrow<F>(&self, records: &[usize], key_of: &F) -> Vec<usize>
    where
        F: Fn(&str, usize) -> String,
    {
        records
            .iter()
            .copied()
            .filter(|&idx| {
                self.hierarchy
                    .iter()
                    .zip(&self.path)
                    .all(|(field, key)| &key_of(field, idx) == key)
            })
            .collect()
    }

    /// Buckets at the current level; empty at the leaf level.
    pub fn buckets<F>(&self, records: &[usize], key_of: &F) -> Vec<Bucket>
    where
        F: Fn(&str, usize) -> String,
    {
        let Some(field) = self.current_field() else {
            return Vec::new();
        };
        partition(&self.narrow(records, key_of), |idx| key_of(field, idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // (dusun, rt) per record; "" means unfilled.
    const ROWS: &[(&str, &str)] = &[
        ("Krajan", "01"),
        ("Sukamaju", "02"),
        ("", "01"),
        ("Krajan", "02"),
        ("Krajan", ""),
        ("Sukamaju", "02"),
        ("", ""),
    ];

    fn key_of(field: &str, idx: usize) -> String {
        let (dusun, rt) = ROWS[idx];
        let v = if field == "dusun" { dusun } else { rt };
        if v.is_empty() { UNFILLED_BUCKET.to_string() } else { v.to_string() }
    }

    fn all() -> Vec<usize> {
        (0..ROWS.len()).collect()
    }

    fn hierarchy() -> Vec<String> {
        vec!["dusun".into(), "rt".into()]
    }

    #[test]
    fn test_partition_orders_unfilled_last() {
        let buckets = partition(&all(), |i| key_of("dusun", i));
        let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["Krajan", "Sukamaju", UNFILLED_BUCKET]);
        assert_eq!(buckets[0].records, vec![0, 3, 4]);
    }

    #[test]
    fn test_leaves_cover_every_record_once() {
        let tree = group_tree(&all(), &hierarchy(), &key_of);
        let mut seen: Vec<usize> = leaves(&tree).into_iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, all());

        let total: usize = tree.iter().map(|n| n.count).sum();
        assert_eq!(total, ROWS.len());
    }

    #[test]
    fn test_navigation_and_breadcrumbs() {
        let mut nav = GroupNavigator::new(hierarchy());
        assert_eq!(nav.current_field(), Some("dusun"));
        assert!(!nav.is_leaf());

        assert!(nav.enter("Krajan"));
        let buckets = nav.buckets(&all(), &key_of);
        let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["01", "02", UNFILLED_BUCKET]);

        assert!(nav.enter("02"));
        assert!(nav.is_leaf());
        assert!(!nav.enter("x"));
        assert_eq!(nav.narrow(&all(), &key_of), vec![3]);
        assert_eq!(
            nav.breadcrumbs(),
            vec![
                Breadcrumb { field: "dusun".into(), key: "Krajan".into() },
                Breadcrumb { field: "rt".into(), key: "02".into() },
            ]
        );

        nav.go_to(0);
        assert_eq!(nav.depth(), 0);
        assert!(!nav.leave());
    }

    #[test]
    fn test_no_hierarchy_is_flat() {
        let nav = GroupNavigator::default();
        assert!(nav.is_leaf());
        assert!(nav.buckets(&all(), &key_of).is_empty());
        assert_eq!(nav.narrow(&all(), &key_of), all());
    }
}
