//! Grid state: the pipeline from records to the visible page.
//!
//! Records flow through filter, sort, group narrowing and pagination in
//! that order. Changing the search, a filter, the page size or the group
//! path resets to page 1.

use std::collections::HashMap;

use sid_core::constants::PAGE_SIZES;
use sid_core::error::{SidError, SidResult};
use sid_models::{FieldDescriptor, FormDefinition, FormSubmission};
use tracing::debug;

use super::filter::GridFilter;
use super::group::{Breadcrumb, GroupNavigator};
use super::paginate::{clamp_page, page_count, page_slice, validate_page_size};
use super::sort::{sort_indices, SortDirection, SortSpec};
use super::value::{group_key, resolve_cell};

/// A bucket at the current grouping level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSummary {
    pub key: String,
    pub count: usize,
}

/// One displayed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub id: String,
    pub cells: Vec<String>,
}

/// What the grid shows right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    pub columns: Vec<String>,
    pub breadcrumbs: Vec<Breadcrumb>,
    /// Buckets to pick from; empty at the leaf level.
    pub buckets: Vec<BucketSummary>,
    /// Rows of the current page; empty while buckets are shown.
    pub rows: Vec<GridRow>,
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    /// Records matching filters and the group path.
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct GridState {
    form: FormDefinition,
    records: Vec<FormSubmission>,
    filter: GridFilter,
    sort: Option<SortSpec>,
    navigator: GroupNavigator,
    page: usize,
    page_size: usize,
}

impl GridState {
    /// Build a grid for `form` using the form's default hierarchy.
    pub fn new(form: FormDefinition, records: Vec<FormSubmission>) -> Self {
        let hierarchy: Vec<String> = form
            .group_hierarchy
            .iter()
            .filter(|name| form.field(name).is_some())
            .cloned()
            .collect();
        Self {
            form,
            records,
            filter: GridFilter::default(),
            sort: None,
            navigator: GroupNavigator::new(hierarchy),
            page: 1,
            page_size: PAGE_SIZES[0],
        }
    }

    pub fn form(&self) -> &FormDefinition {
        &self.form
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.form.fields
    }

    pub fn records(&self) -> &[FormSubmission] {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&FormSubmission> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn filter(&self) -> &GridFilter {
        &self.filter
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    // ─── Controls ────────────────────────────────────────────────────────

    pub fn set_search(&mut self, text: &str) {
        self.filter.search = text.to_string();
        self.page = 1;
    }

    pub fn set_filter(&mut self, field: &str, value: &str) -> SidResult<()> {
        self.require_field(field)?;
        self.filter.equals.insert(field.to_string(), value.to_string());
        self.page = 1;
        Ok(())
    }

    pub fn clear_filter(&mut self, field: &str) {
        if self.filter.equals.remove(field).is_some() {
            self.page = 1;
        }
    }

    pub fn clear_filters(&mut self) {
        self.filter = GridFilter::default();
        self.page = 1;
    }

    /// Click on a column header.
    pub fn toggle_sort(&mut self, field: &str) -> SidResult<&SortSpec> {
        self.require_field(field)?;
        let next = SortSpec::toggle(self.sort.as_ref(), field);
        Ok(self.sort.insert(next))
    }

    pub fn set_sort(&mut self, field: &str, direction: SortDirection) -> SidResult<()> {
        self.require_field(field)?;
        self.sort = Some(SortSpec { field: field.to_string(), direction });
        Ok(())
    }

    pub fn set_page_size(&mut self, size: usize) -> SidResult<()> {
        self.page_size = validate_page_size(size)?;
        self.page = 1;
        Ok(())
    }

    /// Move to `page`, clamped to the available pages.
    pub fn set_page(&mut self, page: usize) -> usize {
        let total = self.visible().len();
        self.page = clamp_page(page, total, self.page_size);
        self.page
    }

    /// Replace the grouping hierarchy. Every name must be a form field.
    pub fn set_hierarchy(&mut self, hierarchy: Vec<String>) -> SidResult<()> {
        for name in &hierarchy {
            self.require_field(name)?;
        }
        self.navigator = GroupNavigator::new(hierarchy);
        self.page = 1;
        Ok(())
    }

    pub fn hierarchy(&self) -> &[String] {
        self.navigator.hierarchy()
    }

    /// Descend into the bucket `key` at the current level.
    pub fn enter_group(&mut self, key: &str) -> SidResult<()> {
        if !self.current_buckets().iter().any(|b| b.key == key) {
            return Err(SidError::NotFound(format!("kelompok '{key}'")));
        }
        self.navigator.enter(key);
        self.page = 1;
        Ok(())
    }

    pub fn leave_group(&mut self) -> bool {
        let moved = self.navigator.leave();
        if moved {
            self.page = 1;
        }
        moved
    }

    /// Jump to a breadcrumb; `0` is the top level.
    pub fn go_to_level(&mut self, depth: usize) {
        self.navigator.go_to(depth);
        self.page = 1;
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.navigator.breadcrumbs()
    }

    // ─── Data updates ────────────────────────────────────────────────────

    /// Swap in freshly loaded records, keeping the controls.
    pub fn set_records(&mut self, records: Vec<FormSubmission>) {
        self.records = records;
        self.page = clamp_page(self.page, self.visible().len(), self.page_size);
    }

    /// Replace one record after a successful edit.
    pub fn replace_record(&mut self, updated: FormSubmission) -> bool {
        match self.records.iter_mut().find(|r| r.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    /// Drop one record after a successful delete.
    pub fn remove_record(&mut self, id: &str) -> Option<FormSubmission> {
        let pos = self.records.iter().position(|r| r.id == id)?;
        let removed = self.records.remove(pos);
        self.page = clamp_page(self.page, self.visible().len(), self.page_size);
        Some(removed)
    }

    // ─── Pipeline ────────────────────────────────────────────────────────

    /// Indices of records that pass the filters, in display order.
    pub fn filtered(&self) -> Vec<usize> {
        let fields = &self.form.fields;
        let mut indices: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.filter.matches(fields, r))
            .map(|(i, _)| i)
            .collect();

        if let Some(spec) = &self.sort {
            if let Some(field) = self.form.field(&spec.field) {
                sort_indices(&mut indices, &self.records, field, spec.direction);
            }
        }
        indices
    }

    /// Filtered records inside the current group path.
    pub fn visible(&self) -> Vec<usize> {
        let filtered = self.filtered();
        self.navigator.narrow(&filtered, &self.key_fn())
    }

    pub fn current_buckets(&self) -> Vec<BucketSummary> {
        self.navigator
            .buckets(&self.filtered(), &self.key_fn())
            .into_iter()
            .map(|b| BucketSummary { key: b.key, count: b.records.len() })
            .collect()
    }

    /// Column labels in field order.
    pub fn columns(&self) -> Vec<String> {
        self.form.fields.iter().map(|f| f.label.clone()).collect()
    }

    pub fn row(&self, idx: usize) -> GridRow {
        let record = &self.records[idx];
        GridRow {
            id: record.id.clone(),
            cells: self
                .form
                .fields
                .iter()
                .map(|f| resolve_cell(f, record).display().to_string())
                .collect(),
        }
    }

    pub fn view(&self) -> GridView {
        let visible = self.visible();
        let total = visible.len();
        let pages = page_count(total, self.page_size);
        let page = self.page.clamp(1, pages);

        let (buckets, rows) = if self.navigator.is_leaf() {
            let rows = page_slice(&visible, page, self.page_size)
                .iter()
                .map(|&idx| self.row(idx))
                .collect();
            (Vec::new(), rows)
        } else {
            (self.current_buckets(), Vec::new())
        };

        debug!(
            "grid view: {} of {} records, page {page}/{pages}",
            total,
            self.records.len()
        );

        GridView {
            columns: self.columns(),
            breadcrumbs: self.breadcrumbs(),
            buckets,
            rows,
            page,
            page_count: pages,
            page_size: self.page_size,
            total,
        }
    }

    /// Every visible row, unpaginated, for export.
    pub fn export_rows(&self) -> Vec<GridRow> {
        self.visible().into_iter().map(|idx| self.row(idx)).collect()
    }

    fn key_fn(&self) -> impl Fn(&str, usize) -> String + '_ {
        let by_name: HashMap<&str, &FieldDescriptor> =
            self.form.fields.iter().map(|f| (f.name.as_str(), f)).collect();
        move |field: &str, idx: usize| match by_name.get(field) {
            Some(descriptor) => group_key(descriptor, &self.records[idx]),
            None => String::new(),
        }
    }

    fn require_field(&self, name: &str) -> SidResult<()> {
        if self.form.field(name).is_some() {
            Ok(())
        } else {
            Err(SidError::Validation(format!("kolom '{name}' tidak ada di formulir")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sid_core::constants::UNFILLED_BUCKET;
    use sid_models::{FieldKind, Penduduk};

    fn form() -> FormDefinition {
        FormDefinition {
            id: "f1".into(),
            judul: "Pendataan RTLH".into(),
            deskripsi: None,
            fields: vec![
                FieldDescriptor {
                    name: "nama".into(),
                    label: "Nama".into(),
                    kind: FieldKind::SystemDerived { column: "nama".into() },
                    required: false,
                },
                FieldDescriptor {
                    name: "dusun".into(),
                    label: "Dusun".into(),
                    kind: FieldKind::SystemDerived { column: "dusun".into() },
                    required: false,
                },
                FieldDescriptor {
                    name: "kondisi".into(),
                    label: "Kondisi".into(),
                    kind: FieldKind::Dropdown { options: vec!["Baik".into(), "Rusak".into()] },
                    required: false,
                },
            ],
            group_hierarchy: vec!["dusun".into(), "tidak_ada".into()],
            created_at: None,
        }
    }

    fn records(n: usize) -> Vec<FormSubmission> {
        let dusun = ["Krajan", "Sukamaju", ""];
        (0..n)
            .map(|i| {
                let mut r = FormSubmission {
                    id: format!("s{i:03}"),
                    form_id: "f1".into(),
                    penduduk: Some(Penduduk {
                        nik: format!("33010101010{i:05}"),
                        no_kk: "3301010101010000".into(),
                        nama: format!("Warga {i:03}"),
                        dusun: Some(dusun[i % 3].to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                };
                if i % 2 == 0 {
                    r.data.insert("kondisi".into(), json!("Rusak"));
                }
                r
            })
            .collect()
    }

    #[test]
    fn test_unknown_hierarchy_fields_are_dropped() {
        let grid = GridState::new(form(), records(3));
        assert_eq!(grid.hierarchy(), &["dusun".to_string()]);
    }

    #[test]
    fn test_buckets_then_leaf_table() {
        let mut grid = GridState::new(form(), records(30));
        let view = grid.view();
        assert!(view.rows.is_empty());
        let keys: Vec<&str> = view.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["Krajan", "Sukamaju", UNFILLED_BUCKET]);
        assert_eq!(view.buckets.iter().map(|b| b.count).sum::<usize>(), 30);

        grid.enter_group("Krajan").unwrap();
        let view = grid.view();
        assert!(view.buckets.is_empty());
        assert_eq!(view.total, 10);
        assert_eq!(view.rows.len(), 10);
        assert_eq!(view.breadcrumbs.len(), 1);
        assert!(grid.enter_group("Krajan").is_err());

        assert!(grid.leave_group());
        assert!(grid.enter_group("Tidak Ada").is_err());
    }

    #[test]
    fn test_filters_reset_page() {
        let mut grid = GridState::new(form(), records(45));
        grid.set_hierarchy(Vec::new()).unwrap();
        assert_eq!(grid.set_page(3), 3);

        grid.set_search("warga 01");
        assert_eq!(grid.page(), 1);
        assert_eq!(grid.view().total, 10);

        grid.set_page(2);
        grid.set_filter("kondisi", UNFILLED_BUCKET).unwrap();
        assert_eq!(grid.page(), 1);
        assert_eq!(grid.view().total, 5);

        grid.clear_filters();
        grid.set_page(4);
        assert_eq!(grid.page(), 4);
        grid.set_page_size(20).unwrap();
        assert_eq!(grid.page(), 1);
        assert!(grid.set_page_size(15).is_err());
        assert!(grid.set_filter("nope", "x").is_err());
    }

    #[test]
    fn test_sort_and_pages_reproduce_order() {
        let mut grid = GridState::new(form(), records(23));
        grid.set_hierarchy(Vec::new()).unwrap();
        grid.toggle_sort("nama").unwrap();
        grid.toggle_sort("nama").unwrap();
        assert_eq!(grid.sort().map(|s| s.direction), Some(SortDirection::Desc));

        let expected: Vec<String> = grid.export_rows().into_iter().map(|r| r.id).collect();
        assert_eq!(expected.first().map(String::as_str), Some("s022"));

        let mut joined = Vec::new();
        let pages = grid.view().page_count;
        for page in 1..=pages {
            grid.set_page(page);
            joined.extend(grid.view().rows.into_iter().map(|r| r.id));
        }
        assert_eq!(joined, expected);
    }

    #[test]
    fn test_record_updates() {
        let mut grid = GridState::new(form(), records(11));
        grid.set_hierarchy(Vec::new()).unwrap();
        grid.set_page(2);

        let mut edited = grid.record("s000").cloned().unwrap();
        edited.data.insert("kondisi".into(), json!("Baik"));
        assert!(grid.replace_record(edited));
        assert_eq!(grid.row(0).cells[2], "Baik");

        assert!(grid.remove_record("s010").is_some());
        assert_eq!(grid.page(), 1);
        assert!(grid.remove_record("s010").is_none());
    }
}
