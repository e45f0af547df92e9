//! Schema-driven data grid for form submissions.
//!
//! Columns come from runtime field descriptors. Everything the grid does
//! (search, equality filters, sort, grouping, pagination) happens on the
//! loaded records; only edits and deletes go back to the backend.

pub mod filter;
pub mod format;
pub mod group;
pub mod paginate;
pub mod sort;
pub mod state;
pub mod value;

pub use filter::GridFilter;
pub use group::{Breadcrumb, Bucket, GroupNavigator};
pub use sort::{SortDirection, SortSpec};
pub use state::{BucketSummary, GridRow, GridState, GridView};
pub use value::{resolve_cell, resolve_raw, Cell};
