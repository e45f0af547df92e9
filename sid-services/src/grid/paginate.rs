//! Client-side pagination. Pages are 1-based.

use sid_core::constants::PAGE_SIZES;
use sid_core::error::{SidError, SidResult};

/// Accept only the offered page sizes.
pub fn validate_page_size(size: usize) -> SidResult<usize> {
    if PAGE_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(SidError::Validation(format!(
            "ukuran halaman {size} tidak didukung (pilihan: {PAGE_SIZES:?})"
        )))
    }
}

/// Number of pages for `total` items; an empty result still has one page.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size).max(1)
}

/// Clamp a requested page into `1..=page_count`.
pub fn clamp_page(page: usize, total: usize, page_size: usize) -> usize {
    page.clamp(1, page_count(total, page_size))
}

/// The items on `page`, after clamping.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page_size == 0 {
        return items;
    }
    let page = clamp_page(page, items.len(), page_size);
    let start = ((page - 1) * page_size).min(items.len());
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_sizes() {
        assert!(validate_page_size(20).is_ok());
        assert!(validate_page_size(25).is_err());
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
    }

    #[test]
    fn test_slices_clamp() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(page_slice(&items, 3, 10), &[21, 22, 23, 24, 25]);
        assert_eq!(page_slice(&items, 9, 10), &[21, 22, 23, 24, 25]);
        assert_eq!(page_slice(&items, 0, 10).len(), 10);
        assert!(page_slice::<u32>(&[], 1, 10).is_empty());
    }

    #[test]
    fn test_pages_concatenate_to_sequence() {
        for total in [0usize, 1, 9, 10, 11, 57, 100, 101] {
            let items: Vec<usize> = (0..total).collect();
            for size in PAGE_SIZES {
                let mut joined = Vec::new();
                for page in 1..=page_count(total, size) {
                    joined.extend_from_slice(page_slice(&items, page, size));
                }
                assert_eq!(joined, items, "total={total} size={size}");
            }
        }
    }
}
