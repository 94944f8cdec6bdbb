use crate::models::PaginationMeta;

/// Slice one page out of a full ordered list.
///
/// Pages are 1-based. A page past the end is an empty slice with
/// `has_next = false`, not an error. Zero page or page size are clamped to 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> (Vec<T>, PaginationMeta) {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total = items.len();

    let start = (page - 1).saturating_mul(page_size);
    let end = start.saturating_add(page_size).min(total);
    let slice = if start < total {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    let meta = PaginationMeta {
        page,
        page_size,
        total,
        total_pages: total.div_ceil(page_size),
        has_next: start.saturating_add(page_size) < total,
    };

    (slice, meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_page_of_fifteen() {
        let items: Vec<u32> = (0..15).collect();
        let (page, meta) = paginate(&items, 2, 10);

        assert_eq!(page, (10..15).collect::<Vec<_>>());
        assert_eq!(meta.total, 15);
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_first_page_has_next() {
        let items: Vec<u32> = (0..15).collect();
        let (page, meta) = paginate(&items, 1, 10);

        assert_eq!(page.len(), 10);
        assert!(meta.has_next);
    }

    #[test]
    fn test_page_beyond_range_is_empty() {
        let items: Vec<u32> = (0..5).collect();
        let (page, meta) = paginate(&items, 9, 10);

        assert!(page.is_empty());
        assert!(!meta.has_next);
        assert_eq!(meta.total, 5);
        assert_eq!(meta.total_pages, 1);
    }

    #[test]
    fn test_empty_list() {
        let (page, meta) = paginate::<u32>(&[], 1, 20);
        assert!(page.is_empty());
        assert_eq!(meta.total, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_pages_concatenate_to_full_list() {
        let items: Vec<u32> = (0..23).collect();
        let (_, meta) = paginate(&items, 1, 4);

        let rebuilt: Vec<u32> = (1..=meta.total_pages)
            .flat_map(|p| paginate(&items, p, 4).0)
            .collect();
        assert_eq!(rebuilt, items);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let items: Vec<u32> = (0..3).collect();
        let (page, meta) = paginate(&items, usize::MAX, usize::MAX);
        assert!(page.is_empty());
        assert!(!meta.has_next);
    }
}
