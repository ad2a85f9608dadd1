//! Pagination envelope.

use serde::Serialize;

/// Page metadata for list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginateMeta {
    pub total_items: u64,
    pub item_count: u64,
    pub per_page: u32,
    pub total_pages: u64,
    pub current_page: u32,
}

impl PaginateMeta {
    pub fn new(total_items: u64, item_count: u64, per_page: u32, current_page: u32) -> Self {
        let per_page = per_page.max(1);
        Self {
            total_items,
            item_count,
            per_page,
            total_pages: total_items.div_ceil(u64::from(per_page)),
            current_page,
        }
    }
}

/// One page of items plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub meta: PaginateMeta,
}

impl<T> Paginated<T> {
    /// Converts items while keeping metadata.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Paginated<U>, E> {
        Ok(Paginated {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            meta: self.meta,
        })
    }
}

/// Rows skipped before `page` (1-based).
pub fn page_offset(page: u32, limit: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(limit)
}

#[cfg(test)]
mod tests {
    use super::{page_offset, PaginateMeta};

    #[test]
    fn meta_rounds_total_pages_up() {
        let meta = PaginateMeta::new(21, 10, 10, 1);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(PaginateMeta::new(0, 0, 10, 1).total_pages, 0);
        assert_eq!(PaginateMeta::new(20, 10, 10, 2).total_pages, 2);
    }

    #[test]
    fn page_offset_is_one_based() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(0, 10), 0);
    }
}
