//! Offset pagination arithmetic for search results.

use std::num::NonZeroU64;

use serde::Serialize;

/// Navigation data for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub offset: u64,
    pub page_size: u64,
    /// Offset of the previous page, clamped at zero.
    pub prev_offset: u64,
    /// Offset of the next page; not clamped to the total, see `has_more_pages`.
    pub next_offset: u64,
    /// One-based page number.
    pub current_page: u64,
    pub total_pages: u64,
    pub is_first_page: bool,
    pub has_more_pages: bool,
}

/// Compute navigation for `offset` given the page size and total match count.
pub fn paginate(offset: u64, page_size: NonZeroU64, total_count: u64) -> PageWindow {
    let size = page_size.get();
    let current_page = offset / size + 1;
    let total_pages = total_count.div_ceil(size);

    PageWindow {
        offset,
        page_size: size,
        prev_offset: offset.saturating_sub(size),
        next_offset: offset.saturating_add(size),
        current_page,
        total_pages,
        is_first_page: current_page - 1 == 0,
        has_more_pages: current_page.saturating_add(1) <= total_pages,
    }
}
