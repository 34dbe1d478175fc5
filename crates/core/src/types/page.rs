//! Offset pagination for the store listing.

use serde::{Deserialize, Serialize};

/// Stores shown per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 4;

/// A 1-based page number requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Page `page` with the default page size. Zero is treated as page 1.
    #[must_use]
    pub const fn new(page: u32) -> Self {
        Self::with_size(page, DEFAULT_PAGE_SIZE)
    }

    /// Page `page` of `page_size` items. Zero values are clamped to 1.
    #[must_use]
    pub const fn with_size(page: u32, page_size: u32) -> Self {
        Self {
            page: if page == 0 { 1 } else { page },
            page_size: if page_size == 0 { 1 } else { page_size },
        }
    }

    /// Parse a path segment; anything that isn't a positive integer is page 1.
    #[must_use]
    pub fn from_path(segment: &str) -> Self {
        Self::new(segment.trim().parse().unwrap_or(1))
    }

    /// Requested page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Where a listing page sits in the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page, 1-based.
    pub page: u32,
    /// Page size used to compute `total_pages`.
    pub page_size: u32,
    /// Total matching items.
    pub total_count: u64,
    /// `ceil(total_count / page_size)`; zero when there are no items.
    pub total_pages: u32,
}

impl Pagination {
    /// Describe `request` against `total_count` items.
    #[must_use]
    pub fn new(request: PageRequest, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(u64::from(request.page_size));
        Self {
            page: request.page,
            page_size: request.page_size,
            total_count,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }

    /// The page a client should be sent to instead, if this one is empty.
    ///
    /// A non-first page that returned no rows is corrected to the last page
    /// (or page 1 when the listing is empty). Page 1 is never corrected.
    #[must_use]
    pub fn correction(&self, rows_on_page: usize) -> Option<u32> {
        (rows_on_page == 0 && self.page != 1).then(|| self.total_pages.max(1))
    }

    /// Whether a "previous" link should be shown.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Whether a "next" link should be shown.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Previous page number (saturating at 1).
    #[must_use]
    pub const fn previous(&self) -> u32 {
        if self.page > 1 { self.page - 1 } else { 1 }
    }

    /// Next page number.
    #[must_use]
    pub const fn next(&self) -> u32 {
        self.page.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        assert_eq!(PageRequest::new(1).offset(), 0);
        assert_eq!(PageRequest::new(3).offset(), 8);
        assert_eq!(PageRequest::new(3).limit(), 4);
        assert_eq!(PageRequest::new(0).page(), 1);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(PageRequest::from_path("2").page(), 2);
        assert_eq!(PageRequest::from_path("-2").page(), 1);
        assert_eq!(PageRequest::from_path("two").page(), 1);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(Pagination::new(PageRequest::new(1), 0).total_pages, 0);
        assert_eq!(Pagination::new(PageRequest::new(1), 4).total_pages, 1);
        assert_eq!(Pagination::new(PageRequest::new(1), 5).total_pages, 2);
        assert_eq!(Pagination::new(PageRequest::new(1), 9).total_pages, 3);
    }

    #[test]
    fn test_correction() {
        let past_end = Pagination::new(PageRequest::new(7), 9);
        assert_eq!(past_end.correction(0), Some(3));

        let first_empty = Pagination::new(PageRequest::new(1), 0);
        assert_eq!(first_empty.correction(0), None);

        let nothing_at_all = Pagination::new(PageRequest::new(4), 0);
        assert_eq!(nothing_at_all.correction(0), Some(1));

        let in_range = Pagination::new(PageRequest::new(2), 9);
        assert_eq!(in_range.correction(4), None);
    }

    #[test]
    fn test_pages_cover_every_item_once() {
        let total = 11_u64;
        let pages = Pagination::new(PageRequest::new(1), total).total_pages;
        let mut seen = Vec::new();
        for page in 1..=pages {
            let request = PageRequest::new(page);
            let start = u64::try_from(request.offset()).unwrap_or_default();
            let end = (start + u64::try_from(request.limit()).unwrap_or_default()).min(total);
            assert!(end - start <= u64::from(DEFAULT_PAGE_SIZE));
            seen.extend(start..end);
        }
        assert_eq!(seen, (0..total).collect::<Vec<_>>());
    }

    #[test]
    fn test_navigation() {
        let p = Pagination::new(PageRequest::new(2), 9);
        assert!(p.has_previous());
        assert!(p.has_next());
        assert_eq!(p.previous(), 1);
        assert_eq!(p.next(), 3);
        assert!(!Pagination::new(PageRequest::new(3), 9).has_next());
    }
}
