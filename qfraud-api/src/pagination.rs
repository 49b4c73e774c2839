//! Page arithmetic for browsing stored transactions (100 rows/page)

/// Rows per page of `GET /view_transactions`
pub const PAGE_SIZE: i64 = 100;

/// Sanitized page position for a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Zero when the result set is empty
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Clamp `requested_page` into `[1, total_pages]` and compute the row offset
///
/// ```
/// use qfraud_api::pagination::calculate_pagination;
///
/// let p = calculate_pagination(250, 99);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 200);
/// ```
pub fn calculate_pagination(total_rows: i64, requested_page: i64) -> Pagination {
    let total_rows = total_rows.max(0);
    let total_pages = (total_rows + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.clamp(1, total_pages.max(1));

    Pagination {
        page,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
    }
}
