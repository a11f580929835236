//! Offset-pagination primitives shared by backend list endpoints.
//!
//! List endpoints accept `page`/`pageSize` query parameters and answer with a
//! `{data, total}` envelope. The storage layer addresses rows through an
//! inclusive `[start, end]` window, so the conversion from page numbers to
//! row offsets lives here rather than in each handler.

use serde::{Deserialize, Serialize};

/// Default page number when the query string omits `page`.
pub const DEFAULT_PAGE: u64 = 1;
/// Default window size when the query string omits `pageSize`.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Query parameters accepted by paginated list endpoints.
///
/// Both fields default when absent. No upper bound is applied to
/// `page_size`; pathological values are forwarded to storage untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageParams {
    /// One-based page number.
    pub page: u64,
    /// Number of rows per page.
    pub page_size: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageParams {
    /// Inclusive `[start, end]` row window for this page.
    ///
    /// `page = 0` is clamped to the first page and a zero `page_size`
    /// collapses to the single row at `start`.
    #[must_use]
    pub fn window(&self) -> (u64, u64) {
        let start = self.page.saturating_sub(1).saturating_mul(self.page_size);
        let end = start
            .saturating_add(self.page_size.saturating_sub(1))
            .max(start);
        (start, end)
    }
}

/// Response envelope for paginated collections.
#[derive(Debug, Clone, Serialize)]
pub struct PageEnvelope<T> {
    /// Rows within the requested window.
    pub data: Vec<T>,
    /// Total row count when the query requested one, `null` otherwise.
    pub total: Option<u64>,
}

impl<T> PageEnvelope<T> {
    /// Wrap a window of rows and an optional total count.
    #[must_use]
    pub fn new(data: Vec<T>, total: Option<u64>) -> Self {
        Self { data, total }
    }
}
