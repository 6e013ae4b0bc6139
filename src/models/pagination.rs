//! Pagination primitives shared by every list endpoint.

use serde::Serialize;

/// Default page size when none (or junk) is supplied.
pub const DEFAULT_LIMIT: i64 = 20;
/// Upper bound on page size.
pub const MAX_LIMIT: i64 = 100;

/// Resolved 1-based page parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    /// Parse raw query-string values, falling back to defaults on anything
    /// non-numeric or out of range. List endpoints never fail on bad paging
    /// input.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Self { page, limit }
    }

    /// Number of rows to skip for this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned alongside every list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(total: i64, params: PageParams) -> Self {
        Self {
            total,
            page: params.page,
            limit: params.limit,
            // ceil(total / limit)
            pages: (total + params.limit - 1) / params.limit,
        }
    }
}
