//! Offset pagination for list endpoints.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, FieldError};

/// Raw `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Defaults and bounds applied to [`PageQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl PaginationPolicy {
    pub fn new(default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        }
    }

    /// Apply defaults and reject out-of-range values.
    ///
    /// Pages start at 1. Values below 1 would produce a negative offset, so
    /// they are refused instead of being passed to the database.
    pub fn resolve(&self, query: PageQuery) -> Result<PageRequest, AppError> {
        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(i64::from(self.default_limit));

        let mut errors = Vec::new();
        if page < 1 || page > i64::from(u32::MAX) {
            errors.push(FieldError::new("page", "page must be a positive integer"));
        }
        if limit < 1 || limit > i64::from(self.max_limit) {
            errors.push(FieldError::new(
                "limit",
                format!("limit must be between 1 and {}", self.max_limit),
            ));
        }
        if !errors.is_empty() {
            return Err(AppError::validation(errors, "Invalid pagination parameters"));
        }

        Ok(PageRequest {
            page: page as u32,
            limit: limit as u32,
        })
    }
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self::new(3, 100)
    }
}

/// A validated page selection. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Both values must be at least 1.
    pub fn new(page: u32, limit: u32) -> Option<Self> {
        (page >= 1 && limit >= 1).then_some(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Position of one page within a result set of `total` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub offset: u64,
}

impl PageMeta {
    pub fn compute(request: PageRequest, total: u64) -> Self {
        let limit = u64::from(request.limit);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(limit),
            offset: request.offset(),
        }
    }

    pub fn previous_page(&self) -> Option<u32> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<u32> {
        (u64::from(self.page) < self.total_pages).then(|| self.page + 1)
    }

    /// Link to `page` under `base`, keeping the current limit.
    pub fn link(&self, base: &str, page: u32) -> String {
        format!("{base}?page={page}&limit={}", self.limit)
    }
}

/// List response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
    pub previous_page: Option<String>,
    pub next_page: Option<String>,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, meta: PageMeta, base: &str) -> Self {
        Self {
            items,
            page: meta.page,
            limit: meta.limit,
            total: meta.total,
            total_pages: meta.total_pages,
            previous_page: meta.previous_page().map(|page| meta.link(base, page)),
            next_page: meta.next_page().map(|page| meta.link(base, page)),
        }
    }
}
