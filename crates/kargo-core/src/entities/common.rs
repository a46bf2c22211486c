//! Common types shared by the entities and the list queries

use serde::{Deserialize, Serialize};

/// Page request parameters, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: u64,
    pub limit: u64,
}

impl PaginationParams {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const MAX_LIMIT: u64 = 100;

    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Page descriptor returned alongside every list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(params: PaginationParams, total: u64) -> Self {
        Self {
            page: params.page,
            limit: params.limit,
            total,
            total_pages: total.div_ceil(params.limit),
        }
    }
}

/// A page of rows plus its descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub rows: Vec<T>,
    pub pagination: Pagination,
}
