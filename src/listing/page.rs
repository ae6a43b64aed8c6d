//! Page number and page size handling for list endpoints.

use serde::{Deserialize, Serialize};

/// The config for pagination.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to use when the request does not give a valid one.
    pub default_page: u64,
    /// The number of items per page when the request does not give a valid one.
    pub default_page_size: u64,
    /// The largest page size a request may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// A validated page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// The 1-based page number.
    pub page: u64,
    /// The number of items per page.
    pub limit: u64,
}

impl PageRequest {
    /// Read the raw `page` and `limit` query parameters.
    ///
    /// A page below 1 or one that is not an integer becomes the default page.
    /// A limit outside `1..=max_page_size` or one that is not an integer
    /// becomes the default page size. This never fails.
    pub fn from_query(page: Option<&str>, limit: Option<&str>, config: &PaginationConfig) -> Self {
        let page = page
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|&page| page >= 1)
            .map_or(config.default_page, |page| page as u64);

        let limit = limit
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|&limit| limit >= 1 && limit as u64 <= config.max_page_size)
            .map_or(config.default_page_size, |limit| limit as u64);

        Self { page, limit }
    }

    /// The number of rows to skip, `(page - 1) * limit`.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// One page of a list response together with the total number of matching items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// The number of items matching the filters, ignoring paging.
    pub total: u64,
    /// The 1-based page number.
    pub page: u64,
    /// The page size used.
    pub limit: u64,
}

impl<T> Page<T> {
    /// Combine the rows of one page with the total count and the request that produced them.
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
        }
    }
}
