//! Client-side pagination over fully fetched upstream collections

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ProxyError;

/// Default page size when the caller does not provide one
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: u32 = 500;

/// Paging and filtering parameters of a list request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaginationRequest {
    /// 1-based page number
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1, max = 500))]
    pub page_size: u32,
    /// Optional name filter forwarded to the upstream API
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub use_regex: bool,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            name: None,
            use_regex: false,
        }
    }
}

impl PaginationRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_regex(mut self, use_regex: bool) -> Self {
        self.use_regex = use_regex;
        self
    }

    /// The name filter, if it contains anything besides whitespace
    pub fn name_filter(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Validate paging bounds and, for regex filters, the pattern itself
    pub fn check(&self) -> Result<(), ProxyError> {
        self.validate()?;
        if self.use_regex
            && let Some(pattern) = self.name_filter()
        {
            regex::Regex::new(pattern)
                .map_err(|e| ProxyError::Validation(format!("invalid name pattern: {}", e)))?;
        }
        Ok(())
    }
}

/// One page of a collection plus the size of the whole collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
}

impl<T> PagedResponse<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total_items.div_ceil(u64::from(self.page_size))
        }
    }
}

/// Slice `items` to the requested 1-based page.
///
/// A page beyond the end of the collection yields an empty slice; the
/// returned `total_items` always equals the collection length.
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> PagedResponse<T> {
    let total = items.len();
    let start = (page.max(1) as usize - 1).saturating_mul(page_size as usize);

    let page_items = if start >= total {
        Vec::new()
    } else {
        let end = start.saturating_add(page_size as usize).min(total);
        items.into_iter().skip(start).take(end - start).collect()
    };

    PagedResponse {
        items: page_items,
        page,
        page_size,
        total_items: total as u64,
    }
}
