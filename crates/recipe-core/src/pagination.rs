// ABOUTME: Offset-based pagination types for recipe search
// ABOUTME: Zero-based page requests and page results carrying the total count
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use serde::{Deserialize, Serialize};

use crate::constants::paging::MAX_PAGE;

/// Zero-based page position and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page number
    pub page: i64,
    /// Rows per page
    pub page_size: i64,
}

impl PageRequest {
    /// Build a request for `page` with `page_size` rows
    #[must_use]
    pub const fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    /// Rows to skip before this page
    ///
    /// Saturates instead of overflowing; requests are bounded by
    /// [`MAX_PAGE`] before they reach a query.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.page.saturating_mul(self.page_size)
    }

    /// Whether the page number lies in `0..=MAX_PAGE`
    #[must_use]
    pub const fn is_page_in_range(&self) -> bool {
        self.page >= 0 && self.page <= MAX_PAGE
    }
}

/// A page of rows together with the total number of matches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Zero-based page number
    pub page: i64,
    /// Rows per page
    pub page_size: i64,
    /// Total number of matching rows across all pages
    pub count: i64,
    /// Rows of this page
    pub rows: Vec<T>,
}

impl<T> Page<T> {
    /// Assemble a page from its request, rows and total count
    #[must_use]
    pub const fn new(request: PageRequest, rows: Vec<T>, count: i64) -> Self {
        Self {
            page: request.page,
            page_size: request.page_size,
            count,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_is_zero_based() {
        assert_eq!(PageRequest::new(0, 30).offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 30);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let request = PageRequest::new(i64::MAX, 30);
        assert_eq!(request.offset(), i64::MAX);
        assert!(!request.is_page_in_range());
        assert!(PageRequest::new(MAX_PAGE, 100).is_page_in_range());
        assert!(!PageRequest::new(-1, 10).is_page_in_range());
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let page = Page::new(PageRequest::new(2, 5), vec!["a"], 6);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["pageSize"], 5);
        assert_eq!(json["count"], 6);
    }
}
