//! Cursor pagination for Kit v4 list endpoints
//!
//! Kit returns a `pagination` object next to each page of results. The
//! `end_cursor` of one page is passed as `after` to fetch the next.

use serde::{Deserialize, Serialize};

/// Maximum page size supported by the Kit API.
/// Using this as default minimizes API calls.
pub const MAX_PER_PAGE: usize = 1000;

/// Pagination parameters for list requests.
#[derive(Debug, Clone, Default)]
pub struct PaginationParams {
    /// Number of items per page (default: 1000, max: 1000)
    pub per_page: Option<usize>,
    /// Cursor of the last item of the previous page
    pub after: Option<String>,
}

impl PaginationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn per_page(mut self, size: usize) -> Self {
        self.per_page = Some(size.min(MAX_PER_PAGE));
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    /// Convert to query string parameters.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        let size = self.per_page.unwrap_or(MAX_PER_PAGE);
        params.push(("per_page", size.to_string()));

        if let Some(ref cursor) = self.after {
            params.push(("after", cursor.clone()));
        }

        params
    }
}

/// Pagination metadata returned with every page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CursorPagination {
    #[serde(default)]
    pub has_previous_page: bool,

    #[serde(default)]
    pub has_next_page: bool,

    #[serde(default)]
    pub start_cursor: Option<String>,

    #[serde(default)]
    pub end_cursor: Option<String>,

    #[serde(default)]
    pub per_page: Option<usize>,
}

impl CursorPagination {
    /// Cursor to request the following page with, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}
