//! Cursor pagination types for history listings.

use serde::{Deserialize, Serialize};

/// Request parameters for cursor-paginated queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorRequest {
    /// Maximum number of records to return. Non-positive values yield an empty page.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Id of the last record of the previous page.
    #[serde(default)]
    pub cursor: Option<String>,
}

fn default_limit() -> i64 {
    20
}

impl Default for CursorRequest {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            cursor: None,
        }
    }
}

impl CursorRequest {
    /// Returns the limit for database queries, or `None` when nothing should be fetched.
    #[must_use]
    pub fn fetch_limit(&self) -> Option<u64> {
        u64::try_from(self.limit).ok().filter(|limit| *limit > 0)
    }
}

/// One page of cursor-paginated data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPage<T> {
    /// The records in the current page.
    pub data: Vec<T>,
    /// Cursor for the next page; `None` when the page was not full.
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    /// An empty page with no continuation.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            next_cursor: None,
        }
    }

    /// Builds a page, emitting a cursor only when `limit` records were returned.
    #[must_use]
    pub fn new(data: Vec<T>, limit: u64, cursor_of: impl Fn(&T) -> String) -> Self {
        let full = u64::try_from(data.len()).is_ok_and(|len| len >= limit);
        let next_cursor = if full {
            data.last().map(cursor_of)
        } else {
            None
        };
        Self { data, next_cursor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_request_default() {
        let request = CursorRequest::default();
        assert_eq!(request.limit, 20);
        assert!(request.cursor.is_none());
    }

    #[test]
    fn test_fetch_limit_rejects_non_positive() {
        let zero = CursorRequest {
            limit: 0,
            cursor: None,
        };
        let negative = CursorRequest {
            limit: -3,
            cursor: None,
        };
        assert_eq!(zero.fetch_limit(), None);
        assert_eq!(negative.fetch_limit(), None);
        assert_eq!(CursorRequest::default().fetch_limit(), Some(20));
    }

    #[test]
    fn test_full_page_carries_cursor() {
        let page = CursorPage::new(vec![1, 2, 3], 3, ToString::to_string);
        assert_eq!(page.next_cursor.as_deref(), Some("3"));
    }

    #[test]
    fn test_partial_page_has_no_cursor() {
        let page = CursorPage::new(vec![1, 2], 3, ToString::to_string);
        assert_eq!(page.next_cursor, None);
        assert_eq!(page.data, vec![1, 2]);
    }
}
