/// LiveGrid Pagination Cursor Manager
///
/// Keyset pagination: each page is fetched by asking the store for
/// `limit + 1` rows starting at the cursor row. When the extra row comes back,
/// it is removed from the page and its id becomes the cursor of the next page.
/// No extra row means the stream is exhausted.
///
/// Cursors are opaque to callers. Internally a cursor is the id of the first
/// row of the page it resumes.

use crate::config::EngineConfig;
use crate::store::StoredRow;

/// A resolved page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    limit: usize,
    cursor: Option<String>,
}

impl PageRequest {
    pub fn new(limit: Option<usize>, cursor: Option<String>, config: &EngineConfig) -> Self {
        PageRequest {
            limit: config.clamp_limit(limit),
            cursor: cursor.filter(|c| !c.is_empty()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Rows to ask the store for: one more than the page holds
    pub fn fetch_size(&self) -> usize {
        self.limit + 1
    }
}

/// One page cut from a probe fetch
#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow {
    pub rows: Vec<StoredRow>,
    pub next_cursor: Option<String>,
}

impl PageWindow {
    /// Cut a page from rows fetched with `PageRequest::fetch_size`
    pub fn from_probe(mut rows: Vec<StoredRow>, limit: usize) -> Self {
        let next_cursor = if rows.len() > limit {
            rows.truncate(limit + 1);
            rows.pop().map(|row| row.id)
        } else {
            None
        };
        PageWindow { rows, next_cursor }
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn rows(n: usize) -> Vec<StoredRow> {
        (0..n)
            .map(|i| StoredRow {
                id: format!("r{}", i),
                table_id: "t".to_string(),
                row_order: i as u64 + 1,
                cells: HashMap::new(),
            })
            .collect()
    }

    #[test]
    fn test_fetch_size_probes_one_extra() {
        let page = PageRequest::new(Some(10), None, &EngineConfig::default());
        assert_eq!(page.fetch_size(), 11);
        assert_eq!(page.cursor(), None);
    }

    #[test]
    fn test_limit_is_clamped() {
        let config = EngineConfig::default();
        assert_eq!(PageRequest::new(Some(0), None, &config).limit(), 1);
        assert_eq!(PageRequest::new(Some(100_000), None, &config).limit(), 1000);
        assert_eq!(PageRequest::new(None, None, &config).limit(), 50);
    }

    #[test]
    fn test_empty_cursor_means_first_page() {
        let page = PageRequest::new(None, Some(String::new()), &EngineConfig::default());
        assert_eq!(page.cursor(), None);
    }

    #[test]
    fn test_probe_with_more_rows() {
        let window = PageWindow::from_probe(rows(4), 3);
        assert_eq!(window.rows.len(), 3);
        assert_eq!(window.next_cursor.as_deref(), Some("r3"));
        assert!(!window.is_last());
    }

    #[test]
    fn test_probe_at_end() {
        let window = PageWindow::from_probe(rows(3), 3);
        assert_eq!(window.rows.len(), 3);
        assert!(window.is_last());

        let window = PageWindow::from_probe(Vec::new(), 3);
        assert!(window.rows.is_empty());
        assert!(window.is_last());
    }
}
