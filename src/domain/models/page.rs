//! One page of a cursor-paginated crawl.

/// Records of one page plus the position to continue from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, next_cursor: Option<String>, has_more: bool) -> Self {
        Self {
            records,
            next_cursor,
            has_more,
        }
    }

    /// Terminal page of a history.
    pub fn last(records: Vec<T>) -> Self {
        Self::new(records, None, false)
    }

    pub fn is_end_of_history(&self) -> bool {
        !self.has_more
    }
}
