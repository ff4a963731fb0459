//! The engine's logical position during layout.

/// Tracks the current page index and the row offset within that page.
///
/// The cursor knows nothing about physical pages. The flow engine obtains a
/// page from its provider first and only then calls [`PageCursor::new_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page_index: usize,
    row_offset: usize,
    max_rows: usize,
}

impl PageCursor {
    pub fn new(max_rows: usize) -> Self {
        Self {
            page_index: 0,
            row_offset: 0,
            max_rows,
        }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn remaining_rows(&self) -> usize {
        self.max_rows - self.row_offset
    }

    /// True when the current page has no free row left.
    pub fn is_full(&self) -> bool {
        self.row_offset >= self.max_rows
    }

    /// Move down `n` rows. The caller never advances past capacity.
    pub fn advance_rows(&mut self, n: usize) {
        debug_assert!(
            self.row_offset + n <= self.max_rows,
            "advancing {} rows from {} overflows a {}-row page",
            n,
            self.row_offset,
            self.max_rows
        );
        self.row_offset += n;
    }

    pub fn new_page(&mut self) {
        self.page_index += 1;
        self.row_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_top_of_first_page() {
        let cursor = PageCursor::new(8);
        assert_eq!(cursor.page_index(), 0);
        assert_eq!(cursor.row_offset(), 0);
        assert_eq!(cursor.remaining_rows(), 8);
        assert!(!cursor.is_full());
    }

    #[test]
    fn advancing_consumes_rows() {
        let mut cursor = PageCursor::new(8);
        cursor.advance_rows(3);
        assert_eq!(cursor.remaining_rows(), 5);
        cursor.advance_rows(5);
        assert_eq!(cursor.remaining_rows(), 0);
        assert!(cursor.is_full());
    }

    #[test]
    fn new_page_resets_offset() {
        let mut cursor = PageCursor::new(8);
        cursor.advance_rows(8);
        cursor.new_page();
        assert_eq!(cursor.page_index(), 1);
        assert_eq!(cursor.row_offset(), 0);
        assert_eq!(cursor.remaining_rows(), 8);
    }
}
