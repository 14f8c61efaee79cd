//! Paged view over a candidate list.
//!
//! The host always receives the full ordered list; paging only decides which
//! slice digit keys address and which candidate is highlighted.

use std::ops::Range;

/// Candidates per page.
pub const PAGE_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct CandidatePager {
    items: Vec<String>,
    page_size: usize,
    page: usize,
    cursor: usize, // within the current page
}

impl CandidatePager {
    pub fn new() -> Self {
        Self::with_page_size(PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page_size: page_size.max(1),
            page: 0,
            cursor: 0,
        }
    }

    /// Replace the list and go back to the first candidate.
    pub fn set_items(&mut self, items: Vec<String>) {
        self.items = items;
        self.page = 0;
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.set_items(Vec::new());
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn num_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    fn page_range(&self) -> Range<usize> {
        let start = (self.page * self.page_size).min(self.items.len());
        let end = (start + self.page_size).min(self.items.len());
        start..end
    }

    /// The candidates on the current page.
    pub fn page_items(&self) -> &[String] {
        &self.items[self.page_range()]
    }

    /// Global index of the highlighted candidate.
    pub fn highlighted_index(&self) -> Option<usize> {
        let index = self.page * self.page_size + self.cursor;
        (index < self.items.len()).then_some(index)
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted_index().and_then(|i| self.get(i))
    }

    /// Global index of slot `slot` on the current page, if occupied.
    pub fn index_on_page(&self, slot: usize) -> Option<usize> {
        let range = self.page_range();
        let index = range.start + slot;
        (index < range.end).then_some(index)
    }

    pub fn page_up(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        self.cursor = 0;
        true
    }

    pub fn page_down(&mut self) -> bool {
        if self.page + 1 >= self.num_pages() {
            return false;
        }
        self.page += 1;
        self.cursor = 0;
        true
    }

    /// Move the highlight back one candidate, crossing pages.
    pub fn cursor_up(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else if self.page_up() {
            self.cursor = self.page_range().len().saturating_sub(1);
            true
        } else {
            false
        }
    }

    /// Move the highlight forward one candidate, crossing pages.
    pub fn cursor_down(&mut self) -> bool {
        if self.cursor + 1 < self.page_range().len() {
            self.cursor += 1;
            true
        } else {
            self.page_down()
        }
    }

    /// `"page/pages"`, or empty when there is at most one page.
    pub fn page_label(&self) -> String {
        if self.num_pages() <= 1 {
            String::new()
        } else {
            format!("{}/{}", self.page + 1, self.num_pages())
        }
    }
}

impl Default for CandidatePager {
    fn default() -> Self {
        Self::new()
    }
}
