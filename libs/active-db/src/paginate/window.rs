//! Windowed page numbers for pagination widgets.
//!
//! ```text
//! 1 2 ... 8 9 (10) 11 12 13 ... 19 20
//! ```
//!
//! Emitted items are `Some(n)` for a page link and `None` for a gap.

use std::iter::FusedIterator;

/// Window thresholds around the edges and the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCfg {
    /// Pages always shown at the start: `1..=left_edge`.
    pub left_edge: u64,
    /// Pages shown before the current one.
    pub left_current: u64,
    /// Pages shown from the current one onwards (current included).
    pub right_current: u64,
    /// Pages always shown at the end.
    pub right_edge: u64,
}

impl Default for WindowCfg {
    fn default() -> Self {
        Self {
            left_edge: 2,
            left_current: 3,
            right_current: 4,
            right_edge: 2,
        }
    }
}

impl WindowCfg {
    fn is_visible(&self, n: u64, page: u64, num_pages: u64) -> bool {
        n <= self.left_edge
            || (n.saturating_add(self.left_current) >= page
                && n < page.saturating_add(self.right_current))
            || n > num_pages.saturating_sub(self.right_edge)
    }
}

/// Lazy iterator over the visible page numbers.
///
/// A clone continues from the same position; ask the paginator for a fresh
/// window to iterate again.
#[derive(Debug, Clone)]
pub struct PageWindow {
    cfg: WindowCfg,
    page: u64,
    num_pages: u64,
    cursor: u64,
    last: u64,
    pending: Option<u64>,
}

impl PageWindow {
    #[must_use]
    pub fn new(page: u64, num_pages: u64, cfg: WindowCfg) -> Self {
        Self {
            cfg,
            page,
            num_pages,
            cursor: 1,
            last: 0,
            pending: None,
        }
    }
}

impl Iterator for PageWindow {
    type Item = Option<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(n) = self.pending.take() {
            self.last = n;
            return Some(Some(n));
        }

        while self.cursor <= self.num_pages {
            let n = self.cursor;
            self.cursor += 1;

            if !self.cfg.is_visible(n, self.page, self.num_pages) {
                continue;
            }
            if self.last + 1 != n {
                // gap marker first, the number on the next call
                self.pending = Some(n);
                return Some(None);
            }
            self.last = n;
            return Some(Some(n));
        }

        None
    }
}

impl FusedIterator for PageWindow {}
