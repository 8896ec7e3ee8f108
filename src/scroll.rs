//! Focus and scroll bookkeeping shared by the list and column views.
//!
//! Every entry occupies a contiguous range of lines; the tracker keeps the
//! focused entry's range inside `[scroll_offset, scroll_offset + height)`.

/// Half-open range of content lines occupied by one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Prefix sums of `heights`.
pub fn line_ranges(heights: &[usize]) -> Vec<LineRange> {
    let mut start = 0;
    heights
        .iter()
        .map(|height| {
            let range = LineRange {
                start,
                end: start + height,
            };
            start = range.end;
            range
        })
        .collect()
}

/// Smallest adjustment of `offset` that brings `range` fully into view.
///
/// An entry taller than the viewport is pinned to its first line.
pub fn ensure_visible(offset: usize, range: LineRange, height: usize) -> usize {
    if height == 0 || range.len() >= height {
        return range.start;
    }
    if range.start < offset {
        return range.start;
    }
    if range.end > offset + height {
        return range.end.saturating_sub(height);
    }
    offset
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollCursor {
    pub cursor: usize,
    pub scroll_offset: usize,
}

impl ScrollCursor {
    /// Re-applies the visibility rule for the current cursor.
    pub fn reconcile(&mut self, heights: &[usize], height: usize) {
        if heights.is_empty() {
            self.cursor = 0;
            self.scroll_offset = 0;
            return;
        }
        self.cursor = self.cursor.min(heights.len() - 1);
        let ranges = line_ranges(heights);
        self.scroll_offset = ensure_visible(self.scroll_offset, ranges[self.cursor], height);
    }

    pub fn move_by(&mut self, delta: isize, heights: &[usize], height: usize) {
        if heights.is_empty() {
            return;
        }
        let last = heights.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
        self.reconcile(heights, height);
    }

    pub fn select_first(&mut self, heights: &[usize], height: usize) {
        self.cursor = 0;
        self.reconcile(heights, height);
    }

    pub fn select_last(&mut self, heights: &[usize], height: usize) {
        self.cursor = heights.len().saturating_sub(1);
        self.reconcile(heights, height);
    }

    /// Moves by roughly one viewport worth of entries.
    pub fn page(&mut self, forward: bool, heights: &[usize], height: usize) {
        if heights.is_empty() {
            return;
        }
        let mut remaining = height;
        let mut steps = 0usize;
        let mut index = self.cursor;
        loop {
            let next = if forward {
                index + 1
            } else {
                match index.checked_sub(1) {
                    Some(next) => next,
                    None => break,
                }
            };
            let Some(next_height) = heights.get(next) else {
                break;
            };
            if *next_height > remaining && steps > 0 {
                break;
            }
            remaining = remaining.saturating_sub(*next_height);
            index = next;
            steps += 1;
        }
        self.cursor = index;
        self.reconcile(heights, height);
    }

    /// Index of the first entry intersecting the viewport.
    pub fn first_visible(&self, heights: &[usize]) -> usize {
        line_ranges(heights)
            .iter()
            .position(|range| range.end > self.scroll_offset)
            .unwrap_or(0)
    }
}

/// Cursor state for a single column, keyed by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCursor {
    pub category: String,
    pub cursor: ScrollCursor,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnViewState {
    pub columns: Vec<ColumnCursor>,
    pub focused: usize,
    pub window_start: usize,
}

impl ColumnViewState {
    /// Rebuilds the per-column entries for `categories`, keeping the cursor of
    /// any category that survives and following the focused category.
    pub fn reconcile_categories(&mut self, categories: &[String]) {
        let focused_category = self
            .columns
            .get(self.focused)
            .map(|column| column.category.clone());

        let mut previous = std::mem::take(&mut self.columns);
        self.columns = categories
            .iter()
            .map(|category| {
                match previous.iter().position(|column| &column.category == category) {
                    Some(index) => previous.swap_remove(index),
                    None => ColumnCursor {
                        category: category.clone(),
                        cursor: ScrollCursor::default(),
                    },
                }
            })
            .collect();

        self.focused = focused_category
            .and_then(|category| categories.iter().position(|name| *name == category))
            .unwrap_or_else(|| self.focused.min(categories.len().saturating_sub(1)));
        if self.columns.is_empty() {
            self.focused = 0;
            self.window_start = 0;
        }
    }

    pub fn focused_column(&self) -> Option<&ColumnCursor> {
        self.columns.get(self.focused)
    }

    pub fn focused_column_mut(&mut self) -> Option<&mut ColumnCursor> {
        self.columns.get_mut(self.focused)
    }

    pub fn focused_category(&self) -> Option<&str> {
        self.focused_column().map(|column| column.category.as_str())
    }

    pub fn cursor_for(&self, category: &str) -> Option<&ScrollCursor> {
        self.columns
            .iter()
            .find(|column| column.category == category)
            .map(|column| &column.cursor)
    }

    /// Back to the first column with every cursor at the top.
    pub fn reset(&mut self) {
        self.focused = 0;
        self.window_start = 0;
        for column in &mut self.columns {
            column.cursor = ScrollCursor::default();
        }
    }

    pub fn focus_left(&mut self) -> bool {
        if self.focused == 0 {
            return false;
        }
        self.focused -= 1;
        true
    }

    pub fn focus_right(&mut self) -> bool {
        if self.focused + 1 >= self.columns.len() {
            return false;
        }
        self.focused += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn assert_focus_visible(cursor: &ScrollCursor, heights: &[usize], height: usize) {
        let range = line_ranges(heights)[cursor.cursor];
        assert!(
            range.start >= cursor.scroll_offset && range.end <= cursor.scroll_offset + height,
            "range {range:?} outside [{}, {})",
            cursor.scroll_offset,
            cursor.scroll_offset + height
        );
    }

    #[test]
    fn ensure_visible_scrolls_minimally() {
        let range = LineRange { start: 8, end: 12 };
        assert_eq!(ensure_visible(0, range, 10), 2);
        assert_eq!(ensure_visible(4, range, 10), 4);
        assert_eq!(ensure_visible(10, range, 10), 8);
        assert_eq!(ensure_visible(5, LineRange { start: 0, end: 20 }, 10), 0);
    }

    #[test]
    fn line_ranges_are_prefix_sums() {
        let ranges = line_ranges(&[3, 5, 4]);
        assert_eq!(ranges[0], LineRange { start: 0, end: 3 });
        assert_eq!(ranges[2], LineRange { start: 8, end: 12 });
    }

    #[test]
    fn navigation_keeps_focus_in_view() {
        let heights = [3, 6, 4, 3, 5, 6, 3, 4, 3, 6, 3];
        let height = 10;
        let mut cursor = ScrollCursor::default();
        let steps: [isize; 14] = [1, 1, 1, 1, 1, 1, -1, -1, 1, 1, 1, 1, 1, -1];
        for delta in steps {
            cursor.move_by(delta, &heights, height);
            assert_focus_visible(&cursor, &heights, height);
        }
        cursor.select_last(&heights, height);
        assert_focus_visible(&cursor, &heights, height);
        cursor.page(false, &heights, height);
        assert_focus_visible(&cursor, &heights, height);
        cursor.select_first(&heights, height);
        assert_eq!(cursor.scroll_offset, 0);
    }

    #[test]
    fn reconcile_handles_growing_preceding_entries() {
        let mut cursor = ScrollCursor {
            cursor: 2,
            scroll_offset: 0,
        };
        cursor.reconcile(&[3, 3, 3], 9);
        assert_eq!(cursor.scroll_offset, 0);

        cursor.reconcile(&[6, 3, 3], 9);
        assert_eq!(cursor.scroll_offset, 3);
        assert_focus_visible(&cursor, &[6, 3, 3], 9);
    }

    #[test]
    fn reconcile_clamps_cursor_after_shrink() {
        let mut cursor = ScrollCursor {
            cursor: 7,
            scroll_offset: 20,
        };
        cursor.reconcile(&[3, 3], 10);
        assert_eq!(cursor.cursor, 1);
        assert_eq!(cursor.scroll_offset, 3);
    }

    #[test]
    fn page_moves_by_viewport() {
        let heights = [3; 10];
        let mut cursor = ScrollCursor::default();
        cursor.page(true, &heights, 9);
        assert_eq!(cursor.cursor, 3);
        cursor.page(false, &heights, 9);
        assert_eq!(cursor.cursor, 0);
    }

    #[test]
    fn column_cursors_follow_category_identity() {
        let mut state = ColumnViewState::default();
        state.reconcile_categories(&names(&["Home", "Work"]));
        state.focused = 1;
        state.columns[1].cursor.cursor = 4;

        state.reconcile_categories(&names(&["Errands", "Home", "Work"]));
        assert_eq!(state.focused_category(), Some("Work"));
        assert_eq!(state.cursor_for("Work").map(|c| c.cursor), Some(4));
        assert_eq!(state.columns.len(), 3);

        state.reconcile_categories(&names(&["Home"]));
        assert_eq!(state.focused, 0);
        assert_eq!(state.focused_category(), Some("Home"));

        state.reconcile_categories(&[]);
        assert!(state.focused_column().is_none());
    }

    #[test]
    fn reset_returns_to_first_column() {
        let mut state = ColumnViewState::default();
        state.reconcile_categories(&names(&["Home", "Work"]));
        state.focused = 1;
        state.columns[0].cursor.cursor = 2;
        state.reset();
        assert_eq!(state.focused, 0);
        assert_eq!(state.columns[0].cursor, ScrollCursor::default());
    }
}
