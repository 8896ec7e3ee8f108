use super::{App, ViewMode};
use crate::layout::{MoveDirection, column_window_start, move_category};
use crate::scroll::ScrollCursor;

impl App {
    /// Flips between list and columns. Columns always start at the first
    /// column; the list keeps its own cursor.
    pub(crate) fn toggle_view(&mut self) {
        self.view_mode = self.view_mode.toggled();
        if self.view_mode == ViewMode::Column {
            self.column_state.reset();
        }
        self.rederive();
    }

    pub(crate) fn focus_column(&mut self, direction: MoveDirection) {
        if self.view_mode != ViewMode::Column {
            return;
        }
        let moved = match direction {
            MoveDirection::Left => self.column_state.focus_left(),
            MoveDirection::Right => self.column_state.focus_right(),
        };
        if !moved {
            return;
        }
        self.column_state.window_start = column_window_start(
            self.column_state.focused,
            self.column_layout.visible_count,
            self.columns.len(),
            self.column_state.window_start,
        );
        // The column's own offset is kept unless it no longer shows its cursor.
        self.with_focused_cursor(|cursor, heights, height| cursor.reconcile(heights, height));
    }

    pub(crate) fn move_selection(&mut self, delta: isize) {
        self.with_focused_cursor(|cursor, heights, height| cursor.move_by(delta, heights, height));
    }

    pub(crate) fn select_edge(&mut self, last: bool) {
        self.with_focused_cursor(|cursor, heights, height| {
            if last {
                cursor.select_last(heights, height);
            } else {
                cursor.select_first(heights, height);
            }
        });
    }

    pub(crate) fn page_selection(&mut self, forward: bool) {
        self.with_focused_cursor(|cursor, heights, height| cursor.page(forward, heights, height));
    }

    /// Swaps the focused column with its neighbour and saves the new order.
    pub(crate) fn move_focused_column(&mut self, direction: MoveDirection) {
        if self.view_mode != ViewMode::Column {
            return;
        }
        let Some(category) = self.column_state.focused_category().map(str::to_string) else {
            return;
        };
        let rendered: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.category.clone())
            .collect();
        let Some(order) = move_category(&self.config.column_order, &rendered, &category, direction)
        else {
            return;
        };

        self.config.column_order = order;
        self.persist_config();
        self.rederive();
    }

    fn with_focused_cursor(&mut self, apply: impl FnOnce(&mut ScrollCursor, &[usize], usize)) {
        let areas = self.screen_areas();
        match self.view_mode {
            ViewMode::List => {
                let heights = self.list_heights();
                apply(
                    &mut self.list_state,
                    &heights,
                    usize::from(areas.list_content_height()),
                );
            }
            ViewMode::Column => {
                let Some(category) = self.column_state.focused_category() else {
                    return;
                };
                let heights = self
                    .columns
                    .iter()
                    .find(|column| column.category == category)
                    .map(|column| self.column_heights(column))
                    .unwrap_or_default();
                if let Some(column) = self.column_state.focused_column_mut() {
                    apply(
                        &mut column.cursor,
                        &heights,
                        usize::from(areas.column_content_height()),
                    );
                }
            }
        }
    }
}
