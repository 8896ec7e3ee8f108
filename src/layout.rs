use std::collections::BTreeSet;

use tuirealm::ratatui::layout::Rect;

use crate::filter::FilteredItem;
use crate::types::Item;

pub const DEFAULT_MIN_CARD_WIDTH: u16 = 20;
pub const DEFAULT_MAX_CARD_WIDTH: u16 = 36;
pub const DEFAULT_COLUMN_GAP: u16 = 2;

const SIDEBAR_WIDE: u16 = 48;
const SIDEBAR_NARROW: u16 = 40;
const SIDEBAR_MIN: u16 = 36;
const SIDEBAR_NARROW_BREAKPOINT: u16 = 120;

/// Rows used by the column view above the cards for the "+k more" strip.
pub const BOARD_STRIP_HEIGHT: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMetrics {
    pub min_card_width: u16,
    pub max_card_width: u16,
    pub column_gap: u16,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            min_card_width: DEFAULT_MIN_CARD_WIDTH,
            max_card_width: DEFAULT_MAX_CARD_WIDTH,
            column_gap: DEFAULT_COLUMN_GAP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnLayout {
    pub visible_count: usize,
    pub column_width: u16,
    pub hidden_count: usize,
    /// Set when even one column at minimum width does not fit.
    pub fallback: bool,
}

impl ColumnLayout {
    pub fn more_indicator(&self) -> Option<String> {
        (self.hidden_count > 0).then(|| format!("+{} more", self.hidden_count))
    }

    pub fn total_width(&self, gap: u16) -> u16 {
        if self.visible_count == 0 {
            return 0;
        }
        let count = self.visible_count as u16;
        self.column_width
            .saturating_mul(count)
            .saturating_add(gap.saturating_mul(count - 1))
    }
}

/// Splits `width` between `count` columns, dropping trailing columns until the
/// per-column width reaches `min_card_width`.
pub fn compute_column_layout(width: u16, count: usize, metrics: LayoutMetrics) -> ColumnLayout {
    if count == 0 {
        return ColumnLayout::default();
    }

    let min = metrics.min_card_width.max(1);
    let max = metrics.max_card_width.max(min);
    let gap = usize::from(metrics.column_gap);
    let width = usize::from(width);

    for visible in (1..=count).rev() {
        let gaps = gap * (visible - 1);
        if gaps >= width {
            continue;
        }
        let per_column = (width - gaps) / visible;
        if per_column >= usize::from(min) {
            return ColumnLayout {
                visible_count: visible,
                column_width: (per_column as u16).min(max),
                hidden_count: count - visible,
                fallback: false,
            };
        }
    }

    ColumnLayout {
        visible_count: 1,
        column_width: width as u16,
        hidden_count: count - 1,
        fallback: true,
    }
}

/// Rects for each visible column, left to right inside `area`.
pub fn column_rects(area: Rect, layout: &ColumnLayout, gap: u16) -> Vec<Rect> {
    let mut rects = Vec::with_capacity(layout.visible_count);
    let mut x = area.x;
    let right = area.x.saturating_add(area.width);
    for _ in 0..layout.visible_count {
        if x >= right {
            break;
        }
        let width = layout.column_width.min(right - x);
        rects.push(Rect::new(x, area.y, width, area.height));
        x = x.saturating_add(width).saturating_add(gap);
    }
    rects
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub category: String,
    /// Positions into the filtered sequence, in filtered order.
    pub entries: Vec<usize>,
}

/// Groups the filtered sequence into ordered category columns.
///
/// Disabled categories are dropped. With an explicit order, categories follow
/// it and unseen ones are appended alphabetically; otherwise the order is
/// alphabetical.
pub fn group_columns(
    items: &[Item],
    visible: &[FilteredItem],
    is_enabled: impl Fn(&str) -> bool,
    explicit_order: &[String],
) -> Vec<Column> {
    let present: BTreeSet<&str> = visible
        .iter()
        .filter_map(|entry| items.get(entry.item_index))
        .map(|item| item.category.as_str())
        .filter(|category| is_enabled(category))
        .collect();

    resolve_column_order(present.iter().copied(), explicit_order)
        .into_iter()
        .map(|category| {
            let entries = visible
                .iter()
                .enumerate()
                .filter(|(_, entry)| {
                    items
                        .get(entry.item_index)
                        .is_some_and(|item| item.category == category)
                })
                .map(|(position, _)| position)
                .collect();
            Column { category, entries }
        })
        .collect()
}

/// Orders `present` categories by `explicit_order`, appending the rest
/// alphabetically. Entries in `explicit_order` that are not present are skipped.
pub fn resolve_column_order<'a>(
    present: impl IntoIterator<Item = &'a str>,
    explicit_order: &[String],
) -> Vec<String> {
    let present: BTreeSet<&str> = present.into_iter().collect();
    let mut ordered: Vec<String> = Vec::with_capacity(present.len());
    for category in explicit_order {
        if present.contains(category.as_str()) && !ordered.contains(category) {
            ordered.push(category.clone());
        }
    }
    for category in present {
        if !ordered.iter().any(|existing| existing == category) {
            ordered.push(category.to_string());
        }
    }
    ordered
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Left,
    Right,
}

/// Swaps `category` with its neighbouring rendered column and returns the new
/// explicit order.
///
/// `rendered` is the current column order; categories known to the explicit
/// order but not rendered keep their relative positions.
pub fn move_category(
    explicit_order: &[String],
    rendered: &[String],
    category: &str,
    direction: MoveDirection,
) -> Option<Vec<String>> {
    let position = rendered.iter().position(|name| name == category)?;
    let neighbour = match direction {
        MoveDirection::Left => position.checked_sub(1)?,
        MoveDirection::Right => {
            let next = position + 1;
            if next >= rendered.len() {
                return None;
            }
            next
        }
    };
    let neighbour = rendered[neighbour].as_str();

    let mut order: Vec<String> = explicit_order.to_vec();
    for name in rendered {
        if !order.contains(name) {
            order.push(name.clone());
        }
    }

    let from = order.iter().position(|name| name == category)?;
    let to = order.iter().position(|name| name == neighbour)?;
    order.swap(from, to);
    Some(order)
}

/// First column to draw so that `focused` stays inside a window of `visible`
/// columns, moving as little as possible from `previous_start`.
pub fn column_window_start(
    focused: usize,
    visible: usize,
    total: usize,
    previous_start: usize,
) -> usize {
    if visible == 0 || total <= visible {
        return 0;
    }
    let max_start = total - visible;
    let mut start = previous_start.min(max_start);
    if focused < start {
        start = focused;
    } else if focused >= start + visible {
        start = focused + 1 - visible;
    }
    start.min(max_start)
}

/// Screen regions shared by the renderer and the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenAreas {
    pub header: Rect,
    pub banner: Option<Rect>,
    pub main: Rect,
    pub sidebar: Option<Rect>,
    pub footer: Rect,
}

impl ScreenAreas {
    pub fn compute(
        area: Rect,
        show_sidebar: bool,
        has_banner: bool,
        metrics: LayoutMetrics,
    ) -> Self {
        let header = Rect::new(area.x, area.y, area.width, area.height.min(1));
        let mut top = area.y.saturating_add(header.height);
        let bottom = area.y.saturating_add(area.height);

        let banner = if has_banner && top < bottom {
            let banner = Rect::new(area.x, top, area.width, 1);
            top = top.saturating_add(1);
            Some(banner)
        } else {
            None
        };

        let footer_height = u16::from(bottom > top);
        let footer = Rect::new(area.x, bottom - footer_height, area.width, footer_height);
        let body_height = bottom.saturating_sub(footer_height).saturating_sub(top);
        let body = Rect::new(area.x, top, area.width, body_height);

        let sidebar_width = if show_sidebar {
            sidebar_width(area.width, metrics)
        } else {
            None
        };

        match sidebar_width {
            Some(width) => Self {
                header,
                banner,
                main: Rect::new(body.x, body.y, body.width - width, body.height),
                sidebar: Some(Rect::new(
                    body.x + body.width - width,
                    body.y,
                    width,
                    body.height,
                )),
                footer,
            },
            None => Self {
                header,
                banner,
                main: body,
                sidebar: None,
                footer,
            },
        }
    }

    /// Rows available for items inside the bordered list block.
    pub fn list_content_height(&self) -> u16 {
        self.main.height.saturating_sub(2)
    }

    /// Rows available for items inside a bordered column below the strip.
    pub fn column_content_height(&self) -> u16 {
        self.main
            .height
            .saturating_sub(BOARD_STRIP_HEIGHT)
            .saturating_sub(2)
    }

    pub fn board_area(&self) -> Rect {
        let strip = BOARD_STRIP_HEIGHT.min(self.main.height);
        Rect::new(
            self.main.x,
            self.main.y + strip,
            self.main.width,
            self.main.height - strip,
        )
    }
}

/// Sidebar width for a terminal `width` columns wide, or `None` when the
/// remaining space could not hold a single minimum-width column.
pub fn sidebar_width(width: u16, metrics: LayoutMetrics) -> Option<u16> {
    let preferred = if width < SIDEBAR_NARROW_BREAKPOINT {
        SIDEBAR_NARROW
    } else {
        SIDEBAR_WIDE
    };
    let capped = preferred.min(width / 3);
    if capped < SIDEBAR_MIN {
        return None;
    }
    if width.saturating_sub(capped) < metrics.min_card_width.saturating_add(2) {
        return None;
    }
    Some(capped)
}

/// A rect of `percent_x` by `percent_y` of `area`, centred inside it.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x.min(100)) / 100) as u16;
    let height = (u32::from(area.height) * u32::from(percent_y.min(100)) / 100) as u16;
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

pub fn settings_overlay_rect(area: Rect) -> Rect {
    centered_rect(60, 70, area)
}

pub fn edit_overlay_rect(area: Rect) -> Rect {
    centered_rect(60, 60, area)
}

/// Option rows visible in the settings overlay: its border, the section tabs
/// and the hint line are subtracted.
pub fn settings_rows_height(area: Rect) -> usize {
    usize::from(settings_overlay_rect(area).height.saturating_sub(4))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(external_ref: &str, category: &str) -> Item {
        Item {
            external_ref: external_ref.to_string(),
            title: external_ref.to_string(),
            notes: String::new(),
            category: category.to_string(),
            due: None,
            priority: 0,
            completed: false,
        }
    }

    fn visible(items: &[Item]) -> Vec<FilteredItem> {
        (0..items.len())
            .map(|item_index| FilteredItem {
                item_index,
                matched_indices: Vec::new(),
            })
            .collect()
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn narrow_terminal_drops_trailing_columns() {
        let layout = compute_column_layout(80, 5, LayoutMetrics::default());
        assert_eq!(layout.visible_count, 3);
        assert_eq!(layout.column_width, 25);
        assert_eq!(layout.hidden_count, 2);
        assert_eq!(layout.more_indicator().as_deref(), Some("+2 more"));
        assert!(!layout.fallback);
    }

    #[test]
    fn wide_terminal_clamps_to_max_width() {
        let layout = compute_column_layout(200, 2, LayoutMetrics::default());
        assert_eq!(layout.visible_count, 2);
        assert_eq!(layout.column_width, DEFAULT_MAX_CARD_WIDTH);
        assert_eq!(layout.more_indicator(), None);
    }

    #[test]
    fn columns_never_overflow_width() {
        let metrics = LayoutMetrics::default();
        for width in metrics.min_card_width..=240 {
            for count in 1..=12 {
                let layout = compute_column_layout(width, count, metrics);
                assert!(layout.visible_count >= 1);
                assert!(
                    layout.total_width(metrics.column_gap) <= width,
                    "width {width} count {count} -> {layout:?}"
                );
                assert_eq!(layout.visible_count + layout.hidden_count, count);
            }
        }
    }

    #[test]
    fn tiny_terminal_falls_back_to_single_column() {
        let layout = compute_column_layout(12, 4, LayoutMetrics::default());
        assert!(layout.fallback);
        assert_eq!(layout.visible_count, 1);
        assert_eq!(layout.column_width, 12);
        assert_eq!(layout.hidden_count, 3);
    }

    #[test]
    fn zero_columns_yield_empty_layout() {
        assert_eq!(
            compute_column_layout(100, 0, LayoutMetrics::default()),
            ColumnLayout::default()
        );
    }

    #[test]
    fn column_rects_are_spaced_by_gap() {
        let layout = compute_column_layout(80, 3, LayoutMetrics::default());
        let rects = column_rects(Rect::new(0, 0, 80, 10), &layout, 2);
        assert_eq!(rects.len(), 3);
        assert_eq!(rects[1].x, rects[0].x + rects[0].width + 2);
        assert!(rects[2].x + rects[2].width <= 80);
    }

    #[test]
    fn grouping_is_alphabetical_without_explicit_order() {
        let items = vec![item("a", "Work"), item("b", "Home"), item("c", "Work")];
        let columns = group_columns(&items, &visible(&items), |_| true, &[]);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].category, "Home");
        assert_eq!(columns[1].category, "Work");
        assert_eq!(columns[1].entries, vec![0, 2]);
    }

    #[test]
    fn grouping_respects_explicit_order_and_appends_new() {
        let items = vec![item("a", "Work"), item("b", "Home"), item("c", "Errands")];
        let columns = group_columns(&items, &visible(&items), |_| true, &names(&["Work", "Gone"]));
        let order: Vec<&str> = columns.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(order, vec!["Work", "Errands", "Home"]);
    }

    #[test]
    fn grouping_drops_disabled_categories() {
        let items = vec![item("a", "Work"), item("b", "Home")];
        let columns = group_columns(&items, &visible(&items), |name| name != "Home", &[]);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].category, "Work");
    }

    #[test]
    fn move_category_swaps_with_rendered_neighbour() {
        let rendered = names(&["Errands", "Home", "Work"]);
        let order = move_category(&[], &rendered, "Home", MoveDirection::Right)
            .expect("move should succeed");
        assert_eq!(order, names(&["Errands", "Work", "Home"]));

        assert!(move_category(&[], &rendered, "Errands", MoveDirection::Left).is_none());
        assert!(move_category(&[], &rendered, "Work", MoveDirection::Right).is_none());
    }

    #[test]
    fn move_category_skips_hidden_entries() {
        let explicit = names(&["Work", "Hidden", "Home"]);
        let rendered = names(&["Work", "Home"]);
        let order = move_category(&explicit, &rendered, "Home", MoveDirection::Left)
            .expect("move should succeed");
        assert_eq!(order, names(&["Home", "Hidden", "Work"]));
    }

    #[test]
    fn window_start_tracks_focus() {
        assert_eq!(column_window_start(0, 3, 2, 0), 0);
        assert_eq!(column_window_start(4, 3, 6, 0), 2);
        assert_eq!(column_window_start(3, 3, 6, 2), 2);
        assert_eq!(column_window_start(1, 3, 6, 2), 1);
        assert_eq!(column_window_start(0, 3, 6, 9), 0);
    }

    #[test]
    fn screen_areas_partition_the_terminal() {
        let areas = ScreenAreas::compute(
            Rect::new(0, 0, 150, 40),
            true,
            true,
            LayoutMetrics::default(),
        );
        assert_eq!(areas.header.height, 1);
        assert_eq!(areas.banner.map(|b| b.y), Some(1));
        assert_eq!(areas.footer.y, 39);
        assert_eq!(areas.main.y, 2);
        assert_eq!(areas.main.height, 37);
        let sidebar = areas.sidebar.expect("sidebar should fit");
        assert_eq!(sidebar.width, 48);
        assert_eq!(areas.main.width + sidebar.width, 150);
        assert_eq!(areas.list_content_height(), 35);
        assert_eq!(areas.column_content_height(), 34);
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = centered_rect(60, 70, area);
        assert_eq!(rect, Rect::new(20, 6, 60, 28));
        assert_eq!(settings_rows_height(area), 24);
        assert_eq!(settings_rows_height(Rect::new(0, 0, 10, 3)), 0);
    }

    #[test]
    fn sidebar_hides_on_narrow_terminals() {
        assert_eq!(sidebar_width(80, LayoutMetrics::default()), None);
        assert_eq!(sidebar_width(110, LayoutMetrics::default()), Some(36));
        assert_eq!(sidebar_width(119, LayoutMetrics::default()), Some(39));
        let areas = ScreenAreas::compute(
            Rect::new(0, 0, 60, 20),
            true,
            false,
            LayoutMetrics::default(),
        );
        assert!(areas.sidebar.is_none());
        assert_eq!(areas.main.width, 60);
        assert_eq!(areas.main.height, 18);
    }
}
