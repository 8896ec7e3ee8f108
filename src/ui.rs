use chrono::{Datelike, Local};
use tuirealm::ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::app::{
    App, EditField, EditOverlayState, Overlay, SettingsOverlayState, SettingsSection, ViewMode,
};
use crate::calendar::{WEEKDAY_HEADER, due_days, month_grid};
use crate::config::DAYS_AHEAD_OPTIONS;
use crate::filter::FilteredItem;
use crate::keybindings::KeyAction;
use crate::layout::{
    ScreenAreas, column_rects, edit_overlay_rect, settings_overlay_rect, settings_rows_height,
};
use crate::scroll::{ScrollCursor, line_ranges};
use crate::theme::Theme;
use crate::types::ItemView;

/// Border plus three lines of notes.
const NOTES_FIELD_HEIGHT: u16 = 5;

const FOOTER_ACTIONS: [KeyAction; 7] = [
    KeyAction::ToggleView,
    KeyAction::StartSearch,
    KeyAction::OpenEdit,
    KeyAction::Complete,
    KeyAction::OpenSettings,
    KeyAction::Refresh,
    KeyAction::Quit,
];

pub fn render(frame: &mut Frame<'_>, app: &App) {
    let areas = ScreenAreas::compute(
        frame.area(),
        app.config.show_sidebar,
        app.banner.is_some(),
        app.config.layout_metrics(),
    );

    render_header(frame, areas.header, app);
    if let Some(banner) = areas.banner {
        render_banner(frame, banner, app);
    }
    match app.view_mode {
        ViewMode::List => render_list(frame, areas.main, app),
        ViewMode::Column => render_columns(frame, &areas, app),
    }
    if let Some(sidebar) = areas.sidebar {
        render_sidebar(frame, sidebar, app);
    }
    render_footer(frame, areas.footer, app);

    match &app.overlay {
        Overlay::None => {}
        Overlay::Settings(state) => render_settings(frame, state, app),
        Overlay::Edit(state) => render_edit(frame, state, &app.theme),
    }
}

fn render_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let theme = &app.theme;
    let mut spans = vec![Span::styled(
        " Reminders ",
        Style::default()
            .fg(theme.base.header)
            .add_modifier(Modifier::BOLD),
    )];
    for mode in [ViewMode::List, ViewMode::Column] {
        let style = if mode == app.view_mode {
            Style::default()
                .fg(theme.interactive.focus)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(theme.base.text_muted)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(mode.label(), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    let mut status = Vec::new();
    if app.filter.editing || app.filter.is_active() {
        let cursor = if app.filter.editing { "_" } else { "" };
        status.push(Span::styled(
            format!("/{}{cursor}  ", app.filter.query),
            Style::default().fg(theme.base.accent),
        ));
    }
    if app.is_busy() {
        status.push(Span::styled(
            "syncing  ",
            Style::default().fg(theme.base.text_muted),
        ));
    }
    status.push(Span::styled(
        format!("{} reminders ", app.visible.len()),
        Style::default().fg(theme.base.text_muted),
    ));
    frame.render_widget(
        Paragraph::new(Line::from(status)).alignment(Alignment::Right),
        area,
    );
}

fn render_banner(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let text = format!(
        " ! {}  (press r to retry) ",
        app.banner.as_deref().unwrap_or_default()
    );
    frame.render_widget(
        Paragraph::new(text).style(
            Style::default()
                .fg(app.theme.base.danger)
                .add_modifier(Modifier::BOLD),
        ),
        area,
    );
}

fn render_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let theme = &app.theme;
    let line = if let Some(notice) = &app.notice {
        let color = if notice.is_error {
            theme.base.danger
        } else {
            theme.base.accent
        };
        Line::from(Span::styled(
            format!(" {} ", notice.text),
            Style::default().fg(color),
        ))
    } else if app.filter.editing {
        Line::from(Span::styled(
            " type to filter  Enter: keep  Esc: cancel  Up/Down: move ",
            Style::default().fg(theme.base.text_muted),
        ))
    } else {
        let hints: Vec<String> = app
            .keybindings
            .hints(&FOOTER_ACTIONS)
            .into_iter()
            .map(|(key, description)| format!("{key}: {description}"))
            .collect();
        Line::from(Span::styled(
            format!(" {} ", hints.join("  ")),
            Style::default().fg(theme.base.text_muted),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn empty_message(app: &App) -> String {
    if app.is_loading() {
        "Loading reminders…".to_string()
    } else if app.filter.is_active() {
        format!("No reminders match \"{}\"", app.filter.query.trim())
    } else {
        "No reminders".to_string()
    }
}

fn render_empty_state(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(app.theme.interactive.border));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }
    let middle = Rect::new(inner.x, inner.y + inner.height / 2, inner.width, 1);
    frame.render_widget(
        Paragraph::new(empty_message(app))
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.base.text_muted)),
        middle,
    );
}

fn render_list(frame: &mut Frame<'_>, area: Rect, app: &App) {
    if app.visible.is_empty() {
        render_empty_state(frame, area, app);
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(app.theme.interactive.border))
        .title(format!(" All reminders ({}) ", app.visible.len()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let entries: Vec<&FilteredItem> = app.visible.iter().collect();
    let lines = visible_lines(app, &entries, &app.list_state, inner.height, true);
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_columns(frame: &mut Frame<'_>, areas: &ScreenAreas, app: &App) {
    if app.columns.is_empty() {
        render_empty_state(frame, areas.main, app);
        return;
    }

    let theme = &app.theme;
    let strip = Rect::new(
        areas.main.x,
        areas.main.y,
        areas.main.width,
        areas.main.height.min(1),
    );
    let layout = &app.column_layout;
    let position = format!(
        " {} of {} lists",
        app.column_state.focused + 1,
        app.columns.len()
    );
    frame.render_widget(
        Paragraph::new(position).style(Style::default().fg(theme.base.text_muted)),
        strip,
    );
    if let Some(more) = layout.more_indicator() {
        frame.render_widget(
            Paragraph::new(format!("{more} "))
                .alignment(Alignment::Right)
                .style(Style::default().fg(theme.base.accent)),
            strip,
        );
    }

    let gap = app.config.layout.column_gap;
    let rects = column_rects(areas.board_area(), layout, gap);
    let start = app.column_state.window_start;
    for (offset, rect) in rects.into_iter().enumerate() {
        let index = start + offset;
        let Some(column) = app.columns.get(index) else {
            break;
        };
        let focused = index == app.column_state.focused;
        let list_color = theme.list_color(&app.list_color_name(&column.category));
        let border_style = if focused {
            Style::default().fg(theme.interactive.focus)
        } else {
            Style::default().fg(theme.interactive.border)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(if focused {
                BorderType::Double
            } else {
                BorderType::Rounded
            })
            .border_style(border_style)
            .title(Span::styled(
                format!(" {} ({}) ", column.category, column.entries.len()),
                Style::default().fg(list_color).add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(rect);
        frame.render_widget(block, rect);

        let entries: Vec<&FilteredItem> = column
            .entries
            .iter()
            .filter_map(|position| app.visible.get(*position))
            .collect();
        let cursor = app
            .column_state
            .cursor_for(&column.category)
            .copied()
            .unwrap_or_default();
        let focus = if focused { cursor } else { unfocused(cursor) };
        let lines = visible_lines(app, &entries, &focus, inner.height, false);
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

/// Keeps the offset of a column that does not own focus but hides its cursor.
fn unfocused(cursor: ScrollCursor) -> ScrollCursor {
    ScrollCursor {
        cursor: usize::MAX,
        scroll_offset: cursor.scroll_offset,
    }
}

/// The lines of `entries` that fall inside `[scroll_offset, scroll_offset + height)`.
fn visible_lines(
    app: &App,
    entries: &[&FilteredItem],
    cursor: &ScrollCursor,
    height: u16,
    show_category: bool,
) -> Vec<Line<'static>> {
    let views: Vec<ItemView> = entries
        .iter()
        .filter_map(|entry| app.item_view(entry))
        .collect();
    let heights: Vec<usize> = views.iter().map(ItemView::line_height).collect();
    let top = cursor.scroll_offset;
    let bottom = top + usize::from(height);

    let mut lines = Vec::new();
    for (index, (view, range)) in views.iter().zip(line_ranges(&heights)).enumerate() {
        if range.end <= top {
            continue;
        }
        if range.start >= bottom {
            break;
        }
        let item_lines = item_lines(view, &app.theme, index == cursor.cursor, show_category);
        for (line_number, line) in item_lines.into_iter().enumerate() {
            let absolute = range.start + line_number;
            if absolute >= top && absolute < bottom {
                lines.push(line);
            }
        }
    }
    lines
}

/// Exactly `view.line_height()` lines: title, due line, notes, separator.
fn item_lines(
    view: &ItemView,
    theme: &Theme,
    focused: bool,
    show_category: bool,
) -> Vec<Line<'static>> {
    let base = if focused {
        Style::default()
            .bg(theme.interactive.selected_bg)
            .fg(theme.base.text)
    } else {
        Style::default().fg(theme.base.text)
    };
    let marker = if focused { "▌" } else { " " };

    let mut title = vec![
        Span::styled(marker.to_string(), Style::default().fg(theme.interactive.focus)),
        Span::styled(
            "● ".to_string(),
            Style::default().fg(theme.list_color(&view.badge_color)),
        ),
    ];
    title.extend(highlighted_title(view, base, theme.base.highlight));

    let mut due = format!("   {}", view.subtitle);
    if show_category {
        due.push_str(&format!(" · {}", view.category));
    }
    let mut lines = vec![
        Line::from(title),
        Line::from(Span::styled(
            due,
            Style::default().fg(theme.urgency_color(view.urgency)),
        )),
    ];
    for note in &view.note_lines {
        lines.push(Line::from(Span::styled(
            format!("   {note}"),
            Style::default().fg(theme.base.text_muted),
        )));
    }
    lines.push(Line::default());
    lines
}

fn highlighted_title(view: &ItemView, base: Style, highlight: Color) -> Vec<Span<'static>> {
    let matched = base.fg(highlight).add_modifier(Modifier::BOLD);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_matched = false;
    for (index, ch) in view.title.chars().enumerate() {
        let is_match = view.highlight.binary_search(&index).is_ok();
        if is_match != run_matched && !run.is_empty() {
            let style = if run_matched { matched } else { base };
            spans.push(Span::styled(std::mem::take(&mut run), style));
        }
        run_matched = is_match;
        run.push(ch);
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, if run_matched { matched } else { base }));
    }
    spans
}

fn render_sidebar(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.interactive.border))
        .title(" Calendar ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let today = app.now.with_timezone(&Local).date_naive();
    let grid = month_grid(today);
    let marked = due_days(app.store.items(), &grid, &Local);

    let mut lines = vec![
        Line::from(Span::styled(
            grid.title.clone(),
            Style::default()
                .fg(theme.base.header)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            WEEKDAY_HEADER,
            Style::default().fg(theme.base.text_muted),
        )),
    ];
    for week in &grid.weeks {
        let mut spans = Vec::new();
        for (slot, day) in week.iter().enumerate() {
            if slot > 0 {
                spans.push(Span::raw(" "));
            }
            let Some(day) = day else {
                spans.push(Span::raw("  "));
                continue;
            };
            let mut style = Style::default().fg(theme.base.text);
            if marked.contains(day) {
                style = style.fg(theme.base.accent).add_modifier(Modifier::BOLD);
            }
            if *day == today.day() {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(format!("{day:>2}"), style));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Upcoming",
        Style::default()
            .fg(theme.base.header)
            .add_modifier(Modifier::BOLD),
    )));
    for (band, count) in app.urgency_counts() {
        lines.push(Line::from(vec![
            Span::styled("● ", Style::default().fg(theme.urgency_color(band))),
            Span::styled(
                format!("{:<12}", band.label()),
                Style::default().fg(theme.base.text),
            ),
            Span::styled(
                count.to_string(),
                Style::default().fg(theme.base.text_muted),
            ),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn days_label(days: u32) -> String {
    match days {
        0 => "All reminders".to_string(),
        1 => "Next 1 day".to_string(),
        days => format!("Next {days} days"),
    }
}

fn render_settings(frame: &mut Frame<'_>, state: &SettingsOverlayState, app: &App) {
    let theme = &app.theme;
    let area = settings_overlay_rect(frame.area());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(theme.interactive.focus))
        .style(Style::default().bg(theme.dialog.surface))
        .title(" Settings ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    let mut tabs = Vec::new();
    for section in SettingsSection::ALL {
        let style = if section == state.section {
            Style::default()
                .fg(theme.interactive.focus)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(theme.base.text_muted)
        };
        tabs.push(Span::styled(format!(" {} ", section.title()), style));
    }
    frame.render_widget(Paragraph::new(Line::from(tabs)), chunks[0]);

    let rows_height = settings_rows_height(frame.area());
    let rows: Vec<Line> = (0..state.row_count())
        .skip(state.rows.scroll_offset)
        .take(rows_height)
        .map(|row| {
            let text = settings_row_text(state, row);
            let style = if row == state.rows.cursor {
                Style::default()
                    .bg(theme.interactive.selected_bg)
                    .fg(theme.base.text)
            } else {
                Style::default().fg(theme.base.text)
            };
            let mut spans = vec![Span::styled(text, style)];
            if state.section == SettingsSection::Colors
                && let Some(list) = state.lists.get(row)
            {
                let color = state.draft.color_for(list, row);
                spans.insert(
                    0,
                    Span::styled("● ", Style::default().fg(theme.list_color(&color))),
                );
            }
            Line::from(spans)
        })
        .collect();
    let rows = if rows.is_empty() {
        vec![Line::from(Span::styled(
            "No lists yet",
            Style::default().fg(theme.base.text_muted),
        ))]
    } else {
        rows
    };
    frame.render_widget(Paragraph::new(rows), chunks[1]);

    frame.render_widget(
        Paragraph::new("Space: toggle  Tab: section  Enter: save  Esc: cancel")
            .style(Style::default().fg(theme.base.text_muted)),
        chunks[2],
    );
}

fn settings_row_text(state: &SettingsOverlayState, row: usize) -> String {
    let draft = &state.draft;
    match state.section {
        SettingsSection::DaysAhead => {
            let days = DAYS_AHEAD_OPTIONS.get(row).copied().unwrap_or_default();
            let mark = if draft.days_ahead == days { "(•)" } else { "( )" };
            format!("{mark} {}", days_label(days))
        }
        SettingsSection::Lists => {
            let list = state.lists.get(row).map(String::as_str).unwrap_or_default();
            let mark = if draft.is_enabled(list) { "[x]" } else { "[ ]" };
            format!("{mark} {list}")
        }
        SettingsSection::Colors => {
            let list = state.lists.get(row).map(String::as_str).unwrap_or_default();
            format!("{list}  {}", draft.color_for(list, row))
        }
        SettingsSection::Display => {
            let mark = if draft.show_sidebar { "[x]" } else { "[ ]" };
            format!("{mark} Show calendar sidebar")
        }
    }
}

fn render_edit(frame: &mut Frame<'_>, state: &EditOverlayState, theme: &Theme) {
    let area = edit_overlay_rect(frame.area());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(theme.interactive.focus))
        .style(Style::default().bg(theme.dialog.surface))
        .title(" Edit reminder ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(NOTES_FIELD_HEIGHT),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let focused = state.focused_field;
    let fields = [
        (" List ", &state.list_input, EditField::List),
        (" Title ", &state.title_input, EditField::Title),
        (" Notes ", &state.notes_input, EditField::Notes),
    ];
    for (area, (label, value, field)) in chunks.iter().zip(fields) {
        render_input_field(frame, *area, label, value, focused == field, theme);
    }
    let toggles = [
        ("Completed", state.completed, EditField::Completed),
        ("Delete", state.delete, EditField::Delete),
    ];
    for (area, (label, checked, field)) in chunks[3..5].iter().zip(toggles) {
        render_checkbox(frame, *area, label, checked, focused == field, theme);
    }

    if let Some(error) = &state.error_message {
        frame.render_widget(
            Paragraph::new(error.as_str()).style(Style::default().fg(theme.dialog.error)),
            chunks[5],
        );
    }
    frame.render_widget(
        Paragraph::new("Tab: next field  Space: toggle  Alt+Enter: new line  Enter: save  Esc: cancel")
            .style(Style::default().fg(theme.base.text_muted)),
        chunks[6],
    );
}

fn render_input_field(
    frame: &mut Frame<'_>,
    area: Rect,
    label: &str,
    value: &str,
    is_focused: bool,
    theme: &Theme,
) {
    let border = if is_focused {
        theme.interactive.focus
    } else {
        theme.interactive.border
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(label.to_string())
        .border_style(Style::default().fg(border));
    let text = if is_focused {
        format!("{value}_")
    } else {
        value.to_string()
    };
    // Keep the last lines, where typing happens, in view.
    let rows = area.height.saturating_sub(2);
    let lines = u16::try_from(text.split('\n').count()).unwrap_or(u16::MAX);
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().bg(theme.dialog.input_bg).fg(theme.base.text))
            .scroll((lines.saturating_sub(rows), 0))
            .block(block),
        area,
    );
}

fn render_checkbox(
    frame: &mut Frame<'_>,
    area: Rect,
    label: &str,
    checked: bool,
    is_focused: bool,
    theme: &Theme,
) {
    let check_mark = if checked { "[x]" } else { "[ ]" };
    let style = if is_focused {
        Style::default().fg(theme.interactive.focus)
    } else {
        Style::default().fg(theme.base.text)
    };
    frame.render_widget(
        Paragraph::new(format!("{check_mark} {label}")).style(style),
        area,
    );
}
