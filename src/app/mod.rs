pub mod jobs;
pub mod messages;
pub mod state;

mod input;
mod navigation;
mod overlays;
mod update;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use tracing::{info, warn};
use tuirealm::ratatui::layout::Rect;

pub use self::jobs::{Job, JobRunner, MutationPlan, RefreshCompletion, RefreshCoordinator};
pub use self::messages::Message;
pub use self::state::{
    EditField, EditOverlayState, FilterState, Notice, Overlay, SettingsDraft,
    SettingsOverlayState, SettingsSection, ViewMode,
};

use crate::calendar::format_due;
use crate::commands::{CustomCommand, parse_commands, render_command};
use crate::config::Config;
use crate::filter::{FilteredItem, filter_candidates, within_days_ahead};
use crate::keybindings::Keybindings;
use crate::layout::{
    Column, ColumnLayout, ScreenAreas, column_window_start, compute_column_layout,
    group_columns, settings_rows_height,
};
use crate::scroll::{ColumnViewState, ScrollCursor};
use crate::store::ItemStore;
use crate::theme::{Theme, ThemePreset, default_list_color};
use crate::types::{Item, ItemView, UrgencyBand, countdown_text};

const NOTICE_DURATION: Duration = Duration::from_secs(4);

/// Focused items by external ref: the list cursor and each column's cursor.
#[derive(Debug, Default)]
struct FocusRefs {
    list: Option<String>,
    columns: HashMap<String, String>,
}

pub struct App {
    pub should_quit: bool,
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub theme: Theme,
    pub keybindings: Keybindings,
    pub viewport: (u16, u16),
    pub store: ItemStore,
    pub filter: FilterState,
    pub view_mode: ViewMode,
    pub list_state: ScrollCursor,
    pub column_state: ColumnViewState,
    pub overlay: Overlay,
    /// Filtered, ordered sequence shared by both view modes.
    pub visible: Vec<FilteredItem>,
    pub columns: Vec<Column>,
    pub column_layout: ColumnLayout,
    pub banner: Option<String>,
    pub notice: Option<Notice>,
    pub now: DateTime<Utc>,
    refresh: RefreshCoordinator,
    pending_jobs: Vec<Job>,
    commands: Vec<CustomCommand>,
    /// Mutations and custom commands still running.
    pending_tasks: usize,
    next_job_token: u64,
    last_auto_refresh: Instant,
}

impl App {
    /// Builds the controller and queues the initial fetch. Call
    /// [`App::take_jobs`] to hand it to a runner.
    pub fn new(
        mut config: Config,
        config_path: Option<PathBuf>,
        theme_override: Option<ThemePreset>,
        viewport: (u16, u16),
    ) -> Self {
        config.validate();
        let preset = theme_override.unwrap_or_else(|| config.theme_preset());
        let keybindings = Keybindings::from_overrides(&config.keybindings);
        let commands = parse_commands(&config.commands, &keybindings);

        let mut app = Self {
            should_quit: false,
            theme: Theme::from_preset(preset),
            keybindings,
            config,
            config_path,
            viewport,
            store: ItemStore::new(),
            filter: FilterState::default(),
            view_mode: ViewMode::List,
            list_state: ScrollCursor::default(),
            column_state: ColumnViewState::default(),
            overlay: Overlay::None,
            visible: Vec::new(),
            columns: Vec::new(),
            column_layout: ColumnLayout::default(),
            banner: None,
            notice: None,
            now: Utc::now(),
            refresh: RefreshCoordinator::new(),
            pending_jobs: Vec::new(),
            commands,
            pending_tasks: 0,
            next_job_token: 0,
            last_auto_refresh: Instant::now(),
        };
        app.request_refresh();
        app.rederive();
        app
    }

    /// Jobs queued since the last call, in the order they were requested.
    pub fn take_jobs(&mut self) -> Vec<Job> {
        std::mem::take(&mut self.pending_jobs)
    }

    /// Pins the clock used for urgency and the days-ahead window.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
        self.rederive();
    }

    pub fn is_loading(&self) -> bool {
        !self.store.is_loaded() && self.banner.is_none()
    }

    pub fn is_busy(&self) -> bool {
        self.refresh.is_busy() || self.pending_tasks > 0
    }

    pub fn screen_areas(&self) -> ScreenAreas {
        let (width, height) = self.viewport;
        ScreenAreas::compute(
            Rect::new(0, 0, width, height),
            self.config.show_sidebar,
            self.banner.is_some(),
            self.config.layout_metrics(),
        )
    }

    pub fn item(&self, entry: &FilteredItem) -> Option<&Item> {
        self.store.get(entry.item_index)
    }

    pub fn list_heights(&self) -> Vec<usize> {
        self.visible
            .iter()
            .map(|entry| self.item(entry).map_or(0, Item::line_height))
            .collect()
    }

    pub fn column_heights(&self, column: &Column) -> Vec<usize> {
        column
            .entries
            .iter()
            .filter_map(|position| self.visible.get(*position))
            .map(|entry| self.item(entry).map_or(0, Item::line_height))
            .collect()
    }

    /// Position in `visible` of the focused entry for the current view mode.
    pub fn focused_position(&self) -> Option<usize> {
        match self.view_mode {
            ViewMode::List => (self.list_state.cursor < self.visible.len())
                .then_some(self.list_state.cursor),
            ViewMode::Column => {
                let focused = self.column_state.focused_column()?;
                let column = self
                    .columns
                    .iter()
                    .find(|column| column.category == focused.category)?;
                column.entries.get(focused.cursor.cursor).copied()
            }
        }
    }

    pub fn focused_item(&self) -> Option<&Item> {
        let position = self.focused_position()?;
        self.item(self.visible.get(position)?)
    }

    pub fn list_color_name(&self, category: &str) -> String {
        if let Some(color) = self.config.list_colors.get(category) {
            return color.clone();
        }
        let index = self
            .store
            .categories()
            .iter()
            .position(|name| name == category)
            .unwrap_or(0);
        default_list_color(index).to_string()
    }

    pub fn item_view(&self, entry: &FilteredItem) -> Option<ItemView> {
        let item = self.item(entry)?;
        let countdown = countdown_text(item.due, self.now);
        let subtitle = match item.due {
            Some(due) => format!("{countdown} · {}", format_due(due, &Local)),
            None => countdown,
        };
        Some(ItemView {
            external_ref: item.external_ref.clone(),
            title: item.title.clone(),
            subtitle,
            category: item.category.clone(),
            badge_color: self.list_color_name(&item.category),
            urgency: item.urgency(self.now),
            note_lines: item.note_lines().into_iter().map(str::to_string).collect(),
            highlight: entry.matched_indices.clone(),
        })
    }

    /// Visible item count per urgency band, in band order.
    pub fn urgency_counts(&self) -> Vec<(UrgencyBand, usize)> {
        let mut counts: HashMap<UrgencyBand, usize> = HashMap::new();
        for entry in &self.visible {
            if let Some(item) = self.item(entry) {
                *counts.entry(item.urgency(self.now)).or_default() += 1;
            }
        }
        UrgencyBand::ALL
            .into_iter()
            .map(|band| (band, counts.get(&band).copied().unwrap_or(0)))
            .collect()
    }

    pub fn set_notice(&mut self, text: impl Into<String>, is_error: bool) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error,
            expires_at: Instant::now() + NOTICE_DURATION,
        });
    }

    fn request_refresh(&mut self) {
        self.last_auto_refresh = Instant::now();
        match self.refresh.request() {
            Some(job) => self.pending_jobs.push(job),
            None => info!("refresh already in flight; queued a follow-up"),
        }
    }

    fn next_token(&mut self) -> u64 {
        self.next_job_token = self.next_job_token.wrapping_add(1);
        self.next_job_token
    }

    fn queue_mutation(&mut self, plan: MutationPlan) {
        let token = self.next_token();
        self.pending_tasks += 1;
        self.pending_jobs.push(Job::Mutate { token, plan });
    }

    fn queue_category_listing(&mut self) {
        let token = self.next_token();
        self.pending_jobs.push(Job::ListCategories { token });
    }

    /// Renders `template` against the focused reminder and queues it. A
    /// template that needs a reminder while none is focused only posts an
    /// error notice.
    fn run_custom_command(&mut self, template: &str) {
        let command = match render_command(template, self.focused_item()) {
            Ok(command) => command,
            Err(err) => {
                warn!("custom command not run: {}", err);
                self.set_notice(err.to_string(), true);
                return;
            }
        };
        info!(%command, "running custom command");
        let token = self.next_token();
        self.pending_tasks += 1;
        self.pending_jobs.push(Job::RunCommand {
            token,
            command,
            timeout: self.config.provider_timeout(),
        });
    }

    /// Writes the config back to `config_path`. Without a path changes only
    /// live for the session.
    fn persist_config(&mut self) {
        let Some(path) = self.config_path.clone() else {
            return;
        };
        if let Err(err) = self.config.save_to_path(&path) {
            warn!("failed to save config: {err:#}");
            self.set_notice("Failed to save settings", true);
        }
    }

    /// Recomputes every derived collection and re-applies the focus and
    /// scroll invariants. Runs after any change to items, query, config,
    /// viewport or focus.
    pub fn rederive(&mut self) {
        let focus = self.capture_focus();
        self.rederive_with(focus);
    }

    /// External refs of the focused items. Must be taken before the store
    /// changes, since `visible` indexes into it.
    fn capture_focus(&self) -> FocusRefs {
        FocusRefs {
            list: self.list_focus_ref(),
            columns: self.column_focus_refs(),
        }
    }

    fn rederive_with(&mut self, focus: FocusRefs) {
        let FocusRefs {
            list: list_focus,
            columns: column_focus,
        } = focus;

        let items = self.store.items();
        let candidates: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.config.is_list_enabled(&item.category))
            .filter(|(_, item)| within_days_ahead(item, self.config.days_ahead, self.now))
            .map(|(index, _)| index)
            .collect();
        let visible = filter_candidates(items, &candidates, &self.filter.query);
        let columns = group_columns(
            items,
            &visible,
            |category| self.config.is_list_enabled(category),
            &self.config.column_order,
        );
        self.visible = visible;
        self.columns = columns;

        let categories: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.category.clone())
            .collect();
        self.column_state.reconcile_categories(&categories);

        let areas = self.screen_areas();
        self.column_layout = compute_column_layout(
            areas.main.width,
            self.columns.len(),
            self.config.layout_metrics(),
        );
        self.column_state.window_start = column_window_start(
            self.column_state.focused,
            self.column_layout.visible_count,
            self.columns.len(),
            self.column_state.window_start,
        );

        if let Some(external_ref) = list_focus
            && let Some(position) = self.position_of(&external_ref)
        {
            self.list_state.cursor = position;
        }
        let heights = self.list_heights();
        self.list_state
            .reconcile(&heights, usize::from(areas.list_content_height()));

        let column_height = usize::from(areas.column_content_height());
        for index in 0..self.columns.len() {
            let heights = self.column_heights(&self.columns[index]);
            let followed = column_focus
                .get(&self.columns[index].category)
                .and_then(|external_ref| self.position_in_column(index, external_ref));
            let Some(cursor) = self
                .column_state
                .columns
                .get_mut(index)
                .map(|column| &mut column.cursor)
            else {
                continue;
            };
            if let Some(row) = followed {
                cursor.cursor = row;
            }
            cursor.reconcile(&heights, column_height);
        }

        self.reconcile_overlay();
    }

    fn reconcile_overlay(&mut self) {
        let (width, height) = self.viewport;
        let rows_height = settings_rows_height(Rect::new(0, 0, width, height));
        if let Overlay::Settings(state) = &mut self.overlay {
            let heights = vec![1; state.row_count()];
            state.rows.reconcile(&heights, rows_height);
        }
    }

    fn list_focus_ref(&self) -> Option<String> {
        let entry = self.visible.get(self.list_state.cursor)?;
        Some(self.item(entry)?.external_ref.clone())
    }

    fn column_focus_refs(&self) -> HashMap<String, String> {
        let mut refs = HashMap::new();
        for column in &self.columns {
            let Some(cursor) = self.column_state.cursor_for(&column.category) else {
                continue;
            };
            let item = column
                .entries
                .get(cursor.cursor)
                .and_then(|position| self.visible.get(*position))
                .and_then(|entry| self.item(entry));
            if let Some(item) = item {
                refs.insert(column.category.clone(), item.external_ref.clone());
            }
        }
        refs
    }

    fn position_of(&self, external_ref: &str) -> Option<usize> {
        self.visible.iter().position(|entry| {
            self.item(entry)
                .is_some_and(|item| item.external_ref == external_ref)
        })
    }

    fn position_in_column(&self, column: usize, external_ref: &str) -> Option<usize> {
        self.columns.get(column)?.entries.iter().position(|position| {
            self.visible
                .get(*position)
                .and_then(|entry| self.item(entry))
                .is_some_and(|item| item.external_ref == external_ref)
        })
    }

    pub(crate) fn dispatch(&mut self, follow_up: Option<Message>) -> Result<()> {
        match follow_up {
            Some(message) => self.update(message),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn item(external_ref: &str, title: &str, category: &str, hours: Option<i64>) -> Item {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        Item {
            external_ref: external_ref.to_string(),
            title: title.to_string(),
            notes: String::new(),
            category: category.to_string(),
            due: hours.map(|h| now + chrono::Duration::hours(h)),
            priority: 0,
            completed: false,
        }
    }

    fn loaded_app(items: Vec<Item>) -> App {
        loaded_app_with(Config::default(), items)
    }

    fn loaded_app_with(config: Config, items: Vec<Item>) -> App {
        let mut app = App::new(config, None, None, (100, 30));
        app.set_now(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
        let job = app.take_jobs().pop().expect("initial refresh queued");
        app.update(Message::RefreshFinished {
            token: job.token(),
            result: Ok(items),
        })
        .expect("refresh applies");
        app
    }

    #[test]
    fn new_app_queues_initial_refresh() {
        let mut app = App::new(Config::default(), None, None, (80, 24));
        let jobs = app.take_jobs();
        assert_eq!(jobs.len(), 1);
        assert!(matches!(jobs[0], Job::Refresh { .. }));
        assert!(app.is_loading());
        assert!(app.take_jobs().is_empty());
    }

    #[test]
    fn disabled_lists_and_window_are_prefiltered() {
        let mut app = loaded_app(vec![
            item("1", "Soon", "Home", Some(2)),
            item("2", "Far", "Home", Some(24 * 20)),
            item("3", "Work thing", "Work", Some(1)),
            item("4", "Undated", "Home", None),
        ]);
        assert_eq!(app.visible.len(), 4);

        app.config.days_ahead = 7;
        app.config.enabled_lists.insert("Work".to_string(), false);
        app.rederive();

        let titles: Vec<&str> = app
            .visible
            .iter()
            .filter_map(|entry| app.item(entry))
            .map(|item| item.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Soon"]);
        assert_eq!(app.columns.len(), 1);
    }

    #[test]
    fn focus_follows_item_across_refresh() {
        let mut app = loaded_app(vec![
            item("1", "A", "Home", Some(1)),
            item("2", "B", "Home", Some(2)),
            item("3", "C", "Home", Some(3)),
        ]);
        app.list_state.cursor = 2;
        app.rederive();

        app.update(Message::Refresh).expect("refresh requested");
        let job = app.take_jobs().pop().expect("refresh job");
        app.update(Message::RefreshFinished {
            token: job.token(),
            result: Ok(vec![
                item("0", "Z", "Home", Some(0)),
                item("1", "A", "Home", Some(1)),
                item("2", "B", "Home", Some(2)),
                item("3", "C", "Home", Some(3)),
            ]),
        })
        .expect("refresh applies");

        assert_eq!(app.focused_item().map(|item| item.title.as_str()), Some("C"));
    }

    #[test]
    fn urgency_counts_cover_every_band() {
        let app = loaded_app(vec![
            item("1", "Late", "Home", Some(-2)),
            item("2", "Today", "Home", Some(2)),
            item("3", "Whenever", "Home", None),
        ]);
        let counts = app.urgency_counts();
        assert_eq!(counts.len(), UrgencyBand::ALL.len());
        assert_eq!(counts[0], (UrgencyBand::Overdue, 1));
        assert_eq!(counts[1], (UrgencyBand::DueToday, 1));
        assert_eq!(counts[5], (UrgencyBand::NoDueDate, 1));
    }

    #[test]
    fn settings_lists_include_provider_categories() {
        let mut app = loaded_app(vec![item("1", "A", "Home", Some(1))]);
        app.update(Message::OpenSettings).expect("settings open");

        let jobs = app.take_jobs();
        let Some(Job::ListCategories { token }) = jobs.last() else {
            panic!("expected a category listing job, got {jobs:?}");
        };
        app.update(Message::CategoriesListed {
            token: *token,
            result: Ok(vec!["Errands".to_string(), "Home".to_string()]),
        })
        .expect("lists merge");

        let Overlay::Settings(state) = &app.overlay else {
            panic!("settings overlay should stay open");
        };
        assert_eq!(state.lists, vec!["Errands", "Home"]);
    }

    #[test]
    fn custom_command_runs_against_focused_reminder() {
        let mut config = Config::default();
        config
            .commands
            .insert("o".to_string(), "echo {title}".to_string());
        let mut app = loaded_app_with(config, vec![item("1", "Pay rent", "Home", Some(1))]);

        app.update(Message::Key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::NONE)))
            .expect("key handled");
        let jobs = app.take_jobs();
        let [Job::RunCommand { token, command, .. }] = jobs.as_slice() else {
            panic!("expected one command job, got {jobs:?}");
        };
        assert_eq!(command, "echo 'Pay rent'");
        assert!(app.is_busy());

        app.update(Message::CommandFinished {
            token: *token,
            result: Ok(Some("Pay rent".to_string())),
        })
        .expect("command result applies");
        assert_eq!(
            app.notice.as_ref().map(|notice| notice.text.as_str()),
            Some("Pay rent")
        );
        assert!(matches!(app.take_jobs().as_slice(), [Job::Refresh { .. }]));
    }

    #[test]
    fn custom_command_needing_reminder_reports_error_when_empty() {
        let mut config = Config::default();
        config
            .commands
            .insert("o".to_string(), "open {id}".to_string());
        let mut app = loaded_app_with(config, Vec::new());

        app.update(Message::Key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::NONE)))
            .expect("key handled");

        assert!(app.take_jobs().is_empty());
        assert!(app.notice.as_ref().is_some_and(|notice| notice.is_error));
        assert!(!app.is_busy());
    }
}
