use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::{Config, DAYS_AHEAD_OPTIONS};
use crate::scroll::ScrollCursor;
use crate::theme::default_list_color;
use crate::types::Item;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ViewMode {
    #[default]
    List,
    Column,
}

impl ViewMode {
    pub const fn toggled(self) -> Self {
        match self {
            Self::List => Self::Column,
            Self::Column => Self::List,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::List => "List",
            Self::Column => "Columns",
        }
    }
}

/// Query text shared by every view mode.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct FilterState {
    pub query: String,
    pub editing: bool,
    /// Query to restore when an edit is cancelled.
    pub saved_query: Option<String>,
}

impl FilterState {
    pub fn begin_edit(&mut self) {
        self.saved_query = Some(self.query.clone());
        self.editing = true;
    }

    pub fn commit(&mut self) {
        self.saved_query = None;
        self.editing = false;
    }

    pub fn cancel(&mut self) {
        if let Some(saved) = self.saved_query.take() {
            self.query = saved;
        }
        self.editing = false;
    }

    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum Overlay {
    #[default]
    None,
    Settings(SettingsOverlayState),
    Edit(EditOverlayState),
}

impl Overlay {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SettingsSection {
    DaysAhead,
    Lists,
    Colors,
    Display,
}

impl SettingsSection {
    pub const ALL: [Self; 4] = [Self::DaysAhead, Self::Lists, Self::Colors, Self::Display];

    pub const fn title(self) -> &'static str {
        match self {
            Self::DaysAhead => "Due within",
            Self::Lists => "Lists",
            Self::Colors => "Colors",
            Self::Display => "Display",
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Working copy of the user-editable preferences.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SettingsDraft {
    pub days_ahead: u32,
    pub enabled_lists: BTreeMap<String, bool>,
    pub list_colors: BTreeMap<String, String>,
    pub show_sidebar: bool,
}

impl SettingsDraft {
    pub fn from_config(config: &Config) -> Self {
        Self {
            days_ahead: config.days_ahead,
            enabled_lists: config.enabled_lists.clone(),
            list_colors: config.list_colors.clone(),
            show_sidebar: config.show_sidebar,
        }
    }

    pub fn apply_to(&self, config: &mut Config) {
        config.days_ahead = self.days_ahead;
        config.enabled_lists = self.enabled_lists.clone();
        config.list_colors = self.list_colors.clone();
        config.show_sidebar = self.show_sidebar;
    }

    pub fn is_enabled(&self, list: &str) -> bool {
        self.enabled_lists.get(list).copied().unwrap_or(true)
    }

    /// Configured colour, or the palette entry for the list's position.
    pub fn color_for(&self, list: &str, index: usize) -> String {
        self.list_colors
            .get(list)
            .cloned()
            .unwrap_or_else(|| default_list_color(index).to_string())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SettingsOverlayState {
    pub draft: SettingsDraft,
    pub lists: Vec<String>,
    pub section: SettingsSection,
    pub rows: ScrollCursor,
}

impl SettingsOverlayState {
    pub fn new(config: &Config, lists: Vec<String>) -> Self {
        let mut state = Self {
            draft: SettingsDraft::from_config(config),
            lists,
            section: SettingsSection::DaysAhead,
            rows: ScrollCursor::default(),
        };
        state.rows.cursor = DAYS_AHEAD_OPTIONS
            .iter()
            .position(|days| *days == config.days_ahead)
            .unwrap_or(0);
        state
    }

    /// Adds lists the provider reported that no loaded item belongs to. The
    /// row cursor stays on the same list name.
    pub fn merge_lists(&mut self, lists: Vec<String>) {
        let focused = match self.section {
            SettingsSection::Lists | SettingsSection::Colors => {
                self.lists.get(self.rows.cursor).cloned()
            }
            _ => None,
        };
        self.lists.extend(lists);
        self.lists.sort();
        self.lists.dedup();
        if let Some(name) = focused
            && let Some(index) = self.lists.iter().position(|list| *list == name)
        {
            self.rows.cursor = index;
        }
    }

    pub fn row_count(&self) -> usize {
        match self.section {
            SettingsSection::DaysAhead => DAYS_AHEAD_OPTIONS.len(),
            SettingsSection::Lists | SettingsSection::Colors => self.lists.len(),
            SettingsSection::Display => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EditField {
    List,
    Title,
    Notes,
    Completed,
    Delete,
}

impl EditField {
    pub const ALL: [Self; 5] = [
        Self::List,
        Self::Title,
        Self::Notes,
        Self::Completed,
        Self::Delete,
    ];

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let index = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub const fn is_text(self) -> bool {
        matches!(self, Self::List | Self::Title | Self::Notes)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EditOverlayState {
    pub target: Item,
    pub list_input: String,
    pub title_input: String,
    pub notes_input: String,
    pub completed: bool,
    pub delete: bool,
    pub focused_field: EditField,
    pub error_message: Option<String>,
}

impl EditOverlayState {
    pub fn new(target: Item) -> Self {
        Self {
            list_input: target.category.clone(),
            title_input: target.title.clone(),
            notes_input: target.notes.clone(),
            completed: target.completed,
            delete: false,
            focused_field: EditField::Title,
            error_message: None,
            target,
        }
    }

    pub fn input_mut(&mut self) -> Option<&mut String> {
        match self.focused_field {
            EditField::List => Some(&mut self.list_input),
            EditField::Title => Some(&mut self.title_input),
            EditField::Notes => Some(&mut self.notes_input),
            EditField::Completed | EditField::Delete => None,
        }
    }
}
