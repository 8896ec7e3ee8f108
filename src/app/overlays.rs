use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use super::*;
use crate::config::DAYS_AHEAD_OPTIONS;
use crate::provider::{MutationAction, MutationTarget};
use crate::theme::next_list_color;

pub(crate) fn handle_settings_key(
    state: &mut SettingsOverlayState,
    key: KeyEvent,
    rows_height: usize,
    follow_up: &mut Option<Message>,
) {
    let heights = vec![1; state.row_count()];
    match key.code {
        KeyCode::Esc => *follow_up = Some(Message::CloseOverlay),
        KeyCode::Enter => *follow_up = Some(Message::CommitSettings),
        KeyCode::Tab | KeyCode::BackTab => {
            state.section = if key.code == KeyCode::Tab {
                state.section.next()
            } else {
                state.section.previous()
            };
            state.rows = ScrollCursor::default();
            if state.section == SettingsSection::DaysAhead {
                state.rows.cursor = DAYS_AHEAD_OPTIONS
                    .iter()
                    .position(|days| *days == state.draft.days_ahead)
                    .unwrap_or(0);
            }
            let heights = vec![1; state.row_count()];
            state.rows.reconcile(&heights, rows_height);
        }
        KeyCode::Down | KeyCode::Char('j') => state.rows.move_by(1, &heights, rows_height),
        KeyCode::Up | KeyCode::Char('k') => state.rows.move_by(-1, &heights, rows_height),
        KeyCode::Home | KeyCode::Char('g') => state.rows.select_first(&heights, rows_height),
        KeyCode::End | KeyCode::Char('G') => state.rows.select_last(&heights, rows_height),
        KeyCode::Char(' ') => toggle_settings_row(state),
        _ => {}
    }
}

fn toggle_settings_row(state: &mut SettingsOverlayState) {
    let row = state.rows.cursor;
    match state.section {
        SettingsSection::DaysAhead => {
            if let Some(days) = DAYS_AHEAD_OPTIONS.get(row) {
                state.draft.days_ahead = *days;
            }
        }
        SettingsSection::Lists => {
            if let Some(list) = state.lists.get(row) {
                let enabled = state.draft.is_enabled(list);
                state.draft.enabled_lists.insert(list.clone(), !enabled);
            }
        }
        SettingsSection::Colors => {
            if let Some(list) = state.lists.get(row) {
                let next = next_list_color(&state.draft.color_for(list, row));
                state.draft.list_colors.insert(list.clone(), next.to_string());
            }
        }
        SettingsSection::Display => state.draft.show_sidebar = !state.draft.show_sidebar,
    }
}

pub(crate) fn handle_edit_key(
    state: &mut EditOverlayState,
    key: KeyEvent,
    follow_up: &mut Option<Message>,
) {
    match key.code {
        KeyCode::Esc => *follow_up = Some(Message::CloseOverlay),
        KeyCode::Enter | KeyCode::Char('j')
            if state.focused_field == EditField::Notes && is_newline_chord(key) =>
        {
            state.notes_input.push('\n');
            state.error_message = None;
        }
        KeyCode::Enter => *follow_up = Some(Message::CommitEdit),
        KeyCode::Tab | KeyCode::Down => state.focused_field = state.focused_field.next(),
        KeyCode::BackTab | KeyCode::Up => state.focused_field = state.focused_field.previous(),
        KeyCode::Backspace => {
            if let Some(input) = state.input_mut() {
                input.pop();
                state.error_message = None;
            }
        }
        KeyCode::Char(' ') if !state.focused_field.is_text() => match state.focused_field {
            EditField::Completed => state.completed = !state.completed,
            EditField::Delete => state.delete = !state.delete,
            _ => {}
        },
        KeyCode::Char(ch)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            if let Some(input) = state.input_mut() {
                input.push(ch);
                state.error_message = None;
            }
        }
        _ => {}
    }
}

/// Alt+Enter, or Ctrl+J which raw-mode terminals send for a bare line feed.
fn is_newline_chord(key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Enter => key.modifiers.contains(KeyModifiers::ALT),
        KeyCode::Char('j') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Turns the edited fields into provider actions: an edit when the text or
/// list changed, then a completion toggle, then a delete.
pub(crate) fn edit_plan(state: &EditOverlayState) -> MutationPlan {
    let target = &state.target;
    let title = state.title_input.trim();
    let list = match state.list_input.trim() {
        "" => target.category.as_str(),
        list => list,
    };

    let mut actions = Vec::new();
    if title != target.title || state.notes_input != target.notes || list != target.category {
        actions.push(MutationAction::Edit {
            title: title.to_string(),
            notes: state.notes_input.clone(),
        });
    }
    if state.completed != target.completed {
        actions.push(if state.completed {
            MutationAction::Complete
        } else {
            MutationAction::Uncomplete
        });
    }
    if state.delete {
        actions.push(MutationAction::Delete);
    }

    MutationPlan {
        target: MutationTarget {
            external_ref: target.external_ref.clone(),
            category: list.to_string(),
        },
        actions,
    }
}

impl App {
    pub(crate) fn commit_settings(&mut self) {
        let overlay = std::mem::take(&mut self.overlay);
        let Overlay::Settings(state) = overlay else {
            self.overlay = overlay;
            return;
        };
        state.draft.apply_to(&mut self.config);
        self.persist_config();
        self.set_notice("Settings saved", false);
        self.rederive();
    }

    pub(crate) fn commit_edit(&mut self) {
        let Overlay::Edit(state) = &mut self.overlay else {
            return;
        };
        if state.title_input.trim().is_empty() {
            state.error_message = Some("Title cannot be empty".to_string());
            return;
        }

        let plan = edit_plan(state);
        self.overlay = Overlay::None;
        if plan.actions.is_empty() {
            self.set_notice("No changes", false);
            return;
        }
        debug!(actions = plan.actions.len(), "queueing edit");
        self.set_notice("Saving…", false);
        self.queue_mutation(plan);
    }
}
