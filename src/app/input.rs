use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tuirealm::ratatui::layout::Rect;

use super::overlays::{handle_edit_key, handle_settings_key};
use super::{App, Message, Overlay};
use crate::commands::command_for_key;
use crate::keybindings::KeyAction;
use crate::layout::settings_rows_height;

impl App {
    /// Overlays see keys first, then the search prompt, then the keymap, then
    /// the user's `[commands]`.
    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind == KeyEventKind::Release {
            return Ok(());
        }

        if self.overlay.is_open() {
            let (width, height) = self.viewport;
            let rows_height = settings_rows_height(Rect::new(0, 0, width, height));
            let mut follow_up = None;
            match &mut self.overlay {
                Overlay::Settings(state) => {
                    handle_settings_key(state, key, rows_height, &mut follow_up)
                }
                Overlay::Edit(state) => handle_edit_key(state, key, &mut follow_up),
                Overlay::None => {}
            }
            return self.dispatch(follow_up);
        }

        if self.filter.editing {
            return self.handle_search_key(key);
        }

        if let Some(action) = self.keybindings.action_for_key(key) {
            return self.update(action_message(action));
        }
        if let Some(command) = command_for_key(&self.commands, key) {
            let template = command.template.clone();
            self.run_custom_command(&template);
        }
        Ok(())
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => return self.update(Message::CancelSearch),
            KeyCode::Enter => return self.update(Message::CommitSearch),
            KeyCode::Up => return self.update(Message::SelectUp),
            KeyCode::Down => return self.update(Message::SelectDown),
            KeyCode::Backspace => {
                if self.filter.query.pop().is_none() {
                    return Ok(());
                }
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return self.update(Message::Quit);
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.filter.query.push(ch);
            }
            _ => return Ok(()),
        }
        self.rederive();
        Ok(())
    }

    /// Pasted text goes to the active text input: an edit overlay field or
    /// the search prompt.
    pub(crate) fn handle_paste(&mut self, text: &str) {
        if let Overlay::Edit(state) = &mut self.overlay {
            if let Some(input) = state.input_mut() {
                input.push_str(text);
                state.error_message = None;
            }
            return;
        }
        if self.overlay.is_open() || !self.filter.editing {
            return;
        }
        let line = text.lines().next().unwrap_or_default();
        self.filter.query.push_str(line);
        self.rederive();
    }
}

fn action_message(action: KeyAction) -> Message {
    match action {
        KeyAction::Quit => Message::Quit,
        KeyAction::ToggleView => Message::ToggleView,
        KeyAction::OpenSettings => Message::OpenSettings,
        KeyAction::Refresh => Message::Refresh,
        KeyAction::ToggleSidebar => Message::ToggleSidebar,
        KeyAction::NavigateLeft => Message::NavigateLeft,
        KeyAction::NavigateRight => Message::NavigateRight,
        KeyAction::SelectUp => Message::SelectUp,
        KeyAction::SelectDown => Message::SelectDown,
        KeyAction::SelectTop => Message::SelectTop,
        KeyAction::SelectBottom => Message::SelectBottom,
        KeyAction::PageUp => Message::PageUp,
        KeyAction::PageDown => Message::PageDown,
        KeyAction::MoveColumnLeft => Message::MoveColumnLeft,
        KeyAction::MoveColumnRight => Message::MoveColumnRight,
        KeyAction::OpenEdit => Message::OpenEdit,
        KeyAction::Complete => Message::Complete,
        KeyAction::StartSearch => Message::StartSearch,
        KeyAction::ClearSearch => Message::ClearSearch,
    }
}
