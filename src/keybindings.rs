use std::collections::HashMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum KeyContext {
    Global,
    Board,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum KeyAction {
    Quit,
    ToggleView,
    OpenSettings,
    Refresh,
    ToggleSidebar,
    NavigateLeft,
    NavigateRight,
    SelectUp,
    SelectDown,
    SelectTop,
    SelectBottom,
    PageUp,
    PageDown,
    MoveColumnLeft,
    MoveColumnRight,
    OpenEdit,
    Complete,
    StartSearch,
    ClearSearch,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub(crate) fn matches(&self, key: KeyEvent) -> bool {
        match (&self.code, key.code) {
            (KeyCode::Char(left), KeyCode::Char(right)) => {
                let left = normalize_char(*left, self.modifiers);
                let right = normalize_char(right, key.modifiers);
                left == right
                    && normalize_modifiers(self.modifiers) == normalize_modifiers(key.modifiers)
            }
            _ => self.code == key.code && self.modifiers == key.modifiers,
        }
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            parts.push("Ctrl".to_string());
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            parts.push("Alt".to_string());
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            parts.push("Shift".to_string());
        }

        parts.push(match self.code {
            KeyCode::Enter => "Enter".to_string(),
            KeyCode::Esc => "Esc".to_string(),
            KeyCode::Tab => "Tab".to_string(),
            KeyCode::BackTab => "BackTab".to_string(),
            KeyCode::Backspace => "Backspace".to_string(),
            KeyCode::Left => "Left".to_string(),
            KeyCode::Right => "Right".to_string(),
            KeyCode::Up => "Up".to_string(),
            KeyCode::Down => "Down".to_string(),
            KeyCode::Home => "Home".to_string(),
            KeyCode::End => "End".to_string(),
            KeyCode::PageUp => "PageUp".to_string(),
            KeyCode::PageDown => "PageDown".to_string(),
            KeyCode::Delete => "Delete".to_string(),
            KeyCode::F(n) => format!("F{n}"),
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Char(ch) => ch.to_string(),
            _ => "Unknown".to_string(),
        });

        write!(f, "{}", parts.join("+"))
    }
}

#[derive(Debug, Clone)]
pub struct ActionBinding {
    pub id: &'static str,
    pub action: KeyAction,
    pub description: &'static str,
    pub bindings: Vec<KeyBinding>,
}

#[derive(Debug, Clone)]
pub struct Keybindings {
    global: Vec<ActionBinding>,
    board: Vec<ActionBinding>,
}

struct ActionDef {
    id: &'static str,
    action: KeyAction,
    description: &'static str,
    defaults: &'static [&'static str],
}

const GLOBAL_DEFS: &[ActionDef] = &[
    ActionDef {
        id: "quit",
        action: KeyAction::Quit,
        description: "quit",
        defaults: &["q", "Ctrl+c"],
    },
    ActionDef {
        id: "toggle_view",
        action: KeyAction::ToggleView,
        description: "list/columns",
        defaults: &["Tab"],
    },
    ActionDef {
        id: "open_settings",
        action: KeyAction::OpenSettings,
        description: "settings",
        defaults: &["s"],
    },
    ActionDef {
        id: "refresh",
        action: KeyAction::Refresh,
        description: "refresh",
        defaults: &["r"],
    },
    ActionDef {
        id: "toggle_sidebar",
        action: KeyAction::ToggleSidebar,
        description: "sidebar",
        defaults: &["b"],
    },
];

const BOARD_DEFS: &[ActionDef] = &[
    ActionDef {
        id: "navigate_left",
        action: KeyAction::NavigateLeft,
        description: "previous column",
        defaults: &["h", "Left"],
    },
    ActionDef {
        id: "navigate_right",
        action: KeyAction::NavigateRight,
        description: "next column",
        defaults: &["l", "Right"],
    },
    ActionDef {
        id: "select_up",
        action: KeyAction::SelectUp,
        description: "previous reminder",
        defaults: &["k", "Up"],
    },
    ActionDef {
        id: "select_down",
        action: KeyAction::SelectDown,
        description: "next reminder",
        defaults: &["j", "Down"],
    },
    ActionDef {
        id: "select_top",
        action: KeyAction::SelectTop,
        description: "first reminder",
        defaults: &["g", "Home"],
    },
    ActionDef {
        id: "select_bottom",
        action: KeyAction::SelectBottom,
        description: "last reminder",
        defaults: &["G", "End"],
    },
    ActionDef {
        id: "page_up",
        action: KeyAction::PageUp,
        description: "page up",
        defaults: &["PageUp", "Ctrl+u"],
    },
    ActionDef {
        id: "page_down",
        action: KeyAction::PageDown,
        description: "page down",
        defaults: &["PageDown", "Ctrl+d"],
    },
    ActionDef {
        id: "move_column_left",
        action: KeyAction::MoveColumnLeft,
        description: "move column left",
        defaults: &["Ctrl+h", "Ctrl+Left"],
    },
    ActionDef {
        id: "move_column_right",
        action: KeyAction::MoveColumnRight,
        description: "move column right",
        defaults: &["Ctrl+l", "Ctrl+Right"],
    },
    ActionDef {
        id: "edit",
        action: KeyAction::OpenEdit,
        description: "edit",
        defaults: &["Enter", "e"],
    },
    ActionDef {
        id: "complete",
        action: KeyAction::Complete,
        description: "complete",
        defaults: &["x"],
    },
    ActionDef {
        id: "search",
        action: KeyAction::StartSearch,
        description: "filter",
        defaults: &["/"],
    },
    ActionDef {
        id: "clear_search",
        action: KeyAction::ClearSearch,
        description: "clear filter",
        defaults: &["Esc"],
    },
];

impl Default for Keybindings {
    fn default() -> Self {
        Self::from_overrides(&HashMap::new())
    }
}

impl Keybindings {
    /// Builds bindings from the `[keybindings]` config table, keyed by action
    /// id. Actions missing from the table keep their defaults.
    pub fn from_overrides(overrides: &HashMap<String, Vec<String>>) -> Self {
        for id in overrides.keys() {
            let known = GLOBAL_DEFS
                .iter()
                .chain(BOARD_DEFS.iter())
                .any(|def| def.id == id);
            if !known {
                warn!("unknown keybinding action '{}'; ignoring", id);
            }
        }

        let keybindings = Self {
            global: build_section(KeyContext::Global, GLOBAL_DEFS, overrides),
            board: build_section(KeyContext::Board, BOARD_DEFS, overrides),
        };
        keybindings.validate_conflicts();
        keybindings
    }

    /// Global bindings win over board bindings.
    pub fn action_for_key(&self, key: KeyEvent) -> Option<KeyAction> {
        [KeyContext::Global, KeyContext::Board]
            .into_iter()
            .find_map(|context| self.action_in_context(context, key))
    }

    pub fn action_in_context(&self, context: KeyContext, key: KeyEvent) -> Option<KeyAction> {
        self.bindings_for(context)
            .iter()
            .find(|binding| {
                binding
                    .bindings
                    .iter()
                    .any(|candidate| candidate.matches(key))
            })
            .map(|binding| binding.action)
    }

    /// `key: description` pairs for the footer.
    pub fn hints(&self, actions: &[KeyAction]) -> Vec<(String, &'static str)> {
        actions
            .iter()
            .filter_map(|action| {
                let binding = self
                    .global
                    .iter()
                    .chain(self.board.iter())
                    .find(|binding| binding.action == *action)?;
                let key = binding.bindings.first()?.to_string();
                Some((key, binding.description))
            })
            .collect()
    }

    fn bindings_for(&self, context: KeyContext) -> &[ActionBinding] {
        match context {
            KeyContext::Global => &self.global,
            KeyContext::Board => &self.board,
        }
    }

    fn validate_conflicts(&self) {
        let mut seen: HashMap<String, &'static str> = HashMap::new();
        for binding in self.global.iter().chain(self.board.iter()) {
            for key in &binding.bindings {
                let key_name = key.to_string();
                if let Some(first_action) = seen.get(&key_name) {
                    warn!(
                        "keybinding conflict: '{}' used by '{}' and '{}' (first wins)",
                        key_name, first_action, binding.id
                    );
                } else {
                    seen.insert(key_name, binding.id);
                }
            }
        }
    }
}

fn build_section(
    context: KeyContext,
    defs: &[ActionDef],
    overrides: &HashMap<String, Vec<String>>,
) -> Vec<ActionBinding> {
    let mut output = Vec::new();
    for def in defs {
        let mut parsed = Vec::new();
        if let Some(source) = overrides.get(def.id) {
            for raw in source {
                match parse_binding(raw) {
                    Some(binding) => parsed.push(binding),
                    None => warn!(
                        "invalid keybinding '{}' for action '{}' in {:?}; ignoring",
                        raw, def.id, context
                    ),
                }
            }
            if parsed.is_empty() {
                warn!(
                    "no valid keybindings for action '{}' in {:?}; falling back to defaults",
                    def.id, context
                );
            }
        }

        if parsed.is_empty() {
            parsed = def
                .defaults
                .iter()
                .filter_map(|raw| parse_binding(raw))
                .collect();
        }

        output.push(ActionBinding {
            id: def.id,
            action: def.action,
            description: def.description,
            bindings: parsed,
        });
    }
    output
}

fn normalize_modifiers(mut modifiers: KeyModifiers) -> KeyModifiers {
    modifiers.remove(KeyModifiers::SHIFT);
    modifiers
}

fn normalize_char(ch: char, modifiers: KeyModifiers) -> char {
    if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        ch.to_ascii_lowercase()
    } else {
        ch
    }
}

pub fn parse_binding(raw: &str) -> Option<KeyBinding> {
    let mut modifiers = KeyModifiers::empty();
    let mut key: Option<&str> = None;

    for part in raw.split('+').map(str::trim).filter(|s| !s.is_empty()) {
        match part.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => modifiers.insert(KeyModifiers::CONTROL),
            "alt" => modifiers.insert(KeyModifiers::ALT),
            "shift" => modifiers.insert(KeyModifiers::SHIFT),
            _ => {
                if key.is_some() {
                    return None;
                }
                key = Some(part);
            }
        }
    }

    let key = key?;
    let lower = key.to_ascii_lowercase();
    let code = match lower.as_str() {
        "enter" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "delete" => KeyCode::Delete,
        "space" => KeyCode::Char(' '),
        _ if lower.starts_with('f') && lower.len() > 1 && lower.len() <= 3 => {
            let n = lower[1..].parse::<u8>().ok()?;
            KeyCode::F(n)
        }
        _ if key.chars().count() == 1 => {
            let ch = normalize_char(key.chars().next()?, modifiers);
            KeyCode::Char(ch)
        }
        _ => return None,
    };

    Some(KeyBinding { code, modifiers })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn parse_ctrl_binding() {
        let binding = parse_binding("Ctrl+H").expect("binding");
        assert_eq!(binding.code, KeyCode::Char('h'));
        assert!(binding.modifiers.contains(KeyModifiers::CONTROL));
    }

    #[test]
    fn shifted_alpha_is_distinct() {
        let lower = parse_binding("g").expect("binding");
        let upper = parse_binding("G").expect("binding");
        assert_ne!(lower, upper);
        assert!(upper.matches(key(KeyCode::Char('G'), KeyModifiers::SHIFT)));
        assert!(!upper.matches(key(KeyCode::Char('g'), KeyModifiers::empty())));
    }

    #[test]
    fn shifted_symbol_matches_without_shift_modifier() {
        let binding = parse_binding("/").expect("binding");
        assert!(binding.matches(key(KeyCode::Char('/'), KeyModifiers::SHIFT)));
    }

    #[test]
    fn invalid_binding_returns_none() {
        assert!(parse_binding("Ctrl+Left+Extra").is_none());
        assert!(parse_binding("f").is_some());
        assert!(parse_binding("").is_none());
    }

    #[test]
    fn defaults_resolve_actions() {
        let keys = Keybindings::default();
        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('q'), KeyModifiers::empty())),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            keys.action_for_key(key(KeyCode::Tab, KeyModifiers::empty())),
            Some(KeyAction::ToggleView)
        );
        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('l'), KeyModifiers::CONTROL)),
            Some(KeyAction::MoveColumnRight)
        );
        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('l'), KeyModifiers::empty())),
            Some(KeyAction::NavigateRight)
        );
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut overrides = HashMap::new();
        overrides.insert("quit".to_string(), vec!["Ctrl+q".to_string()]);
        overrides.insert("refresh".to_string(), vec!["NotAKey".to_string()]);
        let keys = Keybindings::from_overrides(&overrides);

        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('q'), KeyModifiers::empty())),
            None
        );
        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('q'), KeyModifiers::CONTROL)),
            Some(KeyAction::Quit)
        );
        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('r'), KeyModifiers::empty())),
            Some(KeyAction::Refresh)
        );
    }

    #[test]
    fn complete_action_rebinds_by_id() {
        let keys = Keybindings::default();
        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('x'), KeyModifiers::empty())),
            Some(KeyAction::Complete)
        );

        let overrides = HashMap::from([("complete".to_string(), vec!["Ctrl+x".to_string()])]);
        let keys = Keybindings::from_overrides(&overrides);
        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('x'), KeyModifiers::empty())),
            None
        );
        assert_eq!(
            keys.action_for_key(key(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            Some(KeyAction::Complete)
        );
        assert_eq!(
            keys.hints(&[KeyAction::Complete]),
            vec![("Ctrl+x".to_string(), "complete")]
        );
    }

    #[test]
    fn hints_use_first_binding() {
        let keys = Keybindings::default();
        let hints = keys.hints(&[KeyAction::StartSearch, KeyAction::Quit]);
        assert_eq!(
            hints,
            vec![("/".to_string(), "filter"), ("q".to_string(), "quit")]
        );
    }
}
